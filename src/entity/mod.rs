pub mod conversation_participants;
pub mod conversations;
pub mod delivery_locations;
pub mod messages;
pub mod notifications;
pub mod order_items;
pub mod order_status_history;
pub mod orders;
pub mod products;
pub mod reward_points;
pub mod subscription_products;
pub mod subscriptions;
pub mod user_profiles;
pub mod users;

pub use conversation_participants::Entity as ConversationParticipants;
pub use conversations::Entity as Conversations;
pub use delivery_locations::Entity as DeliveryLocations;
pub use messages::Entity as Messages;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use order_status_history::Entity as OrderStatusHistory;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reward_points::Entity as RewardPoints;
pub use subscription_products::Entity as SubscriptionProducts;
pub use subscriptions::Entity as Subscriptions;
pub use user_profiles::Entity as UserProfiles;
pub use users::Entity as Users;
