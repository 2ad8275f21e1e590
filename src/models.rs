use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    conversations, delivery_locations, messages, notifications, order_items, order_status_history,
    orders::{self, OrderStatus},
    products, reward_points,
    subscriptions::{self, Frequency, SubscriptionStatus},
    user_profiles,
    users::{self, UserRole},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl From<user_profiles::Model> for UserProfile {
    fn from(model: user_profiles::Model) -> Self {
        Self {
            user_id: model.user_id,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardPoint {
    pub user_id: Uuid,
    pub points: i32,
    pub total_earned: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<reward_points::Model> for RewardPoint {
    fn from(model: reward_points::Model) -> Self {
        Self {
            user_id: model.user_id,
            points: model.points,
            total_earned: model.total_earned,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            image: model.image,
            stock: model.stock,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryLocation {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<delivery_locations::Model> for DeliveryLocation {
    fn from(model: delivery_locations::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Who placed an order: a registered account or a guest's contact details, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderCustomer {
    Registered {
        user_id: Uuid,
    },
    Guest {
        name: String,
        email: String,
        phone: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub reference: String,
    pub customer: OrderCustomer,
    pub assigned_to: Option<Uuid>,
    pub delivery_location_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        let customer = match model.user_id {
            Some(user_id) => OrderCustomer::Registered { user_id },
            None => OrderCustomer::Guest {
                name: model.guest_name.unwrap_or_default(),
                email: model.guest_email.unwrap_or_default(),
                phone: model.guest_phone,
            },
        };
        Self {
            id: model.id,
            reference: model.reference,
            customer,
            assigned_to: model.assigned_to,
            delivery_location_id: model.delivery_location_id,
            status: model.status,
            total_amount: model.total_amount,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: i64,
    pub line_total: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price: model.price,
            line_total: model.price * i64::from(model.quantity),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_by: Option<Uuid>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<order_status_history::Model> for OrderStatusChange {
    fn from(model: order_status_history::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            old_status: model.old_status,
            new_status: model.new_status,
            changed_by: model.changed_by,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub verb: String,
    pub url: String,
    pub unread: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            recipient_id: model.recipient_id,
            verb: model.verb,
            url: model.url,
            unread: model.unread,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<conversations::Model> for Conversation {
    fn from(model: conversations::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<messages::Model> for Message {
    fn from(model: messages::Model) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            content: model.content,
            read: model.read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_location_id: Uuid,
    pub frequency: Frequency,
    pub status: SubscriptionStatus,
    pub next_delivery: NaiveDate,
    pub product_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn from_parts(model: subscriptions::Model, product_ids: Vec<Uuid>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            delivery_location_id: model.delivery_location_id,
            frequency: model.frequency,
            status: model.status,
            next_delivery: model.next_delivery,
            product_ids,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
