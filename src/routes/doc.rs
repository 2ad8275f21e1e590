use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        cart::{AddToCartRequest, CartLine, CartView, UpdateCartRequest},
        catalog::{
            CreateLocationRequest, CreateProductRequest, LocationList, ProductList,
            UpdateLocationRequest, UpdateProductRequest,
        },
        chat::{
            ChatThread, ConversationList, ConversationSummary, MessageView, PostMessageRequest,
            UnreadMessages,
        },
        notifications::{NotificationList, UnreadCount},
        orders::{AssignOrderRequest, CheckoutRequest, OrderList, OrderWithItems, UpdateOrderRequest},
        profile::{ProfileView, UpdateProfileRequest},
        rewards::{AdjustPointsRequest, RewardProgram},
        subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
    },
    entity::{
        orders::OrderStatus,
        subscriptions::{Frequency, SubscriptionStatus},
        users::UserRole,
    },
    models::{
        Conversation, DeliveryLocation, Message, Notification, Order, OrderCustomer, OrderItem,
        OrderStatusChange, Product, RewardPoint, Subscription, User, UserProfile,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, notifications, orders, params, products, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "croquettes-shop",
        description = "Pet food storefront: catalog, session cart, orders, chat, loyalty and subscriptions"
    ),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        profile::get_profile,
        profile::update_profile,
        profile::my_subscriptions,
        profile::my_points,
        profile::program_info,
        products::list_products,
        products::get_product,
        products::list_locations,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::order_confirmation,
        orders::cancel_order,
        orders::order_chat,
        orders::post_order_message,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        admin::admin_list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::admin_list_locations,
        admin::create_location,
        admin::update_location,
        admin::list_orders,
        admin::get_order,
        admin::update_order,
        admin::assign_order,
        admin::list_staff,
        admin::list_subscriptions,
        admin::create_subscription,
        admin::get_subscription,
        admin::update_subscription,
        admin::record_delivery,
        admin::list_conversations,
        admin::unread_messages,
        admin::conversation_detail,
        admin::reply,
        admin::adjust_points
    ),
    components(
        schemas(
            User,
            UserRole,
            UserProfile,
            RewardPoint,
            Product,
            DeliveryLocation,
            Order,
            OrderCustomer,
            OrderStatus,
            OrderItem,
            OrderStatusChange,
            Notification,
            Conversation,
            Message,
            Subscription,
            Frequency,
            SubscriptionStatus,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            ProfileView,
            UpdateProfileRequest,
            RewardProgram,
            AdjustPointsRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateLocationRequest,
            UpdateLocationRequest,
            LocationList,
            AddToCartRequest,
            UpdateCartRequest,
            CartLine,
            CartView,
            CheckoutRequest,
            OrderWithItems,
            OrderList,
            UpdateOrderRequest,
            AssignOrderRequest,
            NotificationList,
            UnreadCount,
            PostMessageRequest,
            MessageView,
            ChatThread,
            ConversationSummary,
            ConversationList,
            UnreadMessages,
            CreateSubscriptionRequest,
            UpdateSubscriptionRequest,
            SubscriptionList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::NotificationQuery,
            params::SubscriptionQuery,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Profile", description = "Own account, profile and subscriptions"),
        (name = "Products", description = "Public catalog and delivery locations"),
        (name = "Cart", description = "Session cart, guests included"),
        (name = "Orders", description = "Checkout and own orders"),
        (name = "Chat", description = "Per-order conversations and the staff inbox"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Rewards", description = "Loyalty points"),
        (name = "Subscriptions", description = "Recurring deliveries, staff managed"),
        (name = "Admin", description = "Staff back office"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
