pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod chat_service;
pub mod location_service;
pub mod loyalty_service;
pub mod notification_service;
pub mod order_events;
pub mod order_service;
pub mod product_service;
pub mod profile_service;
pub mod subscription_service;
