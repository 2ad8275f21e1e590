use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::orders::OrderStatus,
    models::{DeliveryLocation, Order, OrderItem, OrderStatusChange},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub delivery_location_id: Uuid,
    #[serde(default)]
    pub notes: String,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub delivery_location: Option<DeliveryLocation>,
    pub history: Vec<OrderStatusChange>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignOrderRequest {
    /// `null` unassigns the order.
    pub staff_id: Option<Uuid>,
}
