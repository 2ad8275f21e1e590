use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::subscriptions::{Frequency, SubscriptionStatus},
    models::Subscription,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    pub product_ids: Vec<Uuid>,
    pub delivery_location_id: Uuid,
    pub frequency: Frequency,
    pub next_delivery: NaiveDate,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub product_ids: Option<Vec<Uuid>>,
    pub delivery_location_id: Option<Uuid>,
    pub frequency: Option<Frequency>,
    pub status: Option<SubscriptionStatus>,
    pub next_delivery: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionList {
    pub items: Vec<Subscription>,
}
