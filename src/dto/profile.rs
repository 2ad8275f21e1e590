use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, RewardPoint, Subscription, User, UserProfile};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub user: User,
    pub profile: UserProfile,
    pub reward_points: RewardPoint,
    pub orders: Vec<Order>,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}
