use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct RewardProgram {
    pub xof_per_point: i64,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustPointsRequest {
    pub delta: i32,
}
