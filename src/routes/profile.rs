use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{
        profile::{ProfileView, UpdateProfileRequest},
        rewards::RewardProgram,
        subscriptions::SubscriptionList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::RewardPoint,
    response::ApiResponse,
    services::{loyalty_service, profile_service, subscription_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/subscriptions", get(my_subscriptions))
        .route("/rewards", get(my_points))
        .route("/rewards/program", get(program_info))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Account, profile, points, orders and subscriptions", body = ApiResponse<ProfileView>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let resp = profile_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileView>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let resp = profile_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/profile/subscriptions",
    responses(
        (status = 200, description = "Own subscriptions", body = ApiResponse<SubscriptionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn my_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let resp = subscription_service::list_mine(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/rewards",
    responses(
        (status = 200, description = "Own reward points", body = ApiResponse<RewardPoint>)
    ),
    security(("bearer_auth" = [])),
    tag = "Rewards"
)]
pub async fn my_points(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RewardPoint>>> {
    let resp = loyalty_service::my_points(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/rewards/program",
    responses(
        (status = 200, description = "How points are earned", body = ApiResponse<RewardProgram>)
    ),
    tag = "Rewards"
)]
pub async fn program_info(State(state): State<AppState>) -> Json<ApiResponse<RewardProgram>> {
    Json(loyalty_service::program_info(&state))
}
