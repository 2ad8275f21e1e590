use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit,
    dto::rewards::{AdjustPointsRequest, RewardProgram},
    entity::{reward_points::ActiveModel as RewardActive, users::Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::RewardPoint,
    response::ApiResponse,
    services::profile_service::{ensure_reward_points, lock_reward_points},
    state::AppState,
};

/// Points earned for a delivered order worth `total_amount` XOF.
pub fn points_for(total_amount: i64, xof_per_point: i64) -> i32 {
    if total_amount <= 0 || xof_per_point <= 0 {
        return 0;
    }
    i32::try_from(total_amount / xof_per_point).unwrap_or(i32::MAX)
}

/// Credit the owner of a delivered order. Returns the points added.
/// Run it inside a transaction; the ledger row stays locked until commit.
pub async fn award_for_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    total_amount: i64,
    xof_per_point: i64,
) -> AppResult<i32> {
    let earned = points_for(total_amount, xof_per_point);
    if earned == 0 {
        return Ok(0);
    }

    let ledger = lock_reward_points(conn, user_id).await?;
    let points = ledger.points.saturating_add(earned);
    let total_earned = ledger.total_earned.saturating_add(earned);
    let mut active: RewardActive = ledger.into();
    active.points = Set(points);
    active.total_earned = Set(total_earned);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(conn).await?;

    tracing::debug!(%user_id, earned, "loyalty points awarded");
    Ok(earned)
}

pub async fn my_points(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<RewardPoint>> {
    let ledger = ensure_reward_points(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Reward points",
        RewardPoint::from(ledger),
        None,
    ))
}

pub fn program_info(state: &AppState) -> ApiResponse<RewardProgram> {
    let rate = state.config.xof_per_point;
    ApiResponse::success(
        "Reward program",
        RewardProgram {
            xof_per_point: rate,
            description: format!("Earn 1 point for every {rate} XOF of delivered orders."),
        },
        None,
    )
}

pub async fn adjust_points(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: AdjustPointsRequest,
) -> AppResult<ApiResponse<RewardPoint>> {
    ensure_staff(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".into()));
    }

    Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;
    let ledger = lock_reward_points(&txn, user_id).await?;
    let points = ledger
        .points
        .checked_add(payload.delta)
        .filter(|p| *p >= 0)
        .ok_or_else(|| AppError::BadRequest("points balance cannot go negative".into()))?;
    let total_earned = if payload.delta > 0 {
        ledger.total_earned.saturating_add(payload.delta)
    } else {
        ledger.total_earned
    };

    let mut active: RewardActive = ledger.into();
    active.points = Set(points);
    active.total_earned = Set(total_earned);
    active.updated_at = Set(chrono::Utc::now().into());
    let ledger = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "points_adjust",
        "reward_points",
        serde_json::json!({ "user_id": user_id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Points adjusted",
        RewardPoint::from(ledger),
        None,
    ))
}
