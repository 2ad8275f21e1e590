use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{LockType, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::profile::{ProfileView, UpdateProfileRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        reward_points::{self, ActiveModel as RewardActive, Column as RewardCol, Entity as RewardPoints},
        subscriptions::{Column as SubCol, Entity as Subscriptions},
        user_profiles::{
            self, ActiveModel as ProfileActive, Column as ProfileCol, Entity as UserProfiles,
        },
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, RewardPoint, User, UserProfile},
    response::{ApiResponse, Meta},
    services::subscription_service::attach_products,
    state::AppState,
};

/// Profile row for the user, created on first access for accounts that predate it.
pub async fn ensure_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<user_profiles::Model> {
    if let Some(profile) = UserProfiles::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(profile);
    }

    UserProfiles::insert(ProfileActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        phone: Set(String::new()),
        address: Set(String::new()),
        created_at: NotSet,
    })
    .on_conflict(OnConflict::column(ProfileCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    UserProfiles::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Same get-or-create contract as [`ensure_profile`], for the points ledger.
pub async fn ensure_reward_points<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<reward_points::Model> {
    if let Some(points) = RewardPoints::find()
        .filter(RewardCol::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(points);
    }

    RewardPoints::insert(RewardActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(0),
        total_earned: Set(0),
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(RewardCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    RewardPoints::find()
        .filter(RewardCol::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Points ledger locked `FOR UPDATE` for the rest of the caller's transaction,
/// so concurrent awards and adjustments apply one after the other.
pub async fn lock_reward_points<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<reward_points::Model> {
    ensure_reward_points(conn, user_id).await?;
    RewardPoints::find()
        .filter(RewardCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ProfileView>> {
    let txn = state.orm.begin().await?;
    let account = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let profile = ensure_profile(&txn, user.user_id).await?;
    let points = ensure_reward_points(&state.orm, user.user_id).await?;

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let subscriptions = Subscriptions::find()
        .filter(SubCol::UserId.eq(user.user_id))
        .order_by_asc(SubCol::NextDelivery)
        .all(&state.orm)
        .await?;
    let subscriptions = attach_products(&state.orm, subscriptions).await?;

    Ok(ApiResponse::success(
        "Profile",
        ProfileView {
            user: User::from(account),
            profile: UserProfile::from(profile),
            reward_points: RewardPoint::from(points),
            orders,
            subscriptions,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<ProfileView>> {
    if let Some(email) = payload.email.as_deref() {
        if !email.trim().contains('@') {
            return Err(AppError::BadRequest("a valid email is required".into()));
        }
    }
    if let Some(phone) = payload.phone.as_deref() {
        if phone.trim().chars().count() > 20 {
            return Err(AppError::BadRequest("phone is too long".into()));
        }
    }

    let txn = state.orm.begin().await?;
    let account = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let profile = ensure_profile(&txn, user.user_id).await?;

    let mut active: UserActive = account.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(email) = payload.email {
        active.email = Set(email.trim().to_string());
    }
    if active.is_changed() {
        active.update(&txn).await?;
    }

    let mut active: ProfileActive = profile.into();
    if let Some(phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if active.is_changed() {
        active.update(&txn).await?;
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "profile_update",
        "user_profiles",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    let mut resp = get_profile(state, user).await?;
    resp.message = "Profile updated".into();
    Ok(resp)
}
