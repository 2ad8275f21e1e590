use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::notifications::{NotificationList, UnreadCount},
    entity::notifications::{ActiveModel, Column, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::NotificationQuery,
    state::AppState,
};

/// Persist an unread notification. Pushing it in real time is the caller's job,
/// once the surrounding transaction has committed.
pub async fn create<C: ConnectionTrait>(
    conn: &C,
    recipient_id: Uuid,
    verb: impl Into<String>,
    url: impl Into<String>,
) -> AppResult<Notification> {
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        recipient_id: Set(recipient_id),
        verb: Set(verb.into()),
        url: Set(url.into()),
        unread: Set(true),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(Notification::from(model))
}

pub async fn count_unread<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<u64> {
    Ok(Notifications::find()
        .filter(Column::RecipientId.eq(user_id))
        .filter(Column::Unread.eq(true))
        .count(conn)
        .await?)
}

pub async fn list_mine(
    state: &AppState,
    user: &AuthUser,
    query: NotificationQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Notifications::find().filter(Column::RecipientId.eq(user.user_id));
    if query.unread_only.unwrap_or(false) {
        finder = finder.filter(Column::Unread.eq(true));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .order_by_desc(Column::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();
    let unread = count_unread(&state.orm, user.user_id).await?;

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items, unread },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let unread = count_unread(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Unread notifications",
        UnreadCount { ok: true, unread },
        None,
    ))
}

/// Someone else's notification is reported as missing.
pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UnreadCount>> {
    let notification = Notifications::find_by_id(id)
        .filter(Column::RecipientId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if notification.unread {
        let mut active: ActiveModel = notification.into();
        active.unread = Set(false);
        active.update(&state.orm).await?;
    }

    let unread = count_unread(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Notification read",
        UnreadCount { ok: true, unread },
        None,
    ))
}

pub async fn mark_all_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UnreadCount>> {
    let result = Notifications::update_many()
        .col_expr(Column::Unread, Expr::value(false))
        .filter(Column::RecipientId.eq(user.user_id))
        .filter(Column::Unread.eq(true))
        .exec(&state.orm)
        .await?;
    tracing::debug!(user_id = %user.user_id, marked = result.rows_affected, "notifications read");

    Ok(ApiResponse::success(
        "All notifications read",
        UnreadCount { ok: true, unread: 0 },
        None,
    ))
}
