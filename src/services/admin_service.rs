use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{AssignOrderRequest, OrderList, OrderWithItems, UpdateOrderRequest},
    entity::{
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        users::{Column as UserCol, Entity as Users, UserRole},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff, ensure_superuser},
    models::{Order, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{notification_service, order_events, order_service::order_details},
    state::AppState,
};

/// Superusers manage everything; other staff manage unassigned orders and their own.
pub fn staff_can_manage(user: &AuthUser, order: &orders::Model) -> bool {
    if user.is_superuser() {
        return true;
    }
    user.is_staff() && order.assigned_to.is_none_or(|staff| staff == user.user_id)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if !user.is_superuser() {
        condition = condition.add(OrderCol::AssignedTo.eq(user.user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !staff_can_manage(user, &order) {
        return Err(AppError::Forbidden);
    }

    Ok(ApiResponse::success(
        "Order",
        order_details(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

/// Notes edit and optional status change. Resubmitting the current status
/// leaves it alone.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;
    let mut order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if !staff_can_manage(user, &order) {
        return Err(AppError::Forbidden);
    }

    if let Some(notes) = payload.notes {
        let mut active: OrderActive = order.clone().into();
        active.notes = Set(notes.trim().to_string());
        if active.is_changed() {
            active.updated_at = Set(Utc::now().into());
            order = active.update(&txn).await?;
        }
    }

    let mut notifications = Vec::new();
    let old_status = order.status;
    if let Some(status) = payload.status.filter(|s| *s != order.status) {
        let change = order_events::change_status(
            &txn,
            state.config.xof_per_point,
            order,
            status,
            Some(user.user_id),
            None,
        )
        .await?;
        notifications = change.notifications;
        order = change.order;
    }

    let details = order_details(&txn, order).await?;
    txn.commit().await?;

    state.hub.push_notifications(&notifications);
    audit::record(
        state,
        Some(user.user_id),
        "order_update",
        "orders",
        serde_json::json!({
            "order_id": id,
            "old_status": old_status,
            "new_status": details.order.status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        details,
        Some(Meta::empty()),
    ))
}

pub async fn assign_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AssignOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_superuser(user)?;

    if let Some(staff_id) = payload.staff_id {
        let staff = Users::find_by_id(staff_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::BadRequest("unknown staff member".into()))?;
        if !staff.role.is_staff() {
            return Err(AppError::BadRequest(
                "orders can only be assigned to staff".into(),
            ));
        }
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous = order.assigned_to;
    let mut active: OrderActive = order.clone().into();
    active.assigned_to = Set(payload.staff_id);
    let order = if active.is_changed() {
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?
    } else {
        order
    };

    let mut notifications = Vec::new();
    if let Some(staff_id) = payload.staff_id.filter(|s| previous != Some(*s)) {
        notifications.push(
            notification_service::create(
                &txn,
                staff_id,
                order_events::verbs::order_assigned(&order.reference),
                order_events::admin_order_url(order.id),
            )
            .await?,
        );
    }

    let details = order_details(&txn, order).await?;
    txn.commit().await?;

    state.hub.push_notifications(&notifications);
    audit::record(
        state,
        Some(user.user_id),
        "order_assign",
        "orders",
        serde_json::json!({ "order_id": id, "staff_id": payload.staff_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order assigned",
        details,
        Some(Meta::empty()),
    ))
}

/// Accounts orders can be assigned to.
pub async fn list_staff(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Vec<User>>> {
    ensure_staff(user)?;
    let staff: Vec<User> = Users::find()
        .filter(UserCol::Role.is_in([UserRole::Staff, UserRole::Superuser]))
        .order_by_asc(UserCol::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    let total = staff.len() as i64;
    Ok(ApiResponse::success("Staff", staff, Some(Meta::single_page(total))))
}
