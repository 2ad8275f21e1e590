use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    cart::Cart,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        delivery_locations::Entity as DeliveryLocations,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        order_status_history::{Column as HistoryCol, Entity as OrderStatusHistory},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{DeliveryLocation, Order, OrderCustomer, OrderItem, OrderStatusChange},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_events,
    state::AppState,
};

/// Items, delivery location and status history of an order.
pub async fn order_details<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let delivery_location = DeliveryLocations::find_by_id(order.delivery_location_id)
        .one(conn)
        .await?
        .map(DeliveryLocation::from);

    let history = OrderStatusHistory::find()
        .filter(HistoryCol::OrderId.eq(order.id))
        .order_by_asc(HistoryCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderStatusChange::from)
        .collect();

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
        delivery_location,
        history,
    })
}

/// Who the order belongs to: the signed-in user, otherwise the guest contact fields.
pub fn resolve_customer(
    user: Option<&AuthUser>,
    payload: &CheckoutRequest,
) -> AppResult<OrderCustomer> {
    if let Some(user) = user {
        return Ok(OrderCustomer::Registered {
            user_id: user.user_id,
        });
    }

    let name = payload.guest_name.as_deref().map(str::trim).unwrap_or_default();
    let email = payload.guest_email.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest(
            "guest checkout requires a name and an email".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    let phone = payload
        .guest_phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok(OrderCustomer::Guest {
        name: name.to_string(),
        email: email.to_string(),
        phone,
    })
}

pub fn build_reference(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let simple = order_id.simple().to_string();
    format!("CMD-{}-{}", date, &simple[..8])
}

/// Turn the session cart into an order. The caller clears the cart and
/// remembers the order in the session once this returns.
pub async fn checkout(
    state: &AppState,
    user: Option<&AuthUser>,
    cart: &Cart,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    let customer = resolve_customer(user, &payload)?;

    let location = DeliveryLocations::find_by_id(payload.delivery_location_id)
        .one(&state.orm)
        .await?
        .filter(|l| l.is_active)
        .ok_or_else(|| AppError::BadRequest("unknown delivery location".into()))?;

    let txn = state.orm.begin().await?;

    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(cart.product_ids()))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut total_amount: i64 = 0;
    for (product_id, entry) in cart.entries() {
        let product = products
            .get(&product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                AppError::BadRequest(format!("product {product_id} is no longer available"))
            })?;
        if entry.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if product.stock < entry.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        total_amount += product.price * i64::from(entry.quantity);
    }

    let order_id = Uuid::new_v4();
    let (user_id, guest_name, guest_email, guest_phone) = match customer {
        OrderCustomer::Registered { user_id } => (Some(user_id), None, None, None),
        OrderCustomer::Guest { name, email, phone } => (None, Some(name), Some(email), phone),
    };

    let order = OrderActive {
        id: Set(order_id),
        reference: Set(build_reference(order_id)),
        user_id: Set(user_id),
        assigned_to: Set(None),
        guest_name: Set(guest_name),
        guest_email: Set(guest_email),
        guest_phone: Set(guest_phone),
        delivery_location_id: Set(location.id),
        status: Set(OrderStatus::Pending),
        total_amount: Set(total_amount),
        notes: Set(payload.notes.trim().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (product_id, entry) in cart.entries() {
        let Some(product) = products.get(&product_id) else {
            continue;
        };
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            quantity: Set(entry.quantity),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(entry.quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(&txn)
            .await?;
    }

    let notifications = order_events::notify_order_placed(&txn, &order).await?;
    let details = order_details(&txn, order).await?;
    txn.commit().await?;

    state.hub.push_notifications(&notifications);
    audit::record(
        state,
        user_id,
        "checkout",
        "orders",
        serde_json::json!({ "order_id": details.order.id, "total_amount": total_amount }),
    )
    .await;
    tracing::info!(
        order_id = %details.order.id,
        reference = %details.order.reference,
        guest = user_id.is_none(),
        "order placed"
    );

    Ok(ApiResponse::success(
        "Order placed",
        details,
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
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

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<orders::Model> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_my_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_owned(state, user, id).await?;
    Ok(ApiResponse::success(
        "Order",
        order_details(&state.orm, order).await?,
        Some(Meta::empty()),
    ))
}

/// Whether a confirmation page may be shown to this caller.
pub fn can_view_confirmation(
    user: Option<&AuthUser>,
    placed_in_session: &[Uuid],
    order: &orders::Model,
) -> bool {
    if placed_in_session.contains(&order.id) {
        return true;
    }
    match user {
        Some(user) => user.is_staff() || order.user_id == Some(user.user_id),
        None => false,
    }
}

pub async fn order_confirmation(
    state: &AppState,
    user: Option<&AuthUser>,
    placed_in_session: &[Uuid],
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_view_confirmation(user, placed_in_session, &order) {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Order confirmation",
        order_details(&state.orm, order).await?,
        None,
    ))
}

/// Customers may only withdraw an order nobody has confirmed yet.
pub async fn cancel_my_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(
            "only pending orders can be cancelled".into(),
        ));
    }

    let change = order_events::change_status(
        &txn,
        state.config.xof_per_point,
        order,
        OrderStatus::Cancelled,
        Some(user.user_id),
        Some("Cancelled by customer".to_string()),
    )
    .await?;
    let details = order_details(&txn, change.order).await?;
    txn.commit().await?;

    state.hub.push_notifications(&change.notifications);
    audit::record(
        state,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        details,
        Some(Meta::empty()),
    ))
}
