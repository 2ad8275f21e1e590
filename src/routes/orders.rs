use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::{
        chat::{ChatThread, MessageView, PostMessageRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems},
    },
    error::AppResult,
    middleware::{
        auth::AuthUser,
        session::{load_cart, placed_orders, remember_order, save_cart},
    },
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{chat_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/confirmation", get(order_confirmation))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/chat", get(order_chat).post(post_order_message))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed from the session cart", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty cart, missing guest details, unknown location or insufficient stock")
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    session: Session,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithItems>>)> {
    let mut cart = load_cart(&session).await?;
    let resp = order_service::checkout(&state, user.as_ref(), &cart, payload).await?;

    cart.clear();
    save_cart(&session, &cart).await?;
    if let Some(details) = resp.data.as_ref() {
        remember_order(&session, details.order.id).await?;
    }
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending | confirmed | delivered | cancelled"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "Own orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Own order with items and history", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_my_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/confirmation",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order confirmation for the owner, staff or the placing session", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn order_confirmation(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let placed = placed_orders(&session).await?;
    let resp = order_service::order_confirmation(&state, user.as_ref(), &placed, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Order is no longer pending"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::cancel_my_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/chat",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order conversation, oldest message first", body = ApiResponse<ChatThread>),
        (status = 403, description = "Not the owner or staff")
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn order_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ChatThread>>> {
    let resp = chat_service::order_thread(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/chat",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = ApiResponse<MessageView>),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Not the owner or staff")
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn post_order_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MessageView>>)> {
    let resp = chat_service::send_order_message(&state, &user, id, &payload.message).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
