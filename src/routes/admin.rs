use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        catalog::{
            CreateLocationRequest, CreateProductRequest, LocationList, ProductList,
            UpdateLocationRequest, UpdateProductRequest,
        },
        chat::{ChatThread, ConversationList, MessageView, PostMessageRequest, UnreadMessages},
        orders::{AssignOrderRequest, OrderList, OrderWithItems, UpdateOrderRequest},
        rewards::AdjustPointsRequest,
        subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_staff},
    models::{DeliveryLocation, Product, RewardPoint, Subscription, User},
    response::ApiResponse,
    routes::params::{OrderListQuery, ProductQuery, SubscriptionQuery},
    services::{
        admin_service, chat_service, location_service, loyalty_service, product_service,
        subscription_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin_list_products).post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/locations", get(admin_list_locations).post(create_location))
        .route("/locations/{id}", put(update_location))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order).patch(update_order))
        .route("/orders/{id}/assign", put(assign_order))
        .route("/staff", get(list_staff))
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/subscriptions/{id}",
            get(get_subscription).patch(update_subscription),
        )
        .route("/subscriptions/{id}/deliveries", post(record_delivery))
        .route("/conversations", get(list_conversations))
        .route("/conversations/unread", get(unread_messages))
        .route("/conversations/{id}", get(conversation_detail))
        .route("/conversations/{id}/reply", post(reply))
        .route("/users/{id}/points", patch(adjust_points))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
    ),
    responses(
        (status = 200, description = "All products, inactive included", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    ensure_staff(&user)?;
    let resp = product_service::list_products(&state, query, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 400, description = "Product appears in orders"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/locations",
    responses(
        (status = 200, description = "All delivery locations", body = ApiResponse<LocationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_list_locations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<LocationList>>> {
    let resp = location_service::admin_list_locations(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Create delivery location", body = ApiResponse<DeliveryLocation>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateLocationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DeliveryLocation>>)> {
    let resp = location_service::create_location(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Update delivery location", body = ApiResponse<DeliveryLocation>),
        (status = 404, description = "Location not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<ApiResponse<DeliveryLocation>>> {
    let resp = location_service::update_location(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders in the caller's scope", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items and history", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Assigned to another staff member"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Illegal status transition"),
        (status = 403, description = "Assigned to another staff member")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::update_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/assign",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AssignOrderRequest,
    responses(
        (status = 200, description = "Order assigned", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Target is not staff"),
        (status = 403, description = "Superuser only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::assign_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/staff",
    responses(
        (status = 200, description = "Staff accounts", body = ApiResponse<Vec<User>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_staff(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let resp = admin_service::list_staff(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/subscriptions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "active | paused | cancelled"),
    ),
    responses(
        (status = 200, description = "All subscriptions", body = ApiResponse<SubscriptionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SubscriptionQuery>,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let resp = subscription_service::list_all(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = ApiResponse<Subscription>),
        (status = 400, description = "Unknown customer, product or location")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Subscription>>)> {
    let resp = subscription_service::create_subscription(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/admin/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Subscription", body = ApiResponse<Subscription>),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::get_subscription(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription updated", body = ApiResponse<Subscription>),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::update_subscription(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/{id}/deliveries",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses(
        (status = 200, description = "Next delivery scheduled", body = ApiResponse<Subscription>),
        (status = 400, description = "Subscription is not active")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn record_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::record_delivery(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/conversations",
    responses(
        (status = 200, description = "Staff inbox with unread counts", body = ApiResponse<ConversationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ConversationList>>> {
    let resp = chat_service::list_conversations(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/conversations/unread",
    responses(
        (status = 200, description = "Unread messages for the staff badge", body = ApiResponse<UnreadMessages>)
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn unread_messages(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadMessages>>> {
    let resp = chat_service::unread_messages_count(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation; other side's messages marked read", body = ApiResponse<ChatThread>),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn conversation_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ChatThread>>> {
    let resp = chat_service::conversation_detail(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/conversations/{id}/reply",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Reply stored and broadcast", body = ApiResponse<MessageView>),
        (status = 400, description = "Empty message")
    ),
    security(("bearer_auth" = [])),
    tag = "Chat"
)]
pub async fn reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MessageView>>)> {
    let resp = chat_service::reply(&state, &user, id, &payload.message).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/points",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdjustPointsRequest,
    responses(
        (status = 200, description = "Points adjusted", body = ApiResponse<RewardPoint>),
        (status = 400, description = "Balance would go negative")
    ),
    security(("bearer_auth" = [])),
    tag = "Rewards"
)]
pub async fn adjust_points(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustPointsRequest>,
) -> AppResult<Json<ApiResponse<RewardPoint>>> {
    let resp = loyalty_service::adjust_points(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
