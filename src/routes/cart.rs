use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartRequest},
    error::AppResult,
    middleware::session::{load_cart, save_cart, save_cart_if_changed},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart).delete(clear_cart))
        .route("/{product_id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Session cart", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let loaded = load_cart(&session).await?;
    let mut cart = loaded.clone();
    let resp = cart_service::view_cart(&state, &mut cart).await?;
    save_cart_if_changed(&session, &loaded, &cart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Added to cart", body = ApiResponse<CartView>),
        (status = 400, description = "Unknown product or invalid quantity")
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    let resp = cart_service::add_to_cart(&state, &mut cart, payload).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Cart updated", body = ApiResponse<CartView>),
        (status = 404, description = "Product not in cart")
    ),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    let resp = cart_service::update_cart_item(&state, &mut cart, product_id, payload).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<CartView>),
        (status = 404, description = "Product not in cart")
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    let resp = cart_service::remove_from_cart(&state, &mut cart, product_id).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart cleared", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(session: Session) -> AppResult<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    let resp = cart_service::clear_cart(&mut cart);
    save_cart(&session, &cart).await?;
    Ok(Json(resp))
}
