use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    cart::Cart,
    dto::cart::{AddToCartRequest, CartLine, CartView, UpdateCartRequest},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    image: Option<String>,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

async fn products_by_id(state: &AppState, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Product>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, description, price, image, stock, is_active, created_at
        FROM products
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(state.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, Product::from(row)))
        .collect())
}

/// Render the cart, dropping lines whose product has been deleted.
pub async fn cart_view(state: &AppState, cart: &mut Cart) -> AppResult<CartView> {
    let products = products_by_id(state, &cart.product_ids()).await?;
    let known: HashSet<Uuid> = products.keys().copied().collect();
    let dropped = cart.retain_products(&known);
    if dropped > 0 {
        tracing::debug!(dropped, "stale cart lines removed");
    }

    let items = cart
        .entries()
        .filter_map(|(product_id, entry)| {
            products.get(&product_id).map(|product| CartLine {
                product: product.clone(),
                quantity: entry.quantity,
                price: entry.price,
                total_price: entry.total_price(),
            })
        })
        .collect();

    Ok(CartView {
        items,
        item_count: cart.item_count(),
        total_price: cart.total_price(),
    })
}

pub async fn view_cart(state: &AppState, cart: &mut Cart) -> AppResult<ApiResponse<CartView>> {
    let view = cart_view(state, cart).await?;
    let lines = view.items.len() as i64;
    Ok(ApiResponse::success("Cart", view, Some(Meta::single_page(lines))))
}

pub async fn add_to_cart(
    state: &AppState,
    cart: &mut Cart,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let products = products_by_id(state, &[payload.product_id]).await?;
    let product = products
        .get(&payload.product_id)
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;

    cart.add(product.id, product.price, quantity);
    tracing::debug!(product_id = %product.id, quantity, "added to cart");

    Ok(ApiResponse::success(
        "Added to cart",
        cart_view(state, cart).await?,
        None,
    ))
}

pub async fn update_cart_item(
    state: &AppState,
    cart: &mut Cart,
    product_id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if !cart.update(product_id, payload.quantity) {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Cart updated",
        cart_view(state, cart).await?,
        None,
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    cart: &mut Cart,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    if !cart.remove(product_id) {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Removed from cart",
        cart_view(state, cart).await?,
        Some(Meta::empty()),
    ))
}

pub fn clear_cart(cart: &mut Cart) -> ApiResponse<CartView> {
    cart.clear();
    ApiResponse::success(
        "Cart cleared",
        CartView {
            items: Vec::new(),
            item_count: 0,
            total_price: 0,
        },
        Some(Meta::empty()),
    )
}
