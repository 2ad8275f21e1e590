//! Session layer and the typed values kept in it.

use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

use crate::{cart::Cart, config::AppConfig, error::AppResult};

pub const SESSION_COOKIE_NAME: &str = "croquettes_session";

pub mod keys {
    pub const CART: &str = "cart";
    /// Orders placed from this session, so guests can view their confirmation.
    pub const PLACED_ORDERS: &str = "placed_orders";
}

/// Postgres-backed session store; creates its table on first use.
pub async fn create_session_layer(
    pool: &PgPool,
    config: &AppConfig,
) -> anyhow::Result<SessionManagerLayer<PostgresStore>> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(config.session_ttl_seconds),
        ))
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}

pub async fn load_cart(session: &Session) -> AppResult<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

pub async fn save_cart(session: &Session, cart: &Cart) -> AppResult<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Persist the cart only when the request changed it, so browsing
/// never creates a stored session.
pub async fn save_cart_if_changed(
    session: &Session,
    before: &Cart,
    after: &Cart,
) -> AppResult<bool> {
    if before == after {
        return Ok(false);
    }
    save_cart(session, after).await?;
    Ok(true)
}

pub async fn remember_order(session: &Session, order_id: Uuid) -> AppResult<()> {
    let mut placed = placed_orders(session).await?;
    if !placed.contains(&order_id) {
        placed.push(order_id);
    }
    session.insert(keys::PLACED_ORDERS, placed).await?;
    Ok(())
}

pub async fn placed_orders(session: &Session) -> AppResult<Vec<Uuid>> {
    Ok(session
        .get::<Vec<Uuid>>(keys::PLACED_ORDERS)
        .await?
        .unwrap_or_default())
}
