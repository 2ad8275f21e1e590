use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod products;
pub mod profile;
pub mod ws;

/// Everything served under `/api`; state is attached at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(products::router())
        .merge(profile::router())
        .nest("/auth", auth::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
