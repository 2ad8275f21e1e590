use std::sync::Arc;

use croquettes_shop::{
    cart::Cart,
    middleware::session::{keys, load_cart, save_cart_if_changed},
};
use tower_sessions::{MemoryStore, Session};
use uuid::Uuid;

fn session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

#[tokio::test]
async fn viewing_an_unchanged_cart_stores_nothing() {
    let session = session();
    let cart = load_cart(&session).await.expect("load");

    let saved = save_cart_if_changed(&session, &cart, &cart.clone())
        .await
        .expect("save");

    assert!(!saved);
    assert!(session.get::<Cart>(keys::CART).await.expect("get").is_none());
    assert!(session.is_empty().await);
}

#[tokio::test]
async fn changed_cart_is_written_back() {
    let session = session();
    let before = load_cart(&session).await.expect("load");
    let mut after = before.clone();
    after.add(Uuid::new_v4(), 2500, 2);

    let saved = save_cart_if_changed(&session, &before, &after)
        .await
        .expect("save");

    assert!(saved);
    assert_eq!(load_cart(&session).await.expect("reload"), after);
}
