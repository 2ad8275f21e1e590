use std::collections::HashSet;

use croquettes_shop::cart::Cart;
use uuid::Uuid;

#[test]
fn adding_twice_accumulates_and_keeps_first_price() {
    let mut cart = Cart::default();
    let kibble = Uuid::new_v4();

    cart.add(kibble, 9500, 1);
    cart.add(kibble, 9900, 2);

    let entry = cart.get(kibble).expect("line");
    assert_eq!(entry.quantity, 3);
    assert_eq!(entry.price, 9500);
    assert_eq!(cart.line_count(), 1);
    assert_eq!(cart.total_price(), 28_500);
}

#[test]
fn totals_count_units_across_lines() {
    let mut cart = Cart::default();
    cart.add(Uuid::new_v4(), 9500, 2);
    cart.add(Uuid::new_v4(), 2500, 3);

    assert_eq!(cart.item_count(), 5);
    assert_eq!(cart.total_price(), 2 * 9500 + 3 * 2500);
}

#[test]
fn update_to_zero_drops_the_line() {
    let mut cart = Cart::default();
    let kibble = Uuid::new_v4();
    cart.add(kibble, 8000, 2);

    assert!(cart.update(kibble, 5));
    assert_eq!(cart.get(kibble).map(|e| e.quantity), Some(5));

    assert!(cart.update(kibble, 0));
    assert!(cart.is_empty());
}

#[test]
fn update_and_remove_report_missing_lines() {
    let mut cart = Cart::default();
    let absent = Uuid::new_v4();

    assert!(!cart.update(absent, 2));
    assert!(!cart.remove(absent));
    assert!(cart.is_empty());
}

#[test]
fn retain_products_drops_stale_lines() {
    let mut cart = Cart::default();
    let kept = Uuid::new_v4();
    let gone = Uuid::new_v4();
    cart.add(kept, 1000, 1);
    cart.add(gone, 2000, 1);

    let known: HashSet<Uuid> = [kept].into_iter().collect();
    assert_eq!(cart.retain_products(&known), 1);
    assert_eq!(cart.product_ids(), vec![kept]);
}

#[test]
fn cart_survives_session_serialization() {
    let mut cart = Cart::default();
    cart.add(Uuid::new_v4(), 7500, 4);

    let json = serde_json::to_value(&cart).expect("serialize");
    let restored: Cart = serde_json::from_value(json).expect("deserialize");
    assert_eq!(restored, cart);

    cart.clear();
    assert_eq!(cart.total_price(), 0);
}
