use chrono::Utc;
use croquettes_shop::{
    dto::orders::CheckoutRequest,
    entity::{
        orders::{self, OrderStatus},
        users::UserRole,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::OrderCustomer,
    services::{
        admin_service::staff_can_manage,
        chat_service::can_access_order,
        loyalty_service::points_for,
        order_events::{self, check_transition, verbs},
        order_service::{build_reference, can_view_confirmation, resolve_customer},
    },
};
use uuid::Uuid;

fn auth(role: UserRole) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        username: format!("{role:?}").to_lowercase(),
        role,
    }
}

fn order(owner: Option<Uuid>, assigned_to: Option<Uuid>) -> orders::Model {
    let id = Uuid::new_v4();
    orders::Model {
        id,
        reference: build_reference(id),
        user_id: owner,
        assigned_to,
        guest_name: None,
        guest_email: None,
        guest_phone: None,
        delivery_location_id: Uuid::new_v4(),
        status: OrderStatus::Pending,
        total_amount: 19_000,
        notes: String::new(),
        created_at: Utc::now().fixed_offset(),
        updated_at: Utc::now().fixed_offset(),
    }
}

fn checkout(name: Option<&str>, email: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        delivery_location_id: Uuid::new_v4(),
        notes: String::new(),
        guest_name: name.map(str::to_string),
        guest_email: email.map(str::to_string),
        guest_phone: Some("  ".into()),
    }
}

#[test]
fn status_transitions() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Confirmed));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Delivered));
    assert!(Confirmed.can_transition_to(Cancelled));

    assert!(!Pending.can_transition_to(Delivered));
    assert!(!Delivered.can_transition_to(Pending));
    assert!(!Cancelled.can_transition_to(Confirmed));
    assert!(Delivered.is_terminal() && Cancelled.is_terminal());
}

#[test]
fn check_transition_rejects_same_and_illegal_moves() {
    assert!(check_transition(OrderStatus::Pending, OrderStatus::Confirmed).is_ok());

    match check_transition(OrderStatus::Confirmed, OrderStatus::Confirmed) {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "order is already confirmed"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        check_transition(OrderStatus::Delivered, OrderStatus::Cancelled),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn notification_texts_and_links() {
    let id = Uuid::new_v4();
    assert_eq!(verbs::new_order("CMD-1"), "New order #CMD-1");
    assert_eq!(
        verbs::owner_status_changed("CMD-1", OrderStatus::Pending, OrderStatus::Confirmed),
        "The status of your order #CMD-1 changed from pending to confirmed."
    );
    assert_eq!(
        verbs::staff_status_changed("CMD-1", OrderStatus::Delivered),
        "Order #CMD-1 status changed: delivered."
    );
    assert_eq!(order_events::order_url(id), format!("/orders/{id}"));
    assert_eq!(order_events::admin_order_url(id), format!("/admin/orders/{id}"));
    assert_eq!(order_events::chat_url(id), format!("/orders/{id}/chat"));
}

#[test]
fn references_are_dated_and_derived_from_the_id() {
    let id = Uuid::new_v4();
    let reference = build_reference(id);
    let parts: Vec<&str> = reference.split('-').collect();

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "CMD");
    assert_eq!(parts[1], Utc::now().format("%Y%m%d").to_string());
    assert_eq!(parts[2], &id.simple().to_string()[..8]);
}

#[test]
fn signed_in_checkout_belongs_to_the_user() {
    let user = auth(UserRole::Customer);
    let customer = resolve_customer(Some(&user), &checkout(None, None)).expect("customer");
    assert_eq!(
        customer,
        OrderCustomer::Registered {
            user_id: user.user_id
        }
    );
}

#[test]
fn guest_checkout_needs_name_and_email() {
    let customer =
        resolve_customer(None, &checkout(Some(" Awa "), Some("awa@example.com"))).expect("guest");
    assert_eq!(
        customer,
        OrderCustomer::Guest {
            name: "Awa".into(),
            email: "awa@example.com".into(),
            phone: None,
        }
    );

    assert!(resolve_customer(None, &checkout(Some("Awa"), None)).is_err());
    assert!(resolve_customer(None, &checkout(None, Some("awa@example.com"))).is_err());
    assert!(resolve_customer(None, &checkout(Some("Awa"), Some("awa.example.com"))).is_err());
}

#[test]
fn chat_access_is_owner_or_staff() {
    let owner = auth(UserRole::Customer);
    let stranger = auth(UserRole::Customer);
    let staff = auth(UserRole::Staff);
    let o = order(Some(owner.user_id), None);

    assert!(can_access_order(&owner, &o));
    assert!(can_access_order(&staff, &o));
    assert!(!can_access_order(&stranger, &o));
}

#[test]
fn staff_manage_unassigned_and_own_orders() {
    let staff = auth(UserRole::Staff);
    let colleague = auth(UserRole::Staff);
    let superuser = auth(UserRole::Superuser);
    let customer = auth(UserRole::Customer);

    let unassigned = order(None, None);
    let mine = order(None, Some(staff.user_id));
    let theirs = order(None, Some(colleague.user_id));

    assert!(staff_can_manage(&staff, &unassigned));
    assert!(staff_can_manage(&staff, &mine));
    assert!(!staff_can_manage(&staff, &theirs));
    assert!(staff_can_manage(&superuser, &theirs));
    assert!(!staff_can_manage(&customer, &unassigned));
}

#[test]
fn confirmation_visibility() {
    let owner = auth(UserRole::Customer);
    let stranger = auth(UserRole::Customer);
    let staff = auth(UserRole::Staff);
    let guest_order = order(None, None);
    let owned = order(Some(owner.user_id), None);

    assert!(can_view_confirmation(None, &[guest_order.id], &guest_order));
    assert!(!can_view_confirmation(None, &[], &guest_order));
    assert!(can_view_confirmation(Some(&owner), &[], &owned));
    assert!(!can_view_confirmation(Some(&stranger), &[], &owned));
    assert!(can_view_confirmation(Some(&staff), &[], &owned));
}

#[test]
fn loyalty_points_per_xof() {
    assert_eq!(points_for(19_000, 1000), 19);
    assert_eq!(points_for(999, 1000), 0);
    assert_eq!(points_for(0, 1000), 0);
    assert_eq!(points_for(5000, 0), 0);
}
