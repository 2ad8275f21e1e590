use std::time::Duration;

use chrono::NaiveDate;
use croquettes_shop::{
    cart::Cart,
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::RegisterRequest,
        cart::AddToCartRequest,
        catalog::{CreateProductRequest, UpdateProductRequest},
        orders::{AssignOrderRequest, CheckoutRequest, UpdateOrderRequest},
        profile::UpdateProfileRequest,
        rewards::AdjustPointsRequest,
        subscriptions::{CreateSubscriptionRequest, UpdateSubscriptionRequest},
    },
    entity::{
        delivery_locations::{ActiveModel as LocationActive, Entity as DeliveryLocations},
        orders::OrderStatus,
        products::{ActiveModel as ProductActive, Entity as Products},
        reward_points::{Column as RewardCol, Entity as RewardPoints},
        subscriptions::{Frequency, SubscriptionStatus},
        users::UserRole,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::OrderCustomer,
    routes::params::NotificationQuery,
    services::{
        admin_service, auth_service, cart_service, chat_service, loyalty_service,
        notification_service, order_service, product_service, profile_service,
        subscription_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

// Skips when no database is configured.
async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run shop flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    Ok(Some(AppState::new(
        orm,
        AppConfig::with_defaults(database_url, "test-secret"),
    )))
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn account(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let username = format!("{}_{}", format!("{role:?}").to_lowercase(), suffix());
    let txn = state.orm.begin().await?;
    let user = auth_service::create_account(
        &txn,
        auth_service::NewAccount {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password_hash: auth_service::hash_password("croquettes")?,
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            role,
        },
    )
    .await?;
    txn.commit().await?;

    Ok(AuthUser {
        user_id: user.id,
        username,
        role,
    })
}

async fn catalog(state: &AppState, price: i64, stock: i32) -> anyhow::Result<(Uuid, Uuid)> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Croquettes Test {}", suffix())),
        description: Set("Poulet et riz".into()),
        price: Set(price),
        image: Set(None),
        stock: Set(stock),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let location = LocationActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Plateau {}", suffix())),
        address: Set("Dakar".into()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok((product.id, location.id))
}

fn checkout_request(location_id: Uuid, guest: bool) -> CheckoutRequest {
    CheckoutRequest {
        delivery_location_id: location_id,
        notes: "Sonner deux fois".into(),
        guest_name: guest.then(|| "Awa Diop".to_string()),
        guest_email: guest.then(|| "awa@example.com".to_string()),
        guest_phone: None,
    }
}

#[tokio::test]
async fn registration_opens_profile_and_points_once() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let username = format!("fatou_{}", suffix());
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            username: username.clone(),
            email: format!("{username}@example.com"),
            password: "croquettes".into(),
            first_name: "Fatou".into(),
            last_name: "Sow".into(),
            phone: Some("770000000".into()),
        },
    )
    .await?
    .data
    .expect("registration data");
    assert!(registered.token.starts_with("Bearer "));

    let user = AuthUser {
        user_id: registered.user.id,
        username: username.clone(),
        role: UserRole::Customer,
    };
    let profile = profile_service::get_profile(&state, &user)
        .await?
        .data
        .expect("profile");
    assert_eq!(profile.profile.phone, "770000000");
    assert_eq!(profile.reward_points.points, 0);

    let rows = RewardPoints::find()
        .filter(RewardCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 1);

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            username,
            email: "other@example.com".into(),
            password: "croquettes".into(),
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn order_lifecycle_with_chat_and_points() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let staff = account(&state, UserRole::Staff).await?;
    let superuser = account(&state, UserRole::Superuser).await?;
    let (product_id, location_id) = catalog(&state, 9500, 10).await?;

    // Guest checkout
    let mut guest_cart = Cart::default();
    cart_service::add_to_cart(
        &state,
        &mut guest_cart,
        AddToCartRequest {
            product_id,
            quantity: Some(2),
        },
    )
    .await?;
    let guest_order = order_service::checkout(
        &state,
        None,
        &guest_cart,
        checkout_request(location_id, true),
    )
    .await?
    .data
    .expect("guest order");
    assert_eq!(guest_order.order.total_amount, 19_000);
    assert_eq!(guest_order.order.status, OrderStatus::Pending);
    assert!(matches!(
        guest_order.order.customer,
        OrderCustomer::Guest { .. }
    ));
    assert_eq!(guest_order.items.len(), 1);
    assert_eq!(guest_order.items[0].price, 9500);

    let stock = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product")
        .stock;
    assert_eq!(stock, 8);

    // Registered checkout, then a price change that must not touch the order
    let mut cart = Cart::default();
    cart_service::add_to_cart(
        &state,
        &mut cart,
        AddToCartRequest {
            product_id,
            quantity: None,
        },
    )
    .await?;
    let placed = order_service::checkout(
        &state,
        Some(&customer),
        &cart,
        checkout_request(location_id, false),
    )
    .await?
    .data
    .expect("order");
    let order_id = placed.order.id;

    let mut repriced: ProductActive = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    repriced.price = Set(12_000);
    repriced.update(&state.orm).await?;

    let mine = order_service::get_my_order(&state, &customer, order_id)
        .await?
        .data
        .expect("own order");
    assert_eq!(mine.items[0].price, 9500);
    assert_eq!(mine.order.total_amount, 9500);

    // Assignment and status changes
    admin_service::assign_order(
        &state,
        &superuser,
        order_id,
        AssignOrderRequest {
            staff_id: Some(staff.user_id),
        },
    )
    .await?;

    for status in [OrderStatus::Confirmed, OrderStatus::Delivered] {
        admin_service::update_order(
            &state,
            &staff,
            order_id,
            UpdateOrderRequest {
                status: Some(status),
                notes: None,
            },
        )
        .await?;
    }

    let delivered = admin_service::get_order_admin(&state, &staff, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    assert!(delivered.history.len() >= 2);
    assert!(
        delivered
            .history
            .iter()
            .any(|h| h.old_status == OrderStatus::Confirmed
                && h.new_status == OrderStatus::Delivered
                && h.changed_by == Some(staff.user_id))
    );

    let points = loyalty_service::my_points(&state, &customer)
        .await?
        .data
        .expect("points");
    assert_eq!(points.points, 9);
    assert_eq!(points.total_earned, 9);

    let inbox = notification_service::list_mine(&state, &customer, NotificationQuery::default())
        .await?
        .data
        .expect("notifications");
    assert!(inbox.items.iter().any(|n| n.verb.contains("from confirmed to delivered")));
    assert!(inbox.unread > 0);

    let cancel = order_service::cancel_my_order(&state, &customer, order_id).await;
    assert!(matches!(cancel, Err(AppError::BadRequest(_))));

    // Chat between the owner and staff
    chat_service::send_order_message(&state, &customer, order_id, "Merci, bien reçu !").await?;

    let stranger = account(&state, UserRole::Customer).await?;
    let denied = chat_service::order_thread(&state, &stranger, order_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let conversations = chat_service::list_conversations(&state, &staff)
        .await?
        .data
        .expect("conversations");
    let summary = conversations
        .items
        .iter()
        .find(|c| c.conversation.order_id == order_id)
        .expect("conversation for the order");
    assert_eq!(summary.order_reference, placed.order.reference);
    assert_eq!(summary.unread, 1);

    let thread = chat_service::conversation_detail(&state, &staff, summary.conversation.id)
        .await?
        .data
        .expect("thread");
    assert_eq!(thread.messages.len(), 1);

    let after = chat_service::list_conversations(&state, &staff)
        .await?
        .data
        .expect("conversations");
    let summary = after
        .items
        .iter()
        .find(|c| c.conversation.order_id == order_id)
        .expect("conversation for the order");
    assert_eq!(summary.unread, 0);

    Ok(())
}

#[tokio::test]
async fn checkout_guards_and_catalog_constraints() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let staff = account(&state, UserRole::Staff).await?;
    let (product_id, location_id) = catalog(&state, 7500, 3).await?;

    let empty = order_service::checkout(
        &state,
        Some(&customer),
        &Cart::default(),
        checkout_request(location_id, false),
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let mut cart = Cart::default();
    cart_service::add_to_cart(
        &state,
        &mut cart,
        AddToCartRequest {
            product_id,
            quantity: Some(4),
        },
    )
    .await?;
    let short = order_service::checkout(
        &state,
        Some(&customer),
        &cart,
        checkout_request(location_id, false),
    )
    .await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));

    let mut closed: LocationActive = DeliveryLocations::find_by_id(location_id)
        .one(&state.orm)
        .await?
        .expect("location")
        .into();
    closed.is_active = Set(false);
    closed.update(&state.orm).await?;

    assert!(cart.update(product_id, 1));
    let inactive = order_service::checkout(
        &state,
        Some(&customer),
        &cart,
        checkout_request(location_id, false),
    )
    .await;
    assert!(matches!(inactive, Err(AppError::BadRequest(_))));

    let stock = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product")
        .stock;
    assert_eq!(stock, 3);

    let (_, open_location) = catalog(&state, 1000, 1).await?;
    order_service::checkout(
        &state,
        Some(&customer),
        &cart,
        checkout_request(open_location, false),
    )
    .await?;

    let deleted = product_service::delete_product(&state, &staff, product_id).await;
    assert!(matches!(deleted, Err(AppError::BadRequest(_))));

    let name = format!("Croquettes Chaton {}", suffix());
    let create = |name: String| CreateProductRequest {
        name,
        description: String::new(),
        price: 6000,
        stock: 5,
        image: None,
        is_active: None,
    };
    let first = product_service::create_product(&state, &staff, create(name.clone()))
        .await?
        .data
        .expect("product");
    let duplicate = product_service::create_product(&state, &staff, create(name.clone())).await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let other = product_service::create_product(&state, &staff, create(format!("{name} bis")))
        .await?
        .data
        .expect("product");
    let renamed = product_service::update_product(
        &state,
        &staff,
        other.id,
        UpdateProductRequest {
            name: Some(first.name.clone()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(renamed, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn points_adjustments_respect_the_balance() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let staff = account(&state, UserRole::Staff).await?;
    let adjust = |delta| AdjustPointsRequest { delta };

    let overdraw =
        loyalty_service::adjust_points(&state, &staff, customer.user_id, adjust(-1)).await;
    assert!(matches!(overdraw, Err(AppError::BadRequest(_))));

    let denied =
        loyalty_service::adjust_points(&state, &customer, customer.user_id, adjust(5)).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let credited = loyalty_service::adjust_points(&state, &staff, customer.user_id, adjust(5))
        .await?
        .data
        .expect("points");
    assert_eq!((credited.points, credited.total_earned), (5, 5));

    let debited = loyalty_service::adjust_points(&state, &staff, customer.user_id, adjust(-3))
        .await?
        .data
        .expect("points");
    assert_eq!((debited.points, debited.total_earned), (2, 5));

    Ok(())
}

#[tokio::test]
async fn overlapping_point_changes_are_not_lost() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let staff = account(&state, UserRole::Staff).await?;
    let user_id = customer.user_id;

    let txn = state.orm.begin().await?;
    let earned = loyalty_service::award_for_order(&txn, user_id, 9000, 1000).await?;
    assert_eq!(earned, 9);

    let adjustment = tokio::spawn({
        let state = state.clone();
        async move {
            let delta = AdjustPointsRequest { delta: 5 };
            loyalty_service::adjust_points(&state, &staff, user_id, delta)
                .await
                .map(|_| ())
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    txn.commit().await?;
    adjustment.await??;

    let ledger = loyalty_service::my_points(&state, &customer)
        .await?
        .data
        .expect("points");
    assert_eq!(ledger.points, 14);
    assert_eq!(ledger.total_earned, 14);

    Ok(())
}

#[tokio::test]
async fn subscriptions_need_products_and_an_active_status() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let staff = account(&state, UserRole::Staff).await?;
    let (product_id, location_id) = catalog(&state, 9500, 10).await?;
    let start = NaiveDate::from_ymd_opt(2025, 1, 31).expect("date");
    let request = |product_ids| CreateSubscriptionRequest {
        user_id: customer.user_id,
        product_ids,
        delivery_location_id: location_id,
        frequency: Frequency::Monthly,
        next_delivery: start,
    };

    let empty = subscription_service::create_subscription(&state, &staff, request(vec![])).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let created = subscription_service::create_subscription(
        &state,
        &staff,
        request(vec![product_id, product_id]),
    )
    .await?
    .data
    .expect("subscription");
    assert_eq!(created.product_ids, vec![product_id]);
    assert_eq!(created.status, SubscriptionStatus::Active);

    let cleared = subscription_service::update_subscription(
        &state,
        &staff,
        created.id,
        UpdateSubscriptionRequest {
            product_ids: Some(vec![]),
            delivery_location_id: None,
            frequency: None,
            status: None,
            next_delivery: None,
        },
    )
    .await;
    assert!(matches!(cleared, Err(AppError::BadRequest(_))));

    let set_status = |status| UpdateSubscriptionRequest {
        product_ids: None,
        delivery_location_id: None,
        frequency: None,
        status: Some(status),
        next_delivery: None,
    };
    subscription_service::update_subscription(
        &state,
        &staff,
        created.id,
        set_status(SubscriptionStatus::Paused),
    )
    .await?;
    let paused = subscription_service::record_delivery(&state, &staff, created.id).await;
    assert!(matches!(paused, Err(AppError::BadRequest(_))));

    subscription_service::update_subscription(
        &state,
        &staff,
        created.id,
        set_status(SubscriptionStatus::Active),
    )
    .await?;
    let delivered = subscription_service::record_delivery(&state, &staff, created.id)
        .await?
        .data
        .expect("subscription");
    assert_eq!(
        delivered.next_delivery,
        NaiveDate::from_ymd_opt(2025, 2, 28).expect("date")
    );

    Ok(())
}

#[tokio::test]
async fn notifications_and_profile_belong_to_their_owner() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let customer = account(&state, UserRole::Customer).await?;
    let other = account(&state, UserRole::Customer).await?;
    let theirs = notification_service::create(
        &state.orm,
        other.user_id,
        "Your order #CMD-TEST has been placed.",
        "/orders/test",
    )
    .await?;

    let foreign = notification_service::mark_read(&state, &customer, theirs.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    let own = notification_service::mark_read(&state, &other, theirs.id)
        .await?
        .data
        .expect("unread count");
    assert_eq!(own.unread, 0);

    let updated = profile_service::update_profile(
        &state,
        &customer,
        UpdateProfileRequest {
            first_name: Some(" Awa ".into()),
            address: Some("Rue 10, Dakar".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(updated.user.first_name, "Awa");
    assert_eq!(updated.profile.address, "Rue 10, Dakar");

    let rejected = profile_service::update_profile(
        &state,
        &customer,
        UpdateProfileRequest {
            first_name: Some("Changed".into()),
            email: Some("no-at-sign".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::BadRequest(_))));

    Ok(())
}
