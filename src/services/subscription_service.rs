use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::subscriptions::{CreateSubscriptionRequest, SubscriptionList, UpdateSubscriptionRequest},
    entity::{
        delivery_locations::Entity as DeliveryLocations,
        products::{Column as ProductCol, Entity as Products},
        subscription_products::{
            ActiveModel as LinkActive, Column as LinkCol, Entity as SubscriptionProducts,
        },
        subscriptions::{self, ActiveModel, Column, Entity as Subscriptions, SubscriptionStatus},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Subscription,
    response::{ApiResponse, Meta},
    routes::params::SubscriptionQuery,
    state::AppState,
};

/// Load the product ids of each subscription in one query.
pub async fn attach_products<C: ConnectionTrait>(
    conn: &C,
    models: Vec<subscriptions::Model>,
) -> AppResult<Vec<Subscription>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut by_subscription: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in SubscriptionProducts::find()
        .filter(LinkCol::SubscriptionId.is_in(ids))
        .all(conn)
        .await?
    {
        by_subscription
            .entry(link.subscription_id)
            .or_default()
            .push(link.product_id);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let mut product_ids = by_subscription.remove(&model.id).unwrap_or_default();
            product_ids.sort();
            Subscription::from_parts(model, product_ids)
        })
        .collect())
}

async fn load(state: &AppState, id: Uuid) -> AppResult<subscriptions::Model> {
    Subscriptions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn one(state: &AppState, model: subscriptions::Model) -> AppResult<Subscription> {
    attach_products(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

/// Deduplicated product ids, every one of which must exist.
async fn checked_products<C: ConnectionTrait>(conn: &C, product_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let unique: Vec<Uuid> = product_ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Err(AppError::BadRequest(
            "a subscription needs at least one product".into(),
        ));
    }
    let found = Products::find()
        .filter(ProductCol::Id.is_in(unique.clone()))
        .count(conn)
        .await?;
    if found as usize != unique.len() {
        return Err(AppError::BadRequest("unknown product in subscription".into()));
    }
    Ok(unique)
}

async fn check_location<C: ConnectionTrait>(conn: &C, location_id: Uuid) -> AppResult<()> {
    DeliveryLocations::find_by_id(location_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown delivery location".into()))?;
    Ok(())
}

async fn link_products<C: ConnectionTrait>(
    conn: &C,
    subscription_id: Uuid,
    product_ids: &[Uuid],
) -> AppResult<()> {
    SubscriptionProducts::delete_many()
        .filter(LinkCol::SubscriptionId.eq(subscription_id))
        .exec(conn)
        .await?;
    let links = product_ids.iter().map(|product_id| LinkActive {
        subscription_id: Set(subscription_id),
        product_id: Set(*product_id),
    });
    SubscriptionProducts::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn list_all(
    state: &AppState,
    user: &AuthUser,
    query: SubscriptionQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Subscriptions::find();
    if let Some(status) = query.status {
        finder = finder.filter(Column::Status.eq(status));
    }
    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .order_by_asc(Column::NextDelivery)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = attach_products(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;
    let model = load(state, id).await?;
    Ok(ApiResponse::success("Subscription", one(state, model).await?, None))
}

pub async fn create_subscription(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubscriptionRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;

    Users::find_by_id(payload.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("unknown customer".into()))?;

    let txn = state.orm.begin().await?;
    check_location(&txn, payload.delivery_location_id).await?;
    let product_ids = checked_products(&txn, &payload.product_ids).await?;

    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        delivery_location_id: Set(payload.delivery_location_id),
        frequency: Set(payload.frequency),
        status: Set(SubscriptionStatus::Active),
        next_delivery: Set(payload.next_delivery),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    link_products(&txn, model.id, &product_ids).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "subscription_create",
        "subscriptions",
        serde_json::json!({ "subscription_id": model.id, "user_id": model.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Subscription created",
        one(state, model).await?,
        Some(Meta::empty()),
    ))
}

pub async fn update_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubscriptionRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;
    let existing = load(state, id).await?;

    let txn = state.orm.begin().await?;
    let mut active: ActiveModel = existing.clone().into();
    if let Some(location_id) = payload.delivery_location_id {
        check_location(&txn, location_id).await?;
        active.delivery_location_id = Set(location_id);
    }
    if let Some(frequency) = payload.frequency {
        active.frequency = Set(frequency);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(next_delivery) = payload.next_delivery {
        active.next_delivery = Set(next_delivery);
    }
    let model = if active.is_changed() {
        active.update(&txn).await?
    } else {
        existing
    };

    if let Some(product_ids) = payload.product_ids {
        let product_ids = checked_products(&txn, &product_ids).await?;
        link_products(&txn, model.id, &product_ids).await?;
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "subscription_update",
        "subscriptions",
        serde_json::json!({ "subscription_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Subscription updated",
        one(state, model).await?,
        Some(Meta::empty()),
    ))
}

/// A delivery went out: schedule the next one.
pub async fn record_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;
    let existing = load(state, id).await?;
    if existing.status != SubscriptionStatus::Active {
        return Err(AppError::BadRequest(
            "only active subscriptions can record a delivery".into(),
        ));
    }

    let next = existing
        .frequency
        .next_after(existing.next_delivery)
        .ok_or_else(|| AppError::BadRequest("next delivery date is out of range".into()))?;

    let mut active: ActiveModel = existing.into();
    active.next_delivery = Set(next);
    let model = active.update(&state.orm).await?;
    tracing::debug!(subscription_id = %model.id, next_delivery = %next, "delivery recorded");

    Ok(ApiResponse::success(
        "Delivery recorded",
        one(state, model).await?,
        None,
    ))
}

pub async fn list_mine(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let models = Subscriptions::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_asc(Column::NextDelivery)
        .all(&state.orm)
        .await?;
    let items = attach_products(&state.orm, models).await?;
    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        None,
    ))
}
