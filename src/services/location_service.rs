use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{CreateLocationRequest, LocationList, UpdateLocationRequest},
    entity::delivery_locations::{ActiveModel, Column, Entity as DeliveryLocations},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::DeliveryLocation,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_locations(
    state: &AppState,
    include_inactive: bool,
) -> AppResult<ApiResponse<LocationList>> {
    let mut finder = DeliveryLocations::find();
    if !include_inactive {
        finder = finder.filter(Column::IsActive.eq(true));
    }
    let items: Vec<DeliveryLocation> = finder
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(DeliveryLocation::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Delivery locations",
        LocationList { items },
        Some(Meta::single_page(total)),
    ))
}

pub async fn admin_list_locations(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<LocationList>> {
    ensure_staff(user)?;
    list_locations(state, true).await
}

pub async fn create_location(
    state: &AppState,
    user: &AuthUser,
    payload: CreateLocationRequest,
) -> AppResult<ApiResponse<DeliveryLocation>> {
    ensure_staff(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    let location = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        address: Set(payload.address.trim().to_string()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "location_create",
        "delivery_locations",
        serde_json::json!({ "location_id": location.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Delivery location created",
        DeliveryLocation::from(location),
        Some(Meta::empty()),
    ))
}

pub async fn update_location(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateLocationRequest,
) -> AppResult<ApiResponse<DeliveryLocation>> {
    ensure_staff(user)?;
    let existing = DeliveryLocations::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let location = if active.is_changed() {
        active.update(&state.orm).await?
    } else {
        existing
    };

    Ok(ApiResponse::success(
        "Delivery location updated",
        DeliveryLocation::from(location),
        Some(Meta::empty()),
    ))
}
