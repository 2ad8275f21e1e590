//! Order status workflow and the notifications it fans out.
//!
//! Every status change goes through [`change_status`], inside the caller's
//! transaction. The returned notifications are pushed once that transaction
//! has committed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        order_status_history::ActiveModel as HistoryActive,
        orders::{self, ActiveModel as OrderActive, OrderStatus},
        users::{Column as UserCol, Entity as Users, UserRole},
    },
    error::{AppError, AppResult},
    models::{Notification, OrderStatusChange},
    services::{loyalty_service, notification_service},
};

pub fn order_url(order_id: Uuid) -> String {
    format!("/orders/{order_id}")
}

pub fn admin_order_url(order_id: Uuid) -> String {
    format!("/admin/orders/{order_id}")
}

pub fn chat_url(order_id: Uuid) -> String {
    format!("/orders/{order_id}/chat")
}

pub mod verbs {
    use crate::entity::orders::OrderStatus;

    pub fn new_order(reference: &str) -> String {
        format!("New order #{reference}")
    }

    pub fn order_placed(reference: &str) -> String {
        format!("Your order #{reference} has been placed.")
    }

    pub fn owner_status_changed(reference: &str, old: OrderStatus, new: OrderStatus) -> String {
        format!("The status of your order #{reference} changed from {old} to {new}.")
    }

    pub fn staff_status_changed(reference: &str, new: OrderStatus) -> String {
        format!("Order #{reference} status changed: {new}.")
    }

    pub fn order_assigned(reference: &str) -> String {
        format!("Order #{reference} has been assigned to you.")
    }

    pub fn new_message(reference: &str) -> String {
        format!("New message on order #{reference}")
    }
}

/// Result of a status change, ready to be pushed after commit.
#[derive(Debug)]
pub struct StatusChange {
    pub order: orders::Model,
    pub history: OrderStatusChange,
    pub notifications: Vec<Notification>,
    pub points_awarded: i32,
}

/// Reject unchanged and illegal transitions.
pub fn check_transition(old: OrderStatus, new: OrderStatus) -> AppResult<()> {
    if old == new {
        return Err(AppError::BadRequest(format!("order is already {new}")));
    }
    if !old.can_transition_to(new) {
        return Err(AppError::BadRequest(format!(
            "cannot change order status from {old} to {new}"
        )));
    }
    Ok(())
}

pub async fn staff_ids<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<Uuid>> {
    Ok(Users::find()
        .filter(UserCol::Role.is_in([UserRole::Staff, UserRole::Superuser]))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect())
}

/// New order: every staff account hears about it, and so does a registered owner.
pub async fn notify_order_placed<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
) -> AppResult<Vec<Notification>> {
    let mut sent = Vec::new();
    for staff_id in staff_ids(conn).await? {
        sent.push(
            notification_service::create(
                conn,
                staff_id,
                verbs::new_order(&order.reference),
                admin_order_url(order.id),
            )
            .await?,
        );
    }
    if let Some(owner) = order.user_id {
        sent.push(
            notification_service::create(
                conn,
                owner,
                verbs::order_placed(&order.reference),
                order_url(order.id),
            )
            .await?,
        );
    }
    Ok(sent)
}

pub async fn change_status<C: ConnectionTrait>(
    conn: &C,
    xof_per_point: i64,
    order: orders::Model,
    new_status: OrderStatus,
    changed_by: Option<Uuid>,
    notes: Option<String>,
) -> AppResult<StatusChange> {
    let old_status = order.status;
    check_transition(old_status, new_status)?;

    let mut active: OrderActive = order.into();
    active.status = Set(new_status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(conn).await?;

    let history = HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        old_status: Set(old_status),
        new_status: Set(new_status),
        changed_by: Set(changed_by),
        notes: Set(notes.unwrap_or_default()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    let mut notifications = Vec::new();
    if let Some(owner) = order.user_id {
        notifications.push(
            notification_service::create(
                conn,
                owner,
                verbs::owner_status_changed(&order.reference, old_status, new_status),
                order_url(order.id),
            )
            .await?,
        );
    }
    if let Some(staff) = order.assigned_to {
        notifications.push(
            notification_service::create(
                conn,
                staff,
                verbs::staff_status_changed(&order.reference, new_status),
                admin_order_url(order.id),
            )
            .await?,
        );
    }

    let mut points_awarded = 0;
    if new_status == OrderStatus::Delivered {
        if let Some(owner) = order.user_id {
            points_awarded =
                loyalty_service::award_for_order(conn, owner, order.total_amount, xof_per_point)
                    .await?;
        }
    }

    tracing::info!(
        order_id = %order.id,
        from = %old_status,
        to = %new_status,
        "order status changed"
    );

    Ok(StatusChange {
        order,
        history: OrderStatusChange::from(history),
        notifications,
        points_awarded,
    })
}
