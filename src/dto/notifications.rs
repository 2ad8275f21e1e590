use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Notification;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub items: Vec<Notification>,
    pub unread: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub ok: bool,
    pub unread: u64,
}
