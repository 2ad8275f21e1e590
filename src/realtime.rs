//! Process-local fan-out for chat messages and notifications.
//!
//! Each group (`order_{id}`, `notifications_{user_id}`) is a
//! `tokio::sync::broadcast` channel carrying pre-serialized JSON frames.
//! Publishing is best-effort: nobody listening is the normal case.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Notification;

pub fn order_group(order_id: Uuid) -> String {
    format!("order_{order_id}")
}

pub fn notification_group(user_id: Uuid) -> String {
    format!("notifications_{user_id}")
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationPayload {
    pub id: Uuid,
    pub verb: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            verb: n.verb.clone(),
            url: n.url.clone(),
            created_at: n.created_at,
        }
    }
}

/// JSON envelope pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum RealtimeEvent {
    #[serde(rename = "chat.message")]
    ChatMessage {
        message: String,
        sender: String,
        created_at: DateTime<Utc>,
    },
    #[serde(rename = "notify")]
    Notify { payload: NotificationPayload },
}

#[derive(Clone)]
pub struct Hub {
    groups: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, group: &str) -> broadcast::Receiver<String> {
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        groups
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns how many receivers got the frame.
    pub fn publish(&self, group: &str, event: &RealtimeEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, group, "failed to encode realtime event");
                return 0;
            }
        };

        let sender = {
            let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
            groups.get(group).cloned()
        };
        let Some(sender) = sender else {
            tracing::debug!(group, "no realtime listeners");
            return 0;
        };

        match sender.send(frame) {
            Ok(delivered) => delivered,
            Err(_) => {
                // Every receiver is gone; forget the group.
                let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
                if groups.get(group).is_some_and(|s| s.receiver_count() == 0) {
                    groups.remove(group);
                }
                tracing::debug!(group, "realtime group closed");
                0
            }
        }
    }

    pub fn push_notification(&self, notification: &Notification) -> usize {
        let event = RealtimeEvent::Notify {
            payload: NotificationPayload::from(notification),
        };
        self.publish(&notification_group(notification.recipient_id), &event)
    }

    /// Push every freshly committed notification to its recipient.
    pub fn push_notifications(&self, notifications: &[Notification]) {
        for notification in notifications {
            self.push_notification(notification);
        }
    }

    /// Forget `group` once nobody listens to it. Call after dropping the receiver.
    pub fn release(&self, group: &str) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        let idle = groups.get(group).is_some_and(|s| s.receiver_count() == 0);
        if idle {
            groups.remove(group);
            tracing::debug!(group, "realtime group released");
        }
        idle
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
