use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Conversation, Order};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender: String,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatThread {
    pub order: Order,
    pub conversation: Option<Conversation>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub order_reference: String,
    pub unread: u64,
    pub last_message: Option<MessageView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationList {
    pub items: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadMessages {
    pub unread: u64,
}
