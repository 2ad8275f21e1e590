use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{
    dto::chat::{
        ChatThread, ConversationList, ConversationSummary, MessageView, UnreadMessages,
    },
    entity::{
        conversation_participants::{
            ActiveModel as ParticipantActive, Column as ParticipantCol,
            Entity as ConversationParticipants,
        },
        conversations::{
            self, ActiveModel as ConversationActive, Column as ConversationCol,
            Entity as Conversations,
        },
        messages::{self, ActiveModel as MessageActive, Column as MessageCol, Entity as Messages},
        orders::{self, Entity as Orders},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Conversation, Order},
    realtime::{RealtimeEvent, order_group},
    response::{ApiResponse, Meta},
    services::{notification_service, order_events},
    state::AppState,
};

/// Owner or any staff account. Shared by the HTTP handlers and the WebSocket connect path.
pub fn can_access_order(user: &AuthUser, order: &orders::Model) -> bool {
    user.is_staff() || order.user_id == Some(user.user_id)
}

pub async fn load_accessible_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<orders::Model> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !can_access_order(user, &order) {
        return Err(AppError::Forbidden);
    }
    Ok(order)
}

async fn usernames<C: ConnectionTrait>(conn: &C, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Users::find()
        .filter(UserCol::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

fn message_view(model: messages::Model, names: &HashMap<Uuid, String>) -> MessageView {
    MessageView {
        id: model.id,
        sender_id: model.sender_id,
        sender: names
            .get(&model.sender_id)
            .cloned()
            .unwrap_or_else(|| model.sender_id.to_string()),
        content: model.content,
        read: model.read,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}

async fn message_views<C: ConnectionTrait>(
    conn: &C,
    models: Vec<messages::Model>,
) -> AppResult<Vec<MessageView>> {
    let mut ids: Vec<Uuid> = models.iter().map(|m| m.sender_id).collect();
    ids.sort();
    ids.dedup();
    let names = usernames(conn, ids).await?;
    Ok(models
        .into_iter()
        .map(|m| message_view(m, &names))
        .collect())
}

async fn conversation_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Option<conversations::Model>> {
    Ok(Conversations::find()
        .filter(ConversationCol::OrderId.eq(order_id))
        .one(conn)
        .await?)
}

/// One conversation per order; concurrent first messages land in the same row.
async fn ensure_conversation<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<conversations::Model> {
    if let Some(conversation) = conversation_for_order(conn, order_id).await? {
        return Ok(conversation);
    }
    Conversations::insert(ConversationActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        created_at: NotSet,
    })
    .on_conflict(OnConflict::column(ConversationCol::OrderId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    conversation_for_order(conn, order_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn add_participants<C: ConnectionTrait>(
    conn: &C,
    conversation_id: Uuid,
    user_ids: &[Uuid],
) -> AppResult<()> {
    let rows = user_ids.iter().map(|user_id| ParticipantActive {
        conversation_id: Set(conversation_id),
        user_id: Set(*user_id),
    });
    ConversationParticipants::insert_many(rows)
        .on_conflict(
            OnConflict::columns([ParticipantCol::ConversationId, ParticipantCol::UserId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn participant_ids<C: ConnectionTrait>(conn: &C, conversation_id: Uuid) -> AppResult<Vec<Uuid>> {
    Ok(ConversationParticipants::find()
        .filter(ParticipantCol::ConversationId.eq(conversation_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.user_id)
        .collect())
}

/// Store a message on the order's conversation, notify the other participants
/// and broadcast it to everyone watching the order.
pub async fn post_message(
    state: &AppState,
    sender: &AuthUser,
    order: &orders::Model,
    content: &str,
) -> AppResult<MessageView> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }

    let txn = state.orm.begin().await?;
    let conversation = ensure_conversation(&txn, order.id).await?;

    let mut members = vec![sender.user_id];
    members.extend(order.user_id);
    members.extend(order.assigned_to);
    members.sort();
    members.dedup();
    add_participants(&txn, conversation.id, &members).await?;

    let message = MessageActive {
        id: Set(Uuid::new_v4()),
        conversation_id: Set(conversation.id),
        sender_id: Set(sender.user_id),
        content: Set(content.to_string()),
        read: Set(false),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut notifications = Vec::new();
    for recipient in participant_ids(&txn, conversation.id).await? {
        if recipient == sender.user_id {
            continue;
        }
        notifications.push(
            notification_service::create(
                &txn,
                recipient,
                order_events::verbs::new_message(&order.reference),
                order_events::chat_url(order.id),
            )
            .await?,
        );
    }
    txn.commit().await?;

    state.hub.push_notifications(&notifications);

    let names = HashMap::from([(sender.user_id, sender.username.clone())]);
    let view = message_view(message, &names);
    let delivered = state.hub.publish(
        &order_group(order.id),
        &RealtimeEvent::ChatMessage {
            message: view.content.clone(),
            sender: view.sender.clone(),
            created_at: view.created_at,
        },
    );
    tracing::debug!(order_id = %order.id, delivered, "chat message posted");

    Ok(view)
}

pub async fn order_thread(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<ChatThread>> {
    let order = load_accessible_order(state, user, order_id).await?;
    let conversation = conversation_for_order(&state.orm, order.id).await?;

    let messages = match &conversation {
        Some(conversation) => {
            let models = Messages::find()
                .filter(MessageCol::ConversationId.eq(conversation.id))
                .order_by_asc(MessageCol::CreatedAt)
                .all(&state.orm)
                .await?;
            message_views(&state.orm, models).await?
        }
        None => Vec::new(),
    };

    Ok(ApiResponse::success(
        "Chat",
        ChatThread {
            order: Order::from(order),
            conversation: conversation.map(Conversation::from),
            messages,
        },
        None,
    ))
}

pub async fn send_order_message(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    content: &str,
) -> AppResult<ApiResponse<MessageView>> {
    let order = load_accessible_order(state, user, order_id).await?;
    let view = post_message(state, user, &order, content).await?;
    Ok(ApiResponse::success("Message sent", view, None))
}

async fn unread_for<C: ConnectionTrait>(conn: &C, conversation_id: Uuid, viewer: Uuid) -> AppResult<u64> {
    Ok(Messages::find()
        .filter(MessageCol::ConversationId.eq(conversation_id))
        .filter(MessageCol::Read.eq(false))
        .filter(MessageCol::SenderId.ne(viewer))
        .count(conn)
        .await?)
}

async fn visible_conversations(state: &AppState, user: &AuthUser) -> AppResult<Vec<conversations::Model>> {
    let mut finder = Conversations::find().order_by_desc(ConversationCol::CreatedAt);
    if !user.is_superuser() {
        let mine: Vec<Uuid> = ConversationParticipants::find()
            .filter(ParticipantCol::UserId.eq(user.user_id))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| p.conversation_id)
            .collect();
        finder = finder.filter(ConversationCol::Id.is_in(mine));
    }
    Ok(finder.all(&state.orm).await?)
}

/// Staff inbox: superusers see every conversation, staff the ones they take part in.
pub async fn list_conversations(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ConversationList>> {
    ensure_staff(user)?;
    let conversations = visible_conversations(state, user).await?;

    let order_ids: Vec<Uuid> = conversations.iter().map(|c| c.order_id).collect();
    let references: HashMap<Uuid, String> = if order_ids.is_empty() {
        HashMap::new()
    } else {
        Orders::find()
            .filter(orders::Column::Id.is_in(order_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|o| (o.id, o.reference))
            .collect()
    };

    let mut items = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let unread = unread_for(&state.orm, conversation.id, user.user_id).await?;
        let last = Messages::find()
            .filter(MessageCol::ConversationId.eq(conversation.id))
            .order_by_desc(MessageCol::CreatedAt)
            .one(&state.orm)
            .await?;
        let last_message = match last {
            Some(model) => message_views(&state.orm, vec![model]).await?.pop(),
            None => None,
        };
        items.push(ConversationSummary {
            order_reference: references
                .get(&conversation.order_id)
                .cloned()
                .unwrap_or_default(),
            conversation: Conversation::from(conversation),
            unread,
            last_message,
        });
    }

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Conversations",
        ConversationList { items },
        Some(Meta::single_page(total)),
    ))
}

async fn load_inbox_conversation(
    state: &AppState,
    user: &AuthUser,
    conversation_id: Uuid,
) -> AppResult<conversations::Model> {
    ensure_staff(user)?;
    let conversation = Conversations::find_by_id(conversation_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !user.is_superuser()
        && !participant_ids(&state.orm, conversation.id)
            .await?
            .contains(&user.user_id)
    {
        return Err(AppError::Forbidden);
    }
    Ok(conversation)
}

/// Opening a conversation marks the other side's messages read.
pub async fn conversation_detail(
    state: &AppState,
    user: &AuthUser,
    conversation_id: Uuid,
) -> AppResult<ApiResponse<ChatThread>> {
    let conversation = load_inbox_conversation(state, user, conversation_id).await?;

    Messages::update_many()
        .col_expr(MessageCol::Read, Expr::value(true))
        .filter(MessageCol::ConversationId.eq(conversation.id))
        .filter(MessageCol::Read.eq(false))
        .filter(MessageCol::SenderId.ne(user.user_id))
        .exec(&state.orm)
        .await?;

    let order = Orders::find_by_id(conversation.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let models = Messages::find()
        .filter(MessageCol::ConversationId.eq(conversation.id))
        .order_by_asc(MessageCol::CreatedAt)
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Conversation",
        ChatThread {
            order: Order::from(order),
            conversation: Some(Conversation::from(conversation)),
            messages: message_views(&state.orm, models).await?,
        },
        None,
    ))
}

pub async fn reply(
    state: &AppState,
    user: &AuthUser,
    conversation_id: Uuid,
    content: &str,
) -> AppResult<ApiResponse<MessageView>> {
    let conversation = load_inbox_conversation(state, user, conversation_id).await?;
    let order = Orders::find_by_id(conversation.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let view = post_message(state, user, &order, content).await?;
    Ok(ApiResponse::success("Reply sent", view, None))
}

/// Badge count for the staff inbox.
pub async fn unread_messages_count(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UnreadMessages>> {
    ensure_staff(user)?;
    let ids: Vec<Uuid> = visible_conversations(state, user)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let unread = if ids.is_empty() {
        0
    } else {
        Messages::find()
            .filter(MessageCol::ConversationId.is_in(ids))
            .filter(MessageCol::Read.eq(false))
            .filter(MessageCol::SenderId.ne(user.user_id))
            .count(&state.orm)
            .await?
    };
    Ok(ApiResponse::success(
        "Unread messages",
        UnreadMessages { unread },
        None,
    ))
}
