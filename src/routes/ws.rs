//! WebSocket endpoints for order chat and live notifications.

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    entity::orders,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, bearer_token, decode_token},
    realtime::{notification_group, order_group},
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/orders/{order_id}", get(order_socket))
        .route("/ws/notifications", get(notification_socket))
}

/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also come as a query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SocketAuth {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundChat {
    message: String,
}

pub fn authenticate(
    jwt_secret: &str,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> AppResult<AuthUser> {
    let token = match bearer_token(headers) {
        Some(token) => token?,
        None => query_token
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?,
    };
    decode_token(jwt_secret, token)
}

pub async fn order_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Query(auth): Query<SocketAuth>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let user = authenticate(&state.config.jwt_secret, &headers, auth.token.as_deref())?;
    let order = chat_service::load_accessible_order(&state, &user, order_id).await?;
    Ok(ws.on_upgrade(move |socket| order_session(socket, state, user, order)))
}

pub async fn notification_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<SocketAuth>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let user = authenticate(&state.config.jwt_secret, &headers, auth.token.as_deref())?;
    Ok(ws.on_upgrade(move |socket| notification_session(socket, state, user)))
}

async fn order_session(socket: WebSocket, state: AppState, user: AuthUser, order: orders::Model) {
    let group = order_group(order.id);
    let mut rx = state.hub.subscribe(&group);
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(%group, user_id = %user.user_id, "chat socket connected");

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%group, skipped, "chat socket lagged");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<InboundChat>(text.as_str()) else {
                        tracing::debug!(%group, "ignoring malformed chat frame");
                        continue;
                    };
                    if frame.message.trim().is_empty() {
                        continue;
                    }
                    let posted =
                        chat_service::post_message(&state, &user, &order, &frame.message).await;
                    if let Err(err) = posted {
                        tracing::warn!(%group, error = %err, "chat message over socket failed");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(%group, error = %err, "chat socket error");
                    break;
                }
            },
        }
    }

    drop(rx);
    state.hub.release(&group);
    tracing::debug!(%group, user_id = %user.user_id, "chat socket closed");
}

async fn notification_session(socket: WebSocket, state: AppState, user: AuthUser) {
    let group = notification_group(user.user_id);
    let mut rx = state.hub.subscribe(&group);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%group, skipped, "notification socket lagged");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(rx);
    state.hub.release(&group);
    tracing::debug!(%group, "notification socket closed");
}
