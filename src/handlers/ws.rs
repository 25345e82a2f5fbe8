//! WebSocket handler: connect-time bearer auth, group join/leave, comment
//! commands, and event forwarding from the hub.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::{requests, Request};
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::{ClientMessage, Principal, WsEvent};
use crate::repositories::UserRepository;

/// Generate a unique connection id.
fn connection_id() -> String {
    format!("{}.{}", std::process::id(), Uuid::new_v4().as_simple())
}

/// Upgrade HTTP to WebSocket. The bearer credential is validated exactly
/// once here, before the upgrade; the hub only ever sees the principal.
/// The token arrives as an `access_token` query parameter or an
/// Authorization header.
pub async fn ws_handler(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = params
        .get("access_token")
        .cloned()
        .or_else(|| bearer.map(|TypedHeader(auth)| auth.token().to_string()))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    let user_id = state.jwt_secret.validate(&token)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
    let principal = user.principal();

    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, principal)))
}

async fn handle_socket(state: AppState, socket: WebSocket, principal: Principal) {
    let conn_id = connection_id();
    info!(connection = %conn_id, user = %principal.username, "ws connected");

    let (mut sender, mut receiver) = socket.split();

    let conn_msg = json!({
        "event": "Connected",
        "data": { "connectionId": conn_id }
    });
    if sender.send(Message::Text(conn_msg.to_string())).await.is_err() {
        return;
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WsEvent>();
    state
        .hub
        .connect(conn_id.clone(), Some(principal.clone()), tx.clone())
        .await;

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Cancelled when the transport closes, so an in-flight command observes
    // the disconnect cooperatively.
    let cancel = CancellationToken::new();

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
                    debug!(connection = %conn_id, "ignoring malformed client message");
                    continue;
                };
                match client_msg {
                    ClientMessage::Join { data } => {
                        let group = data.activity_id.to_string();
                        if let Err(e) = state.hub.join(&conn_id, &group).await {
                            warn!(connection = %conn_id, group = %group, error = %e, "join failed");
                        }
                    }
                    ClientMessage::Leave { data } => {
                        let group = data.activity_id.to_string();
                        if let Err(e) = state.hub.leave(&conn_id, &group).await {
                            warn!(connection = %conn_id, group = %group, error = %e, "leave failed");
                        }
                    }
                    ClientMessage::Comment { data } => {
                        let activity_id = data.activity_id;
                        let request = Request::CreateComment(requests::CreateComment {
                            activity_id,
                            body: data.body,
                        });
                        match state
                            .dispatcher
                            .dispatch(Some(&principal), request, &cancel)
                            .await
                            .and_then(|reply| reply.into_comment())
                        {
                            Ok(dto) => {
                                // The command committed; the push happens
                                // after, and its failure stays here.
                                state.fanout.comment_created(activity_id, &dto).await;
                            }
                            Err(e) => {
                                let _ = tx.send(WsEvent {
                                    event: "CommandError".to_string(),
                                    group: activity_id.to_string(),
                                    data: json!({ "error": e.to_string() }),
                                });
                            }
                        }
                    }
                    ClientMessage::Ping => {
                        let _ = tx.send(WsEvent {
                            event: "Pong".to_string(),
                            group: String::new(),
                            data: json!({}),
                        });
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    cancel.cancel();
    state.hub.disconnect(&conn_id).await;
    send_task.abort();
    info!(connection = %conn_id, "ws disconnected");
}
