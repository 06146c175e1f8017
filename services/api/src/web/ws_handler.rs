//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a heartbeat WebSocket
//! connection. It runs the device's `SessionGuard` on the server side and
//! delegates the periodic checks to the heartbeat task.

use crate::web::{
    heartbeat_task::{heartbeat_process, send_message, SharedSink},
    middleware::CurrentUser,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ConnectionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use chrono::Utc;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use std::sync::Arc;
use study_tracker_core::{DeviceSession, SessionGuard};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type WsSender = SharedSink<SplitSink<WebSocket, Message>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user: CurrentUser) {
    info!("New heartbeat connection for user: {}", user.user_id);
    // The sender is shared with the heartbeat task.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let connection = match initialize(&app_state, &user, &mut receiver, &ws_sender).await {
        Some(connection) => connection,
        None => return,
    };
    let token = connection.cancellation_token.clone();
    let connection_lock = Arc::new(Mutex::new(connection));

    // --- 2. Heartbeat Task ---
    let heartbeat_handle = {
        let app_state = app_state.clone();
        let connection_lock = connection_lock.clone();
        let ws_sender = ws_sender.clone();
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = heartbeat_process(app_state, connection_lock, ws_sender, token).await {
                error!("Heartbeat process failed: {:?}", e);
            }
        })
    };

    // --- 3. Main Message Loop ---
    loop {
        let msg = tokio::select! {
            _ = token.cancelled() => break,
            msg = receiver.next() => msg,
        };
        match msg {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Logout) => {
                    info!("Logout received from {}", user.user_id);
                    let mut connection = connection_lock.lock().await;
                    if let Err(e) = connection.guard.logout().await {
                        warn!("Failed to release device session: {}", e);
                    }
                    break;
                }
                Ok(ClientMessage::Init { .. }) => {
                    warn!("Received subsequent Init message, which is ignored.");
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    token.cancel();
    if let Err(e) = heartbeat_handle.await {
        error!("Heartbeat task panicked: {:?}", e);
    }
    info!("Heartbeat connection closed for {}.", user.user_id);
}

/// Waits for the `Init` message, runs the guard's entry transition and confirms the
/// session to the client. Returns `None` when the connection should be dropped.
async fn initialize(
    app_state: &AppState,
    user: &CurrentUser,
    receiver: &mut SplitStream<WebSocket>,
    ws_sender: &WsSender,
) -> Option<ConnectionState> {
    let init = match receiver.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg @ ClientMessage::Init { .. }) => msg,
            _ => {
                error!("First message was not a valid Init message.");
                let err = ServerMessage::Error {
                    message: "Expected an init message.".to_string(),
                };
                let _ = send_message(ws_sender, &err).await;
                return None;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return None;
        }
    };

    let now = Utc::now();
    let device_type = init.device_type();
    let store = app_state.device_sessions.clone();
    let timings = app_state.config.guard_timings();
    let mut guard = match init {
        ClientMessage::Init {
            device_id: Some(device_id),
            token: Some(token),
            ..
        } => {
            let mut remembered =
                DeviceSession::with_device_id(&user.user_id, &device_id, device_type, now);
            remembered.token = token;
            SessionGuard::with_local_session(store, timings, remembered)
        }
        _ => SessionGuard::new(store, timings),
    };

    let session = match guard.enter(&user.user_id, device_type, now).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start device session for {}: {:?}", user.user_id, e);
            let err = ServerMessage::Error {
                message: "Failed to start the device session.".to_string(),
            };
            let _ = send_message(ws_sender, &err).await;
            return None;
        }
    };

    if let Err(e) = send_message(ws_sender, &ServerMessage::session_started(&session)).await {
        error!("Failed to send session started message: {}", e);
        return None;
    }
    info!("Device {} active for {}", session.device_id, user.user_id);

    Some(ConnectionState::new(
        user.user_id.clone(),
        user.auth_session_id.clone(),
        guard,
    ))
}
