//! services/api/src/web/heartbeat_task.rs
//!
//! This module contains the asynchronous "worker" function that ticks a
//! connection's `SessionGuard` and evicts the device once another one takes over.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, ConnectionState},
};
use axum::extract::ws::Message;
use chrono::Utc;
use futures::{Sink, SinkExt};
use std::fmt::Display;
use std::sync::Arc;
use study_tracker_core::{HeartbeatOutcome, PortError, PortResult};
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The sending half of a socket, shared between the connection loop and its worker.
pub type SharedSink<S> = Arc<Mutex<S>>;

/// Serializes and sends one server message.
pub async fn send_message<S>(ws_sender: &SharedSink<S>, msg: &ServerMessage) -> PortResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = msg
        .to_json()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to send {:?}: {}", msg, e)))
}

/// The main heartbeat loop for one connection.
///
/// Ticks every `heartbeat_interval` until the token is cancelled, the guard becomes
/// inactive, or a conflict has been handled.
pub async fn heartbeat_process<S>(
    app_state: Arc<AppState>,
    connection_lock: Arc<Mutex<ConnectionState>>,
    ws_sender: SharedSink<S>,
    cancellation_token: CancellationToken,
) -> PortResult<()>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    let timings = connection_lock.lock().await.guard.timings();
    let period = timings.heartbeat_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Heartbeat started ({}s interval).", period.as_secs());

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Heartbeat cancelled.");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let outcome = {
            let mut connection = connection_lock.lock().await;
            connection.guard.heartbeat(Utc::now()).await
        };

        match outcome {
            Ok(HeartbeatOutcome::Renewed(session)) => {
                let ack = ServerMessage::HeartbeatAck {
                    last_active: session.last_active.to_rfc3339(),
                };
                if let Err(e) = send_message(&ws_sender, &ack).await {
                    error!("Failed to send heartbeat ack: {}", e);
                    return Err(e);
                }
            }
            Ok(HeartbeatOutcome::Conflict { current_device_id }) => {
                warn!("Device {} took over; evicting this connection.", current_device_id);
                return evict(&app_state, &connection_lock, &ws_sender, &cancellation_token).await;
            }
            Ok(HeartbeatOutcome::Inactive) => {
                info!("Session guard inactive; heartbeat stops.");
                return Ok(());
            }
            Err(e) if e.is_transient() => {
                warn!("Session store unreachable, retrying on the next tick: {}", e);
            }
            Err(e) => {
                error!("Heartbeat failed: {}", e);
                return Err(e);
            }
        }
    }
}

/// Notifies the client, waits the logout delay, then forces the logout and ends the
/// login session.
async fn evict<S>(
    app_state: &AppState,
    connection_lock: &Mutex<ConnectionState>,
    ws_sender: &SharedSink<S>,
    cancellation_token: &CancellationToken,
) -> PortResult<()>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    let delay = connection_lock.lock().await.guard.timings().logout_delay;
    let notice = ServerMessage::SessionConflict {
        message: "Your account was opened on another device. You will be logged out here."
            .to_string(),
        logout_in_secs: delay.as_secs(),
    };
    send_message(ws_sender, &notice).await?;

    tokio::select! {
        _ = cancellation_token.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }

    let auth_session_id = {
        let mut connection = connection_lock.lock().await;
        if let Err(e) = connection.guard.logout().await {
            warn!("Failed to release device session for {}: {}", connection.user_id, e);
        }
        connection.auth_session_id.clone()
    };
    if let Err(e) = app_state
        .auth_sessions
        .delete_auth_session(&auth_session_id)
        .await
    {
        warn!("Failed to delete auth session after eviction: {}", e);
    }

    // The client may already be gone; the logout above happened either way.
    if let Err(e) = send_message(ws_sender, &ServerMessage::ForcedLogout).await {
        warn!("{}", e);
    }
    let _ = ws_sender.lock().await.send(Message::Close(None)).await;
    cancellation_token.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Stores;
    use crate::config::Config;
    use futures::channel::mpsc;
    use futures::StreamExt;
    use study_tracker_core::quotes::StaticQuotes;
    use study_tracker_core::{DeviceSession, DeviceType, GuardTimings, PlanCatalog, SessionGuard};

    fn message_type(msg: &Message) -> String {
        match msg {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                value["type"].as_str().unwrap().to_string()
            }
            Message::Close(_) => "close".to_string(),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn taken_over_device_is_warned_then_logged_out() {
        let config = Arc::new(Config::from_lookup(|_| None).unwrap());
        let stores = Stores::in_memory();
        let app_state = Arc::new(AppState::new(
            config,
            PlanCatalog::standard(),
            stores.clone(),
            Arc::new(StaticQuotes),
        ));
        let now = Utc::now();
        stores
            .auth_sessions
            .create_auth_session("auth-1", "asha", now + chrono::Duration::days(30))
            .await
            .unwrap();

        let mut guard = SessionGuard::new(stores.device_sessions.clone(), GuardTimings::default());
        let mine = DeviceSession::with_device_id("asha", "a1", DeviceType::Web, now);
        guard.claim(mine).await.unwrap();
        // Another device logs in before the first heartbeat.
        let other = DeviceSession::with_device_id("asha", "b2", DeviceType::Mobile, now);
        stores.device_sessions.save(&other).await.unwrap();

        let connection = ConnectionState::new("asha".to_string(), "auth-1".to_string(), guard);
        let token = connection.cancellation_token.clone();
        let (tx, rx) = mpsc::unbounded::<Message>();
        let started = Instant::now();
        heartbeat_process(
            app_state,
            Arc::new(Mutex::new(connection)),
            Arc::new(Mutex::new(tx)),
            token.clone(),
        )
        .await
        .unwrap();

        let timings = GuardTimings::default();
        let expected = timings.heartbeat_interval + timings.logout_delay;
        assert!(started.elapsed() >= expected);
        assert!(token.is_cancelled());

        let sent: Vec<String> = rx.map(|msg| message_type(&msg)).collect().await;
        assert_eq!(sent, vec!["session_conflict", "forced_logout", "close"]);

        let err = stores
            .auth_sessions
            .validate_auth_session("auth-1")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));
        // The winning device keeps the shared record.
        let current = stores.device_sessions.load("asha").await.unwrap().unwrap();
        assert_eq!(current.device_id, "b2");
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_stops_when_the_connection_is_cancelled() {
        let config = Arc::new(Config::from_lookup(|_| None).unwrap());
        let stores = Stores::in_memory();
        let app_state = Arc::new(AppState::new(
            config,
            PlanCatalog::standard(),
            stores.clone(),
            Arc::new(StaticQuotes),
        ));
        let mut guard = SessionGuard::new(stores.device_sessions.clone(), GuardTimings::default());
        let mine = DeviceSession::with_device_id("asha", "a1", DeviceType::Web, Utc::now());
        guard.claim(mine).await.unwrap();
        let connection = ConnectionState::new("asha".to_string(), "auth-1".to_string(), guard);
        let token = connection.cancellation_token.clone();
        let (tx, rx) = mpsc::unbounded::<Message>();

        let worker = tokio::spawn(heartbeat_process(
            app_state,
            Arc::new(Mutex::new(connection)),
            Arc::new(Mutex::new(tx)),
            token.clone(),
        ));
        // Two ticks fall inside this window.
        tokio::time::sleep(GuardTimings::default().heartbeat_interval * 5 / 2).await;
        token.cancel();
        worker.await.unwrap().unwrap();

        let sent: Vec<String> = rx.map(|msg| message_type(&msg)).collect().await;
        assert_eq!(sent, vec!["heartbeat_ack", "heartbeat_ack"]);
    }
}
