//! crates/study_tracker_core/src/session_guard.rs
//!
//! Advisory single-device sessions.
//!
//! Each device keeps its own copy of the session it created and periodically
//! compares it with the shared record in a `SessionStore`. If another device has
//! overwritten the record, the next heartbeat notices and the guard moves to
//! `Conflicted`; the caller then shows a notice and forces a logout after
//! [`GuardTimings::logout_delay`].
//!
//! This is a convenience, not a security boundary. Writes are last-writer-wins,
//! takeover is only detected after the fact, and a client that never runs its
//! heartbeat is never evicted.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::{DeviceSession, DeviceType};
use crate::ports::{PortResult, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    NoSession,
    Active,
    Conflicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The shared record was still ours and has been refreshed.
    Renewed(DeviceSession),
    /// Another device owns the shared record now.
    Conflict { current_device_id: String },
    /// The guard is not active; nothing was read or written.
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardTimings {
    pub heartbeat_interval: Duration,
    pub logout_delay: Duration,
}

impl Default for GuardTimings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            logout_delay: Duration::from_secs(3),
        }
    }
}

pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    timings: GuardTimings,
    local: Option<DeviceSession>,
    state: GuardState,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn SessionStore>, timings: GuardTimings) -> Self {
        Self {
            store,
            timings,
            local: None,
            state: GuardState::NoSession,
        }
    }

    /// A guard for a device that remembers a session from an earlier visit.
    /// It stays in `NoSession` until [`SessionGuard::enter`] is called.
    pub fn with_local_session(
        store: Arc<dyn SessionStore>,
        timings: GuardTimings,
        local: DeviceSession,
    ) -> Self {
        Self {
            local: Some(local),
            ..Self::new(store, timings)
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn session(&self) -> Option<&DeviceSession> {
        self.local.as_ref()
    }

    pub fn timings(&self) -> GuardTimings {
        self.timings
    }

    /// Entry transition for `user_id`.
    ///
    /// Without a local session, or with one that belongs to another user, a new
    /// session is generated and written, becoming the shared record. A local session
    /// for the same user is kept as is; the next heartbeat decides whether it still
    /// owns the record.
    pub async fn enter(
        &mut self,
        user_id: &str,
        device_type: DeviceType,
        now: DateTime<Utc>,
    ) -> PortResult<DeviceSession> {
        match &self.local {
            Some(local) if local.user_id == user_id => {
                self.state = GuardState::Active;
                Ok(local.clone())
            }
            _ => self.claim(DeviceSession::new(user_id, device_type, now)).await,
        }
    }

    /// Writes `session` as the shared record and makes it this device's own.
    pub async fn claim(&mut self, session: DeviceSession) -> PortResult<DeviceSession> {
        self.store.save(&session).await?;
        info!(
            "Device {} ({}) is now the active session for {}",
            session.device_id,
            session.device_type.as_str(),
            session.user_id
        );
        self.local = Some(session.clone());
        self.state = GuardState::Active;
        Ok(session)
    }

    /// One heartbeat tick: read the shared record, then either detect a takeover or
    /// rewrite the record with a fresh `last_active`.
    pub async fn heartbeat(&mut self, now: DateTime<Utc>) -> PortResult<HeartbeatOutcome> {
        if self.state != GuardState::Active {
            return Ok(HeartbeatOutcome::Inactive);
        }
        let Some(local) = self.local.clone() else {
            return Ok(HeartbeatOutcome::Inactive);
        };

        if let Some(current) = self.store.load(&local.user_id).await? {
            if current.device_id != local.device_id {
                warn!(
                    "Session for {} taken over by device {} (this device: {})",
                    local.user_id, current.device_id, local.device_id
                );
                self.state = GuardState::Conflicted;
                return Ok(HeartbeatOutcome::Conflict {
                    current_device_id: current.device_id,
                });
            }
        }

        let renewed = DeviceSession {
            last_active: now,
            ..local
        };
        self.store.save(&renewed).await?;
        self.local = Some(renewed.clone());
        Ok(HeartbeatOutcome::Renewed(renewed))
    }

    /// Drops this device's session. The shared record is removed only while it
    /// still belongs to this device, so an evicted device never logs out the winner.
    pub async fn logout(&mut self) -> PortResult<()> {
        self.state = GuardState::NoSession;
        let Some(local) = self.local.take() else {
            return Ok(());
        };
        if let Some(current) = self.store.load(&local.user_id).await? {
            if current.device_id == local.device_id {
                self.store.clear(&local.user_id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use chrono::Duration as ChronoDuration;

    fn store() -> Arc<InMemorySessionStore> {
        Arc::new(InMemorySessionStore::default())
    }

    #[tokio::test]
    async fn entering_without_a_session_claims_the_record() {
        let store = store();
        let mut guard = SessionGuard::new(store.clone(), GuardTimings::default());
        let session = guard.enter("asha", DeviceType::Mobile, Utc::now()).await.unwrap();
        assert_eq!(guard.state(), GuardState::Active);
        assert_eq!(store.load("asha").await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn a_remembered_session_for_another_user_is_replaced() {
        let store = store();
        let now = Utc::now();
        let stale = DeviceSession::with_device_id("ravi", "r1", DeviceType::Web, now);
        let mut guard =
            SessionGuard::with_local_session(store.clone(), GuardTimings::default(), stale);
        let session = guard.enter("asha", DeviceType::Web, now).await.unwrap();
        assert_eq!(session.user_id, "asha");
        assert_ne!(session.device_id, "r1");
    }

    #[tokio::test]
    async fn a_remembered_session_for_the_same_user_is_kept() {
        let store = store();
        let now = Utc::now();
        let mine = DeviceSession::with_device_id("asha", "a1", DeviceType::Web, now);
        store.save(&mine).await.unwrap();
        let mut guard =
            SessionGuard::with_local_session(store.clone(), GuardTimings::default(), mine);
        let session = guard.enter("asha", DeviceType::Web, now).await.unwrap();
        assert_eq!(session.device_id, "a1");
    }

    #[tokio::test]
    async fn heartbeat_refreshes_last_active() {
        let store = store();
        let now = Utc::now();
        let mut guard = SessionGuard::new(store.clone(), GuardTimings::default());
        guard.enter("asha", DeviceType::Web, now).await.unwrap();

        let later = now + ChronoDuration::seconds(15);
        match guard.heartbeat(later).await.unwrap() {
            HeartbeatOutcome::Renewed(session) => assert_eq!(session.last_active, later),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.load("asha").await.unwrap().unwrap().last_active, later);
    }

    #[tokio::test]
    async fn missing_record_is_rewritten_by_the_heartbeat() {
        let store = store();
        let mut guard = SessionGuard::new(store.clone(), GuardTimings::default());
        let session = guard.enter("asha", DeviceType::Web, Utc::now()).await.unwrap();
        store.clear("asha").await.unwrap();

        assert!(matches!(
            guard.heartbeat(Utc::now()).await.unwrap(),
            HeartbeatOutcome::Renewed(_)
        ));
        assert_eq!(
            store.load("asha").await.unwrap().map(|s| s.device_id),
            Some(session.device_id)
        );
    }

    #[tokio::test]
    async fn inactive_guard_does_nothing() {
        let store = store();
        let mut guard = SessionGuard::new(store.clone(), GuardTimings::default());
        assert_eq!(guard.heartbeat(Utc::now()).await.unwrap(), HeartbeatOutcome::Inactive);
        assert!(store.load("asha").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn evicted_device_logout_keeps_the_winner() {
        let store = store();
        let now = Utc::now();
        let mut a = SessionGuard::new(store.clone(), GuardTimings::default());
        a.claim(DeviceSession::with_device_id("asha", "a1", DeviceType::Web, now))
            .await
            .unwrap();
        let mut b = SessionGuard::new(store.clone(), GuardTimings::default());
        b.claim(DeviceSession::with_device_id("asha", "b2", DeviceType::Mobile, now))
            .await
            .unwrap();

        assert!(matches!(
            a.heartbeat(now).await.unwrap(),
            HeartbeatOutcome::Conflict { .. }
        ));
        a.logout().await.unwrap();
        assert_eq!(a.state(), GuardState::NoSession);
        assert_eq!(
            store.load("asha").await.unwrap().map(|s| s.device_id),
            Some("b2".to_string())
        );

        b.logout().await.unwrap();
        assert!(store.load("asha").await.unwrap().is_none());
    }
}
