//! crates/study_tracker_core/src/memory.rs
//!
//! In-process implementations of the store ports. The API server runs on them when
//! no database is configured, and the test suites use them throughout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::{AuthSession, DeviceSession, User, UserProgress};
use crate::ports::{
    AuthSessionStore, PortError, PortResult, ProgressStore, SessionStore, UserDirectory,
};
use crate::users::NewUser;

fn lock<T>(mutex: &Mutex<T>) -> PortResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
}

//=========================================================================================
// Progress
//=========================================================================================

/// Progress records in a map. Can be switched offline to simulate an unreachable store.
#[derive(Debug)]
pub struct InMemoryProgressStore {
    records: Mutex<HashMap<String, UserProgress>>,
    online: AtomicBool,
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }
}

impl InMemoryProgressStore {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> PortResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PortError::Unavailable("progress store offline".to_string()))
        }
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn read(&self, user_id: &str) -> PortResult<Option<UserProgress>> {
        self.ensure_online()?;
        Ok(lock(&self.records)?.get(user_id).cloned())
    }

    async fn write(&self, user_id: &str, progress: &UserProgress) -> PortResult<UserProgress> {
        self.ensure_online()?;
        lock(&self.records)?.insert(user_id.to_string(), progress.clone());
        Ok(progress.clone())
    }

    async fn reset(&self, user_id: &str, now: DateTime<Utc>) -> PortResult<UserProgress> {
        self.ensure_online()?;
        let fresh = UserProgress::fresh(now);
        lock(&self.records)?.insert(user_id.to_string(), fresh.clone());
        Ok(fresh)
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn register(&self, user: NewUser) -> PortResult<User> {
        let mut users = lock(&self.users)?;
        if users.contains_key(&user.user_id) {
            return Err(PortError::Conflict(format!(
                "User {} already exists",
                user.user_id
            )));
        }
        let created = User {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        };
        users.insert(created.user_id.clone(), created.clone());
        Ok(created)
    }

    async fn find(&self, user_id: &str) -> PortResult<User> {
        lock(&self.users)?
            .get(user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn exists(&self, user_id: &str) -> PortResult<bool> {
        Ok(lock(&self.users)?.contains_key(user_id))
    }
}

//=========================================================================================
// Device sessions
//=========================================================================================

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, DeviceSession>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user_id: &str) -> PortResult<Option<DeviceSession>> {
        Ok(lock(&self.sessions)?.get(user_id).cloned())
    }

    async fn save(&self, session: &DeviceSession) -> PortResult<()> {
        lock(&self.sessions)?.insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> PortResult<()> {
        lock(&self.sessions)?.remove(user_id);
        Ok(())
    }
}

//=========================================================================================
// Auth sessions
//=========================================================================================

#[derive(Debug, Default)]
pub struct InMemoryAuthSessionStore {
    sessions: Mutex<HashMap<String, AuthSession>>,
}

#[async_trait]
impl AuthSessionStore for InMemoryAuthSessionStore {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let session = AuthSession {
            id: session_id.to_string(),
            user_id: user_id.to_string(),
            expires_at,
        };
        lock(&self.sessions)?.insert(session.id.clone(), session);
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        match lock(&self.sessions)?.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id.clone()),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        lock(&self.sessions)?.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn offline_progress_store_reports_unavailable() {
        let store = InMemoryProgressStore::default();
        store.set_online(false);
        let err = store.read("asha").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn expired_auth_sessions_are_rejected() {
        let store = InMemoryAuthSessionStore::default();
        store
            .create_auth_session("old", "asha", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        store
            .create_auth_session("new", "asha", Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert!(matches!(
            store.validate_auth_session("old").await,
            Err(PortError::Unauthorized)
        ));
        assert_eq!(store.validate_auth_session("new").await.unwrap(), "asha");
    }
}
