//! services/api/src/adapters/stores.rs
//!
//! Selects the backing for every store port: PostgreSQL when a database is
//! configured, process memory otherwise.

use std::sync::Arc;
use study_tracker_core::memory::{
    InMemoryAuthSessionStore, InMemoryProgressStore, InMemorySessionStore, InMemoryUserDirectory,
};
use study_tracker_core::{AuthSessionStore, ProgressStore, SessionStore, UserDirectory};

use crate::adapters::DbAdapter;

/// One implementation per store port, shared by every handler.
#[derive(Clone)]
pub struct Stores {
    pub progress: Arc<dyn ProgressStore>,
    pub users: Arc<dyn UserDirectory>,
    pub auth_sessions: Arc<dyn AuthSessionStore>,
    pub device_sessions: Arc<dyn SessionStore>,
}

impl Stores {
    /// All ports backed by the database adapter.
    pub fn postgres(db: Arc<DbAdapter>) -> Self {
        Self {
            progress: db.clone(),
            users: db.clone(),
            auth_sessions: db.clone(),
            device_sessions: db,
        }
    }

    /// All ports held in process memory. Nothing survives a restart, and the
    /// device session lock only covers connections to this process.
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryProgressStore::default()),
            users: Arc::new(InMemoryUserDirectory::default()),
            auth_sessions: Arc::new(InMemoryAuthSessionStore::default()),
            device_sessions: Arc::new(InMemorySessionStore::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use study_tracker_core::users::register;

    #[tokio::test]
    async fn in_memory_stores_keep_users_and_login_sessions() {
        let stores = Stores::in_memory();
        let user = register(stores.users.as_ref(), "Asha", None, None, None)
            .await
            .unwrap();
        assert!(stores.users.exists(&user.user_id).await.unwrap());

        stores
            .auth_sessions
            .create_auth_session("auth-1", &user.user_id, Utc::now() + Duration::days(30))
            .await
            .unwrap();
        let owner = stores
            .auth_sessions
            .validate_auth_session("auth-1")
            .await
            .unwrap();
        assert_eq!(owner, user.user_id);
        assert!(stores.progress.read(&user.user_id).await.unwrap().is_none());
    }
}
