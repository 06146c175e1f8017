//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! store ports from the `core` crate. It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use study_tracker_core::domain::{DeviceSession, DeviceType, User, UserProgress};
use study_tracker_core::ports::{
    AuthSessionStore, PortError, PortResult, ProgressStore, SessionStore, UserDirectory,
};
use study_tracker_core::users::NewUser;

use crate::adapters::pool::SharedPool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every store port.
#[derive(Clone)]
pub struct DbAdapter {
    shared: Arc<SharedPool>,
}

impl DbAdapter {
    /// Creates a new `DbAdapter` on top of the shared pool.
    pub fn new(shared: Arc<SharedPool>) -> Self {
        Self { shared }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), crate::error::ApiError> {
        let pool = self.shared.acquire().await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(())
    }

    async fn pool(&self) -> PortResult<PgPool> {
        self.shared.acquire().await.map_err(map_db_error)
    }
}

/// Translates a `sqlx` error into the port taxonomy. Connectivity problems become
/// `Unavailable` so callers can degrade to their local copies.
fn map_db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Record not found".to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PortError::Unavailable(e.to_string()),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: String,
    name: String,
    email: String,
    avatar: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    completed_task_ids: Vec<String>,
    start_date: DateTime<Utc>,
    current_streak: i32,
    last_streak_update: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self) -> UserProgress {
        UserProgress {
            completed_task_ids: self.completed_task_ids,
            start_date: self.start_date,
            current_streak: u32::try_from(self.current_streak).unwrap_or(0),
            last_streak_update: self.last_streak_update,
        }
    }
}

#[derive(FromRow)]
struct DeviceSessionRecord {
    user_id: String,
    device_id: String,
    device_type: String,
    last_active: DateTime<Utc>,
    token: String,
}
impl DeviceSessionRecord {
    fn to_domain(self) -> PortResult<DeviceSession> {
        let device_type = DeviceType::parse(&self.device_type).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown device type '{}'", self.device_type))
        })?;
        Ok(DeviceSession {
            user_id: self.user_id,
            device_id: self.device_id,
            device_type,
            last_active: self.last_active,
            token: self.token,
        })
    }
}

//=========================================================================================
// `ProgressStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProgressStore for DbAdapter {
    async fn read(&self, user_id: &str) -> PortResult<Option<UserProgress>> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT completed_task_ids, start_date, current_streak, last_streak_update \
             FROM progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(map_db_error)?;
        Ok(record.map(ProgressRecord::to_domain))
    }

    async fn write(&self, user_id: &str, progress: &UserProgress) -> PortResult<UserProgress> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO progress (user_id, completed_task_ids, start_date, current_streak, last_streak_update) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 completed_task_ids = EXCLUDED.completed_task_ids, \
                 start_date = EXCLUDED.start_date, \
                 current_streak = EXCLUDED.current_streak, \
                 last_streak_update = EXCLUDED.last_streak_update, \
                 updated_at = NOW() \
             RETURNING completed_task_ids, start_date, current_streak, last_streak_update",
        )
        .bind(user_id)
        .bind(&progress.completed_task_ids)
        .bind(progress.start_date)
        .bind(i32::try_from(progress.current_streak).unwrap_or(i32::MAX))
        .bind(progress.last_streak_update)
        .fetch_one(&pool)
        .await
        .map_err(map_db_error)?;
        Ok(record.to_domain())
    }

    async fn reset(&self, user_id: &str, now: DateTime<Utc>) -> PortResult<UserProgress> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO progress (user_id, completed_task_ids, start_date, current_streak, last_streak_update) \
             VALUES ($1, '{}', $2, 0, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 completed_task_ids = '{}', \
                 start_date = EXCLUDED.start_date, \
                 current_streak = 0, \
                 last_streak_update = EXCLUDED.last_streak_update, \
                 updated_at = NOW() \
             RETURNING completed_task_ids, start_date, current_streak, last_streak_update",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&pool)
        .await
        .map_err(map_db_error)?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `UserDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectory for DbAdapter {
    async fn register(&self, user: NewUser) -> PortResult<User> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, name, email, avatar) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, name, email, avatar",
        )
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar)
        .fetch_one(&pool)
        .await
        .map_err(|e| match map_db_error(e) {
            PortError::Conflict(_) => {
                PortError::Conflict(format!("User {} already exists", user.user_id))
            }
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn find(&self, user_id: &str) -> PortResult<User> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, name, email, avatar FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(map_db_error)?;
        record
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn exists(&self, user_id: &str) -> PortResult<bool> {
        let pool = self.pool().await?;
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .map_err(map_db_error)
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn load(&self, user_id: &str) -> PortResult<Option<DeviceSession>> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, DeviceSessionRecord>(
            "SELECT user_id, device_id, device_type, last_active, token \
             FROM device_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(map_db_error)?;
        record.map(DeviceSessionRecord::to_domain).transpose()
    }

    async fn save(&self, session: &DeviceSession) -> PortResult<()> {
        let pool = self.pool().await?;
        sqlx::query(
            "INSERT INTO device_sessions (user_id, device_id, device_type, last_active, token) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 device_id = EXCLUDED.device_id, \
                 device_type = EXCLUDED.device_type, \
                 last_active = EXCLUDED.last_active, \
                 token = EXCLUDED.token",
        )
        .bind(&session.user_id)
        .bind(&session.device_id)
        .bind(session.device_type.as_str())
        .bind(session.last_active)
        .bind(&session.token)
        .execute(&pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> PortResult<()> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM device_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

//=========================================================================================
// `AuthSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let pool = self.pool().await?;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let pool = self.pool().await?;
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&pool)
        .await
        .map_err(map_db_error)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_are_transient() {
        assert!(map_db_error(sqlx::Error::PoolTimedOut).is_transient());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(map_db_error(sqlx::Error::Io(io)).is_transient());
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            PortError::NotFound(_)
        ));
    }

    #[test]
    fn device_records_with_unknown_types_are_rejected() {
        let record = DeviceSessionRecord {
            user_id: "asha".to_string(),
            device_id: "a1".to_string(),
            device_type: "tablet".to_string(),
            last_active: Utc::now(),
            token: "t".to_string(),
        };
        assert!(record.to_domain().is_err());
    }

    #[test]
    fn negative_streaks_read_as_zero() {
        let record = ProgressRecord {
            completed_task_ids: vec!["1-1".to_string()],
            start_date: Utc::now(),
            current_streak: -4,
            last_streak_update: Utc::now(),
        };
        assert_eq!(record.to_domain().current_streak, 0);
    }
}
