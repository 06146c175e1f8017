//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DeviceSession, User, UserProgress};
use crate::users::NewUser;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The backing store could not be reached. Callers degrade instead of failing.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl PortError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Unavailable(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable per-user progress records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Returns `None` when the user has no record yet.
    async fn read(&self, user_id: &str) -> PortResult<Option<UserProgress>>;

    /// Upserts the record. The stored derived fields are whatever the caller computed.
    async fn write(&self, user_id: &str, progress: &UserProgress) -> PortResult<UserProgress>;

    /// Clears completions and moves the start date to `now`.
    async fn reset(&self, user_id: &str, now: DateTime<Utc>) -> PortResult<UserProgress>;
}

/// Registered users, keyed by normalized handle.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `PortError::Conflict` if the handle is taken.
    async fn register(&self, user: NewUser) -> PortResult<User>;

    /// Fails with `PortError::NotFound` for unknown handles.
    async fn find(&self, user_id: &str) -> PortResult<User>;

    async fn exists(&self, user_id: &str) -> PortResult<bool>;
}

/// The shared "current device" record, one per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, user_id: &str) -> PortResult<Option<DeviceSession>>;

    /// Overwrites whatever record the user had. Last writer wins.
    async fn save(&self, session: &DeviceSession) -> PortResult<()>;

    async fn clear(&self, user_id: &str) -> PortResult<()>;
}

/// Browser login sessions backing the auth cookie.
#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the user id the session belongs to, or `Unauthorized` if it is unknown
    /// or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    /// A short motivational passage for the given plan day and its topics.
    async fn motivational_quote(&self, day: u32, task_titles: &[String]) -> PortResult<String>;

    /// Bullet-point revision notes for a single topic.
    async fn explain_topic(&self, topic: &str) -> PortResult<String>;
}
