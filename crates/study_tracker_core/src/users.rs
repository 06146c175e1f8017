//! crates/study_tracker_core/src/users.rs
//!
//! User handles and the registration/login flow on top of a `UserDirectory`.
//!
//! Handles are user-chosen identifiers. They are trimmed and lower-cased before any
//! comparison or storage, so "  Asha " and "asha" name the same account.

use crate::domain::User;
use crate::ports::{PortError, PortResult, UserDirectory};

pub const MIN_HANDLE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("User ID must be at least 3 characters")]
    TooShort,
}

impl From<HandleError> for PortError {
    fn from(e: HandleError) -> Self {
        PortError::Validation(e.to_string())
    }
}

pub fn normalize_handle(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A normalized handle that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle(String);

impl UserHandle {
    pub fn parse(raw: &str) -> Result<Self, HandleError> {
        let handle = normalize_handle(raw);
        if handle.chars().count() < MIN_HANDLE_LEN {
            return Err(HandleError::TooShort);
        }
        Ok(Self(handle))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A registration request with every optional profile field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl NewUser {
    /// Fills blank profile fields: the name is the capitalised handle, the email and
    /// avatar are derived from the handle.
    pub fn with_defaults(
        handle: &UserHandle,
        name: Option<&str>,
        email: Option<&str>,
        avatar: Option<&str>,
    ) -> Self {
        let handle = handle.as_str();
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            user_id: handle.to_string(),
            name: non_blank(name).unwrap_or_else(|| capitalize(handle)),
            email: non_blank(email).unwrap_or_else(|| format!("{}@upsc.tracker", handle)),
            avatar: non_blank(avatar).unwrap_or_else(|| {
                format!("https://api.dicebear.com/7.x/identicon/svg?seed={}", handle)
            }),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
    Invalid(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    pub fn message(&self) -> String {
        match self {
            Availability::Available => "User ID is available".to_string(),
            Availability::Taken => "User ID already taken".to_string(),
            Availability::Invalid(reason) => reason.clone(),
        }
    }
}

pub async fn check_availability(users: &dyn UserDirectory, raw: &str) -> PortResult<Availability> {
    let handle = match UserHandle::parse(raw) {
        Ok(handle) => handle,
        Err(e) => return Ok(Availability::Invalid(e.to_string())),
    };
    if users.exists(handle.as_str()).await? {
        Ok(Availability::Taken)
    } else {
        Ok(Availability::Available)
    }
}

/// Registers a new handle. Fails with `Validation` for short handles and `Conflict`
/// when the handle is taken.
pub async fn register(
    users: &dyn UserDirectory,
    raw: &str,
    name: Option<&str>,
    email: Option<&str>,
    avatar: Option<&str>,
) -> PortResult<User> {
    let handle = UserHandle::parse(raw)?;
    if users.exists(handle.as_str()).await? {
        return Err(PortError::Conflict(
            "User ID already exists. Please choose a different ID or login.".to_string(),
        ));
    }
    users
        .register(NewUser::with_defaults(&handle, name, email, avatar))
        .await
}

/// Looks up an existing handle. Unknown handles fail with `NotFound`.
pub async fn login(users: &dyn UserDirectory, raw: &str) -> PortResult<User> {
    let handle = normalize_handle(raw);
    if handle.is_empty() {
        return Err(PortError::Validation("userId is required".to_string()));
    }
    users.find(&handle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUserDirectory;

    #[test]
    fn handles_are_trimmed_and_lowercased() {
        assert_eq!(UserHandle::parse("  Asha ").unwrap().as_str(), "asha");
        assert_eq!(UserHandle::parse(" ab "), Err(HandleError::TooShort));
    }

    #[test]
    fn defaults_fill_blank_profile_fields() {
        let handle = UserHandle::parse("ravi").unwrap();
        let user = NewUser::with_defaults(&handle, Some("  "), None, None);
        assert_eq!(user.name, "Ravi");
        assert_eq!(user.email, "ravi@upsc.tracker");
        assert_eq!(
            user.avatar,
            "https://api.dicebear.com/7.x/identicon/svg?seed=ravi"
        );

        let named = NewUser::with_defaults(&handle, Some(" Ravi K "), Some("r@k.in"), None);
        assert_eq!(named.name, "Ravi K");
        assert_eq!(named.email, "r@k.in");
    }

    #[tokio::test]
    async fn register_then_login_with_different_casing() {
        let users = InMemoryUserDirectory::default();
        let created = register(&users, "Meera", None, None, None).await.unwrap();
        assert_eq!(created.user_id, "meera");

        let found = login(&users, "  MEERA").await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let users = InMemoryUserDirectory::default();
        register(&users, "meera", None, None, None).await.unwrap();
        let err = register(&users, " Meera ", None, None, None).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_handles_are_rejected() {
        let users = InMemoryUserDirectory::default();
        let err = register(&users, "ab", None, None, None).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(
            check_availability(&users, "ab").await.unwrap(),
            Availability::Invalid("User ID must be at least 3 characters".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_login_is_not_found() {
        let users = InMemoryUserDirectory::default();
        let err = login(&users, "ghost").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(check_availability(&users, "ghost").await.unwrap().is_available());
    }
}
