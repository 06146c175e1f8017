//! crates/study_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// One atomic topic or activity of the study plan.
///
/// Tasks are produced once by the plan catalog and never mutated afterwards.
/// The `id` has the form `"{day}-{index}"` with a 1-based index within the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub day: u32,
    pub category: String,
    pub title: String,
}

/// A task paired with the completion state looked up for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task: Task,
    pub completed: bool,
}

impl TaskView {
    pub fn new(task: &Task, completed: bool) -> Self {
        Self {
            task: task.clone(),
            completed,
        }
    }
}

/// The set of completed task ids. Duplicates in the stored sequence collapse here;
/// membership is the only operation the algorithms need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedSet(HashSet<String>);

impl CompletedSet {
    pub fn contains(&self, task_id: &str) -> bool {
        self.0.contains(task_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CompletedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Per-user completion state. `current_streak` is a cache that is recomputed on
/// every load and every save; it is never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    pub completed_task_ids: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub current_streak: u32,
    pub last_streak_update: DateTime<Utc>,
}

impl UserProgress {
    /// The record a user gets on first access: nothing completed, Day 1 is `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            completed_task_ids: Vec::new(),
            start_date: now,
            current_streak: 0,
            last_streak_update: now,
        }
    }

    pub fn completed_set(&self) -> CompletedSet {
        self.completed_task_ids.iter().cloned().collect()
    }

    pub fn is_completed(&self, task_id: &str) -> bool {
        self.completed_task_ids.iter().any(|id| id == task_id)
    }

    /// Flips the completion of `task_id`. Returns the new completion state.
    pub fn toggle(&mut self, task_id: &str) -> bool {
        if self.is_completed(task_id) {
            self.completed_task_ids.retain(|id| id != task_id);
            false
        } else {
            self.completed_task_ids.push(task_id.to_string());
            true
        }
    }
}

// Represents a registered user, keyed by a normalized handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Coarse device classification, inferred from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Web,
    Mobile,
}

impl DeviceType {
    /// Viewports narrower than this are treated as mobile.
    pub const MOBILE_BREAKPOINT: u32 = 768;

    pub fn from_viewport_width(width: u32) -> Self {
        if width < Self::MOBILE_BREAKPOINT {
            DeviceType::Mobile
        } else {
            DeviceType::Web
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Web => "web",
            DeviceType::Mobile => "mobile",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "web" => Some(DeviceType::Web),
            "mobile" => Some(DeviceType::Mobile),
            _ => None,
        }
    }
}

/// The single "current device" record for a user, rewritten on every heartbeat.
///
/// `token` is opaque and non-cryptographic; it is carried, never trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub user_id: String,
    pub device_id: String,
    pub device_type: DeviceType,
    pub last_active: DateTime<Utc>,
    pub token: String,
}

impl DeviceSession {
    /// Starts a session for a freshly instantiated device with random identifiers.
    pub fn new(user_id: &str, device_type: DeviceType, now: DateTime<Utc>) -> Self {
        let device_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self::with_device_id(user_id, &device_id, device_type, now)
    }

    pub fn with_device_id(
        user_id: &str,
        device_id: &str,
        device_type: DeviceType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            device_type,
            last_active: now,
            token: Uuid::new_v4().simple().to_string(),
        }
    }
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}
