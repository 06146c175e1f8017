//! crates/study_tracker_core/src/progress.rs
//!
//! Two-tier progress storage: an authoritative remote `ProgressStore` plus a local
//! cache that never fails.
//!
//! Reconciliation rules:
//! - Every save lands in the local cache first and is marked dirty.
//! - The remote write is attempted exactly once. Success marks the entry clean;
//!   failure leaves the local copy authoritative.
//! - A load first pushes a dirty local entry (again, one attempt). Only clean
//!   entries are replaced by what the remote returns.
//! - When nothing is reachable, a load yields a fresh default record that is not
//!   cached, so it can never overwrite real data later. It is reported as a
//!   `ProgressSource::Placeholder`, and toggles refuse to build on it.
//! - Every operation for one user runs under that user's lock, so concurrent
//!   toggles apply one after the other.
//!
//! The cached streak is recomputed on every load and every save.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::domain::UserProgress;
use crate::plan::PlanCatalog;
use crate::ports::{PortError, PortResult, ProgressStore};
use crate::streak::refresh_streak;

/// The result of a write: the record now in effect and whether the remote has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub progress: UserProgress,
    pub synced: bool,
}

/// Where a loaded record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Read from or acknowledged by the remote store.
    Remote,
    /// The local copy, held while the remote is unreachable.
    Local,
    /// A fresh default standing in for a record nobody could read. Never a base
    /// for writes.
    Placeholder,
}

#[derive(Debug, Clone)]
struct CachedProgress {
    progress: UserProgress,
    dirty: bool,
}

pub struct ProgressTracker {
    catalog: &'static PlanCatalog,
    remote: Arc<dyn ProgressStore>,
    local: Mutex<HashMap<String, CachedProgress>>,
    // One lock per user, held across every read-modify-write.
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProgressTracker {
    pub fn new(catalog: &'static PlanCatalog, remote: Arc<dyn ProgressStore>) -> Self {
        Self {
            catalog,
            remote,
            local: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &'static PlanCatalog {
        self.catalog
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, CachedProgress>> {
        // The map holds plain data, so a poisoned lock is still consistent.
        self.local.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(user_id.to_string()).or_default().clone()
    }

    fn cached(&self, user_id: &str) -> Option<CachedProgress> {
        self.cache().get(user_id).cloned()
    }

    fn remember(&self, user_id: &str, progress: &UserProgress, dirty: bool) {
        self.cache().insert(
            user_id.to_string(),
            CachedProgress {
                progress: progress.clone(),
                dirty,
            },
        );
    }

    /// Whether the local copy holds changes the remote has not acknowledged.
    pub fn has_unsynced_changes(&self, user_id: &str) -> bool {
        self.cached(user_id).map(|c| c.dirty).unwrap_or(false)
    }

    /// Reads a user's progress, creating the initial record on first access.
    pub async fn load(&self, user_id: &str, now: DateTime<Utc>) -> UserProgress {
        self.load_with_source(user_id, now).await.0
    }

    /// Like [`ProgressTracker::load`], also reporting where the record came from.
    pub async fn load_with_source(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> (UserProgress, ProgressSource) {
        let lock = self.user_lock(user_id);
        let _held = lock.lock().await;
        self.load_unlocked(user_id, now).await
    }

    async fn load_unlocked(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> (UserProgress, ProgressSource) {
        if let Some(entry) = self.cached(user_id).filter(|c| c.dirty) {
            let mut progress = entry.progress;
            refresh_streak(self.catalog, &mut progress, now);
            return match self.remote.write(user_id, &progress).await {
                Ok(_) => {
                    debug!("Pushed unsynced progress for {}", user_id);
                    self.remember(user_id, &progress, false);
                    (progress, ProgressSource::Remote)
                }
                Err(e) => {
                    warn!("Progress store still unreachable for {}: {}", user_id, e);
                    self.remember(user_id, &progress, true);
                    (progress, ProgressSource::Local)
                }
            };
        }

        match self.remote.read(user_id).await {
            Ok(Some(mut progress)) => {
                refresh_streak(self.catalog, &mut progress, now);
                self.remember(user_id, &progress, false);
                (progress, ProgressSource::Remote)
            }
            Ok(None) => {
                // The remote confirmed there is nothing to overwrite.
                let progress = UserProgress::fresh(now);
                let source = match self.remote.write(user_id, &progress).await {
                    Ok(_) => ProgressSource::Remote,
                    Err(e) => {
                        warn!("Failed to create initial progress for {}: {}", user_id, e);
                        ProgressSource::Local
                    }
                };
                self.remember(user_id, &progress, source == ProgressSource::Local);
                (progress, source)
            }
            Err(e) => {
                warn!("Failed to read progress for {}, using local copy: {}", user_id, e);
                match self.cached(user_id) {
                    Some(entry) => {
                        let mut progress = entry.progress;
                        refresh_streak(self.catalog, &mut progress, now);
                        (progress, ProgressSource::Local)
                    }
                    None => (UserProgress::fresh(now), ProgressSource::Placeholder),
                }
            }
        }
    }

    /// Stores a new completion set and start date. The streak is recomputed here,
    /// whatever the caller believed it to be.
    pub async fn save(
        &self,
        user_id: &str,
        completed_task_ids: Vec<String>,
        start_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SyncOutcome {
        let lock = self.user_lock(user_id);
        let _held = lock.lock().await;
        self.save_unlocked(user_id, completed_task_ids, start_date, now).await
    }

    /// Stores a new completion set under the start date already on record. Fails
    /// with `Unavailable` when no record can be read.
    pub async fn save_keeping_start(
        &self,
        user_id: &str,
        completed_task_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> PortResult<SyncOutcome> {
        let lock = self.user_lock(user_id);
        let _held = lock.lock().await;
        let current = self.readable_base(user_id, now).await?;
        Ok(self
            .save_unlocked(user_id, completed_task_ids, current.start_date, now)
            .await)
    }

    /// Flips one task's completion. Unknown task ids are rejected, and so is any
    /// toggle while the user's record cannot be read.
    pub async fn toggle(
        &self,
        user_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> PortResult<SyncOutcome> {
        if !self.catalog.contains(task_id) {
            return Err(PortError::Validation(format!("Unknown task {}", task_id)));
        }
        let lock = self.user_lock(user_id);
        let _held = lock.lock().await;
        let mut progress = self.readable_base(user_id, now).await?;
        progress.toggle(task_id);
        let start_date = progress.start_date;
        Ok(self
            .save_unlocked(user_id, progress.completed_task_ids, start_date, now)
            .await)
    }

    /// Clears all completions and restarts the plan today.
    pub async fn reset(&self, user_id: &str, now: DateTime<Utc>) -> SyncOutcome {
        let lock = self.user_lock(user_id);
        let _held = lock.lock().await;
        match self.remote.reset(user_id, now).await {
            Ok(progress) => {
                self.remember(user_id, &progress, false);
                SyncOutcome {
                    progress,
                    synced: true,
                }
            }
            Err(e) => {
                warn!("Failed to reset remote progress for {}: {}", user_id, e);
                let progress = UserProgress::fresh(now);
                self.remember(user_id, &progress, true);
                SyncOutcome {
                    progress,
                    synced: false,
                }
            }
        }
    }

    async fn readable_base(&self, user_id: &str, now: DateTime<Utc>) -> PortResult<UserProgress> {
        match self.load_unlocked(user_id, now).await {
            (_, ProgressSource::Placeholder) => Err(PortError::Unavailable(format!(
                "Progress for {} cannot be read right now; change not applied",
                user_id
            ))),
            (progress, _) => Ok(progress),
        }
    }

    async fn save_unlocked(
        &self,
        user_id: &str,
        completed_task_ids: Vec<String>,
        start_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SyncOutcome {
        let mut seen = HashSet::new();
        let completed_task_ids = completed_task_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut progress = UserProgress {
            completed_task_ids,
            start_date,
            current_streak: 0,
            last_streak_update: now,
        };
        refresh_streak(self.catalog, &mut progress, now);
        self.write_through(user_id, progress).await
    }

    async fn write_through(&self, user_id: &str, progress: UserProgress) -> SyncOutcome {
        self.remember(user_id, &progress, true);
        match self.remote.write(user_id, &progress).await {
            Ok(stored) => {
                self.remember(user_id, &progress, false);
                SyncOutcome {
                    progress: stored,
                    synced: true,
                }
            }
            Err(e) => {
                warn!("Failed to save progress for {}, kept locally: {}", user_id, e);
                SyncOutcome {
                    progress,
                    synced: false,
                }
            }
        }
    }
}
