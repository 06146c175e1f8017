pub mod clock;
pub mod domain;
pub mod memory;
pub mod plan;
pub mod ports;
pub mod progress;
pub mod quotes;
pub mod session_guard;
pub mod spillover;
pub mod streak;
pub mod summary;
pub mod users;

pub use domain::{
    AuthSession, CompletedSet, DeviceSession, DeviceType, Task, TaskView, User, UserProgress,
};
pub use plan::{DayKind, DayRecord, Phase, PlanCatalog, PLAN_DAYS};
pub use ports::{
    AuthSessionStore, PortError, PortResult, ProgressStore, QuoteService, SessionStore,
    UserDirectory,
};
pub use progress::{ProgressSource, ProgressTracker, SyncOutcome};
pub use session_guard::{GuardState, GuardTimings, HeartbeatOutcome, SessionGuard};
pub use spillover::DayView;
pub use summary::ProgressSummary;
