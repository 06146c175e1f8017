//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::port_rejection;
use crate::web::{auth, middleware::CurrentUser, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{
    clock::active_day_in,
    quotes::{explanation_or_fallback, quote_or_fallback},
    DayRecord, DayView, Phase, PlanCatalog, ProgressSource, ProgressSummary, SyncOutcome, Task,
    TaskView, UserProgress, PLAN_DAYS,
};
use tracing::{info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::check_handler,
        plan_handler,
        plan_day_handler,
        get_progress_handler,
        save_progress_handler,
        reset_progress_handler,
        toggle_task_handler,
        day_view_handler,
        summary_handler,
        quote_handler,
        explain_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UserResponse,
            auth::AvailabilityResponse,
            TaskResponse,
            PlanDayResponse,
            PlanResponse,
            ProgressResponse,
            SaveProgressRequest,
            DayViewResponse,
            SummaryResponse,
            TextResponse,
        )
    ),
    tags(
        (name = "Study Tracker API", description = "API endpoints for the 75-day study plan tracker.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One task of the plan. `completed` is present only in user-specific responses.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct TaskResponse {
    pub id: String,
    pub day: u32,
    pub category: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskResponse {
    fn plain(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            day: task.day,
            category: task.category.clone(),
            title: task.title.clone(),
            completed: None,
        }
    }
}

impl From<TaskView> for TaskResponse {
    fn from(view: TaskView) -> Self {
        Self {
            completed: Some(view.completed),
            ..Self::plain(&view.task)
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlanDayResponse {
    pub day: u32,
    pub subject: String,
    pub kind: String,
    pub phase: u8,
    pub phase_label: String,
    pub tasks: Vec<TaskResponse>,
}

impl PlanDayResponse {
    fn new(catalog: &PlanCatalog, record: &DayRecord) -> Self {
        let phase = Phase::for_day(record.day);
        Self {
            day: record.day,
            subject: record.subject.to_string(),
            kind: record.kind.as_str().to_string(),
            phase: phase.number(),
            phase_label: phase.label().to_string(),
            tasks: catalog
                .tasks_for_day(record.day)
                .iter()
                .map(TaskResponse::plain)
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub total_days: u32,
    pub total_tasks: usize,
    pub days: Vec<PlanDayResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub completed_task_ids: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub current_streak: u32,
    pub last_streak_update: DateTime<Utc>,
    /// False while the change is held locally because the store was unreachable.
    pub synced: bool,
}

impl ProgressResponse {
    fn new(progress: UserProgress, synced: bool) -> Self {
        Self {
            completed_task_ids: progress.completed_task_ids,
            start_date: progress.start_date,
            current_streak: progress.current_streak,
            last_streak_update: progress.last_streak_update,
            synced,
        }
    }
}

impl From<SyncOutcome> for ProgressResponse {
    fn from(outcome: SyncOutcome) -> Self {
        Self::new(outcome.progress, outcome.synced)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SaveProgressRequest {
    pub completed_task_ids: Vec<String>,
    /// Keeps the stored start date when omitted.
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct DayViewResponse {
    pub day: u32,
    pub active_day: u32,
    pub is_today: bool,
    pub phase: u8,
    pub phase_label: String,
    pub subject: Option<String>,
    pub kind: Option<String>,
    pub calendar_date: Option<NaiveDate>,
    pub tasks: Vec<TaskResponse>,
    pub is_day_completed: bool,
    pub spillover: Vec<TaskResponse>,
    pub next_task: Option<TaskResponse>,
}

impl From<DayView> for DayViewResponse {
    fn from(view: DayView) -> Self {
        Self {
            day: view.day,
            active_day: view.active_day,
            is_today: view.is_today,
            phase: view.phase.number(),
            phase_label: view.phase.label().to_string(),
            subject: view.subject,
            kind: view.kind.map(|k| k.as_str().to_string()),
            calendar_date: view.calendar_date,
            tasks: view.tasks.into_iter().map(TaskResponse::from).collect(),
            is_day_completed: view.is_day_completed,
            spillover: view.spillover.into_iter().map(TaskResponse::from).collect(),
            next_task: view.next_task.map(TaskResponse::from),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub active_day: u32,
    pub phase: u8,
    pub phase_label: String,
    pub current_streak: u32,
    pub completed_count: usize,
    pub total_tasks: usize,
    pub overall_percent: u32,
    pub start_date: DateTime<Utc>,
    pub target_end_date: Option<NaiveDate>,
}

impl From<ProgressSummary> for SummaryResponse {
    fn from(summary: ProgressSummary) -> Self {
        Self {
            active_day: summary.active_day,
            phase: summary.phase.number(),
            phase_label: summary.phase.label().to_string(),
            current_streak: summary.current_streak,
            completed_count: summary.completed_count,
            total_tasks: summary.total_tasks,
            overall_percent: summary.overall_percent,
            start_date: summary.start_date,
            target_end_date: summary.target_end_date,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Deserialize, IntoParams)]
pub struct QuoteQuery {
    /// Plan day to write for; defaults to the caller's active day.
    pub day: Option<u32>,
    /// The caller's offset from UTC in minutes, e.g. 330 for India.
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct ZoneQuery {
    /// The caller's offset from UTC in minutes, e.g. 330 for India. Defaults to
    /// the server's zone.
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct ExplainQuery {
    pub topic: String,
}

const MAX_OFFSET_MINUTES: u32 = 14 * 60;

/// The zone whose midnights separate the caller's plan days.
fn client_zone(utc_offset_minutes: Option<i32>) -> Result<FixedOffset, (StatusCode, String)> {
    let Some(minutes) = utc_offset_minutes else {
        return Ok(*Local::now().offset());
    };
    let out_of_range = || {
        (
            StatusCode::BAD_REQUEST,
            format!("utc_offset_minutes {} is out of range", minutes),
        )
    };
    if minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
        return Err(out_of_range());
    }
    FixedOffset::east_opt(minutes * 60).ok_or_else(out_of_range)
}

fn check_day(day: u32) -> Result<u32, (StatusCode, String)> {
    if (1..=PLAN_DAYS).contains(&day) {
        Ok(day)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("Day {} is not part of the {}-day plan", day, PLAN_DAYS),
        ))
    }
}

//=========================================================================================
// Plan Handlers (public)
//=========================================================================================

/// The whole plan, day by day, with its tasks.
#[utoipa::path(
    get,
    path = "/plan",
    responses((status = 200, description = "The full study plan", body = PlanResponse))
)]
pub async fn plan_handler(State(app_state): State<Arc<AppState>>) -> Json<PlanResponse> {
    let catalog = app_state.catalog;
    Json(PlanResponse {
        total_days: catalog.last_day(),
        total_tasks: catalog.len(),
        days: catalog
            .day_records()
            .iter()
            .map(|record| PlanDayResponse::new(catalog, record))
            .collect(),
    })
}

/// A single plan day.
#[utoipa::path(
    get,
    path = "/plan/days/{day}",
    params(("day" = u32, Path, description = "Plan day, 1 to 75.")),
    responses(
        (status = 200, description = "The plan day", body = PlanDayResponse),
        (status = 404, description = "Day outside the plan")
    )
)]
pub async fn plan_day_handler(
    State(app_state): State<Arc<AppState>>,
    Path(day): Path<u32>,
) -> Result<Json<PlanDayResponse>, (StatusCode, String)> {
    let day = check_day(day)?;
    let record = app_state
        .catalog
        .day_record(day)
        .ok_or((StatusCode::NOT_FOUND, format!("Day {} has no plan entry", day)))?;
    Ok(Json(PlanDayResponse::new(app_state.catalog, record)))
}

//=========================================================================================
// Progress Handlers (authenticated)
//=========================================================================================

/// The caller's progress record, created on first access.
#[utoipa::path(
    get,
    path = "/progress",
    responses((status = 200, description = "Current progress", body = ProgressResponse))
)]
pub async fn get_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ProgressResponse> {
    let (progress, source) = app_state
        .progress
        .load_with_source(&user.user_id, Utc::now())
        .await;
    Json(ProgressResponse::new(progress, source == ProgressSource::Remote))
}

/// Replaces the completion set. The streak is recomputed by the server.
#[utoipa::path(
    post,
    path = "/progress",
    request_body = SaveProgressRequest,
    responses(
        (status = 200, description = "Stored progress", body = ProgressResponse),
        (status = 400, description = "Unknown task ids"),
        (status = 503, description = "Stored progress unreadable and no start date given")
    )
)]
pub async fn save_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<Json<ProgressResponse>, (StatusCode, String)> {
    let catalog = app_state.catalog;
    if let Some(unknown) = req.completed_task_ids.iter().find(|id| !catalog.contains(id)) {
        return Err((StatusCode::BAD_REQUEST, format!("Unknown task {}", unknown)));
    }

    let now = Utc::now();
    let outcome = match req.start_date {
        Some(start) => {
            app_state
                .progress
                .save(&user.user_id, req.completed_task_ids, start, now)
                .await
        }
        None => app_state
            .progress
            .save_keeping_start(&user.user_id, req.completed_task_ids, now)
            .await
            .map_err(port_rejection)?,
    };
    Ok(Json(outcome.into()))
}

/// Clears all completions and restarts the plan today.
#[utoipa::path(
    delete,
    path = "/progress",
    responses((status = 200, description = "Progress after the reset", body = ProgressResponse))
)]
pub async fn reset_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ProgressResponse> {
    info!("Resetting progress for {}", user.user_id);
    let outcome = app_state.progress.reset(&user.user_id, Utc::now()).await;
    Json(outcome.into())
}

/// Flips the completion of a single task.
#[utoipa::path(
    post,
    path = "/progress/tasks/{task_id}/toggle",
    params(("task_id" = String, Path, description = "Task id such as \"12-3\".")),
    responses(
        (status = 200, description = "Progress after the toggle", body = ProgressResponse),
        (status = 400, description = "Unknown task id"),
        (status = 503, description = "Stored progress unreadable")
    )
)]
pub async fn toggle_task_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<String>,
) -> Result<Json<ProgressResponse>, (StatusCode, String)> {
    let outcome = app_state
        .progress
        .toggle(&user.user_id, &task_id, Utc::now())
        .await
        .map_err(port_rejection)?;
    if !outcome.synced {
        warn!("Toggle of {} for {} is held locally", task_id, user.user_id);
    }
    Ok(Json(outcome.into()))
}

/// Everything the dashboard shows for one day.
#[utoipa::path(
    get,
    path = "/days/{day}",
    params(("day" = u32, Path, description = "Viewed plan day, 1 to 75."), ZoneQuery),
    responses(
        (status = 200, description = "The day view", body = DayViewResponse),
        (status = 400, description = "Invalid UTC offset"),
        (status = 404, description = "Day outside the plan")
    )
)]
pub async fn day_view_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(day): Path<u32>,
    Query(zone): Query<ZoneQuery>,
) -> Result<Json<DayViewResponse>, (StatusCode, String)> {
    let day = check_day(day)?;
    let tz = client_zone(zone.utc_offset_minutes)?;
    let now = Utc::now();
    let progress = app_state.progress.load(&user.user_id, now).await;
    let view = DayView::build_in(
        app_state.catalog,
        day,
        active_day_in(progress.start_date, now, &tz),
        &progress.completed_set(),
        progress.start_date,
        &tz,
    );
    Ok(Json(view.into()))
}

/// Headline numbers: active day, streak, completion percentage.
#[utoipa::path(
    get,
    path = "/summary",
    params(ZoneQuery),
    responses(
        (status = 200, description = "Progress summary", body = SummaryResponse),
        (status = 400, description = "Invalid UTC offset")
    )
)]
pub async fn summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(zone): Query<ZoneQuery>,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let tz = client_zone(zone.utc_offset_minutes)?;
    let now = Utc::now();
    let progress = app_state.progress.load(&user.user_id, now).await;
    let summary = ProgressSummary::compute_in(app_state.catalog, &progress, now, &tz);
    Ok(Json(summary.into()))
}

//=========================================================================================
// Motivation Handlers (authenticated)
//=========================================================================================

/// A motivational passage for a plan day. Never fails; falls back to a fixed quote.
#[utoipa::path(
    get,
    path = "/quote",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Quote text", body = TextResponse),
        (status = 400, description = "Invalid UTC offset"),
        (status = 404, description = "Day outside the plan")
    )
)]
pub async fn quote_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<TextResponse>, (StatusCode, String)> {
    let day = match query.day {
        Some(day) => check_day(day)?,
        None => {
            let tz = client_zone(query.utc_offset_minutes)?;
            let now = Utc::now();
            let progress = app_state.progress.load(&user.user_id, now).await;
            active_day_in(progress.start_date, now, &tz)
        }
    };
    let titles: Vec<String> = app_state
        .catalog
        .tasks_for_day(day)
        .iter()
        .map(|task| task.title.clone())
        .collect();

    let text = quote_or_fallback(app_state.quotes.as_ref(), day, &titles).await;
    Ok(Json(TextResponse { text }))
}

/// Revision notes for one topic. Never fails; falls back to a fixed notice.
#[utoipa::path(
    get,
    path = "/explain",
    params(ExplainQuery),
    responses(
        (status = 200, description = "Explanation text", body = TextResponse),
        (status = 400, description = "Empty topic")
    )
)]
pub async fn explain_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ExplainQuery>,
) -> Result<Json<TextResponse>, (StatusCode, String)> {
    let topic = query.topic.trim();
    if topic.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "topic is required".to_string()));
    }
    let text = explanation_or_fallback(app_state.quotes.as_ref(), topic).await;
    Ok(Json(TextResponse { text }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Stores;
    use crate::config::Config;
    use study_tracker_core::memory::InMemoryProgressStore;
    use study_tracker_core::quotes::StaticQuotes;
    use study_tracker_core::{CompletedSet, ProgressStore};

    fn app_with_progress_store(remote: Arc<InMemoryProgressStore>) -> Arc<AppState> {
        let stores = Stores {
            progress: remote,
            ..Stores::in_memory()
        };
        Arc::new(AppState::new(
            Arc::new(Config::from_lookup(|_| None).unwrap()),
            PlanCatalog::standard(),
            stores,
            Arc::new(StaticQuotes),
        ))
    }

    #[test]
    fn days_outside_the_plan_are_not_found() {
        assert_eq!(check_day(1), Ok(1));
        assert_eq!(check_day(75), Ok(75));
        assert_eq!(check_day(0).unwrap_err().0, StatusCode::NOT_FOUND);
        assert_eq!(check_day(76).unwrap_err().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn plan_tasks_omit_completion() {
        let catalog = PlanCatalog::standard();
        let record = catalog.day_record(1).unwrap();
        let json = serde_json::to_value(PlanDayResponse::new(catalog, record)).unwrap();
        assert_eq!(json["day"], 1);
        assert_eq!(json["phase"], 1);
        assert!(json["tasks"][0].get("completed").is_none());
        assert_eq!(json["tasks"][0]["id"], "1-1");
    }

    #[test]
    fn day_view_tasks_carry_completion() {
        let catalog = PlanCatalog::standard();
        let completed: CompletedSet = ["1-1"].into_iter().collect();
        let view = DayView::build(catalog, 1, 1, &completed, Utc::now());
        let json = serde_json::to_value(DayViewResponse::from(view)).unwrap();
        assert_eq!(json["is_today"], true);
        assert_eq!(json["tasks"][0]["completed"], true);
        assert_eq!(json["tasks"][1]["completed"], false);
    }

    #[test]
    fn client_offsets_are_bounded() {
        let india = FixedOffset::east_opt(19_800).unwrap();
        assert_eq!(client_zone(Some(330)).unwrap(), india);
        let hawaii = FixedOffset::west_opt(36_000).unwrap();
        assert_eq!(client_zone(Some(-600)).unwrap(), hawaii);
        assert_eq!(client_zone(None).unwrap(), *Local::now().offset());

        for out_of_range in [15 * 60, -15 * 60, i32::MIN] {
            let err = client_zone(Some(out_of_range)).unwrap_err();
            assert_eq!(err.0, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn save_without_start_date_is_refused_while_progress_is_unreadable() {
        let remote = Arc::new(InMemoryProgressStore::default());
        let app_state = app_with_progress_store(remote.clone());
        let start = Utc::now() - chrono::Duration::days(10);
        remote
            .write(
                "asha",
                &UserProgress {
                    completed_task_ids: vec!["1-1".to_string()],
                    start_date: start,
                    current_streak: 0,
                    last_streak_update: start,
                },
            )
            .await
            .unwrap();
        let user = CurrentUser {
            user_id: "asha".to_string(),
            auth_session_id: "auth-1".to_string(),
        };

        remote.set_online(false);
        let request = SaveProgressRequest {
            completed_task_ids: vec!["2-1".to_string()],
            start_date: None,
        };
        let err = save_progress_handler(
            State(app_state.clone()),
            Extension(user.clone()),
            Json(request),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);

        remote.set_online(true);
        let Json(progress) = get_progress_handler(State(app_state), Extension(user)).await;
        assert_eq!(progress.completed_task_ids, vec!["1-1"]);
        assert_eq!(progress.start_date, start);
        assert!(progress.synced);
    }

    #[test]
    fn openapi_document_lists_the_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/auth/register"));
        assert!(paths.contains_key("/days/{day}"));
        assert!(paths.contains_key("/progress/tasks/{task_id}/toggle"));
    }
}
