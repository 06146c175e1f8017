//! crates/study_tracker_core/src/spillover.rs
//!
//! Backlog and lookahead for a viewed day, and the assembled per-day view.

use crate::clock::calendar_date_in;
use crate::domain::{CompletedSet, TaskView};
use crate::plan::{DayKind, Phase, PlanCatalog, PLAN_DAYS};
use crate::streak::is_day_complete;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Incomplete tasks from days strictly before `viewed_day`, in catalog order.
///
/// Empty while the user is reviewing a day before the active one.
pub fn spillover(
    catalog: &PlanCatalog,
    viewed_day: u32,
    active_day: u32,
    completed: &CompletedSet,
) -> Vec<TaskView> {
    if viewed_day < active_day {
        return Vec::new();
    }

    catalog
        .tasks()
        .iter()
        .take_while(|task| task.day < viewed_day)
        .filter(|task| !completed.contains(&task.id))
        .map(|task| TaskView::new(task, false))
        .collect()
}

/// The first task of the following day, offered once `viewed_day` is fully done.
///
/// Returns `None` when the viewed day has no tasks, is not complete, or is the last
/// plan day. The preview carries its own completion state, since the user may have
/// worked ahead.
pub fn next_day_preview(
    catalog: &PlanCatalog,
    viewed_day: u32,
    completed: &CompletedSet,
) -> Option<TaskView> {
    if viewed_day >= PLAN_DAYS || !is_day_complete(catalog, viewed_day, completed) {
        return None;
    }

    catalog
        .tasks_for_day(viewed_day + 1)
        .first()
        .map(|task| TaskView::new(task, completed.contains(&task.id)))
}

/// Everything the dashboard shows for one viewed day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub day: u32,
    pub active_day: u32,
    pub is_today: bool,
    pub phase: Phase,
    pub subject: Option<String>,
    pub kind: Option<DayKind>,
    pub calendar_date: Option<NaiveDate>,
    pub tasks: Vec<TaskView>,
    pub is_day_completed: bool,
    pub spillover: Vec<TaskView>,
    pub next_task: Option<TaskView>,
}

impl DayView {
    pub fn build(
        catalog: &PlanCatalog,
        viewed_day: u32,
        active_day: u32,
        completed: &CompletedSet,
        start: DateTime<Utc>,
    ) -> Self {
        Self::build_in(catalog, viewed_day, active_day, completed, start, &Local)
    }

    /// Like [`DayView::build`], with calendar dates in the viewer's time zone.
    pub fn build_in<Tz: TimeZone>(
        catalog: &PlanCatalog,
        viewed_day: u32,
        active_day: u32,
        completed: &CompletedSet,
        start: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        let tasks: Vec<TaskView> = catalog
            .tasks_for_day(viewed_day)
            .iter()
            .map(|task| TaskView::new(task, completed.contains(&task.id)))
            .collect();
        let record = catalog.day_record(viewed_day);

        Self {
            day: viewed_day,
            active_day,
            is_today: viewed_day == active_day,
            phase: Phase::for_day(viewed_day),
            subject: record.map(|r| r.subject.to_string()),
            kind: record.map(|r| r.kind),
            calendar_date: calendar_date_in(start, viewed_day, tz),
            is_day_completed: is_day_complete(catalog, viewed_day, completed),
            tasks,
            spillover: spillover(catalog, viewed_day, active_day, completed),
            next_task: next_day_preview(catalog, viewed_day, completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DayRecord;

    fn two_day_catalog() -> PlanCatalog {
        PlanCatalog::from_records(&[
            DayRecord::new(1, "A", "first, second", DayKind::Study),
            DayRecord::new(2, "B", "third", DayKind::Test),
        ])
    }

    fn ids(views: &[TaskView]) -> Vec<&str> {
        views.iter().map(|v| v.task.id.as_str()).collect()
    }

    #[test]
    fn spillover_lists_unfinished_earlier_tasks() {
        let catalog = two_day_catalog();
        let done: CompletedSet = ["1-1"].into_iter().collect();
        let backlog = spillover(&catalog, 2, 2, &done);
        assert_eq!(ids(&backlog), vec!["1-2"]);
        assert!(backlog.iter().all(|v| !v.completed));
    }

    #[test]
    fn spillover_is_empty_when_reviewing_history() {
        let catalog = PlanCatalog::standard();
        let nothing = CompletedSet::default();
        for viewed in 1..30 {
            assert!(spillover(catalog, viewed, 30, &nothing).is_empty());
        }
    }

    #[test]
    fn spillover_applies_to_future_days_too() {
        let catalog = two_day_catalog();
        let nothing = CompletedSet::default();
        assert_eq!(ids(&spillover(&catalog, 2, 1, &nothing)), vec!["1-1", "1-2"]);
    }

    #[test]
    fn preview_requires_a_complete_day() {
        let catalog = two_day_catalog();
        let partial: CompletedSet = ["1-1"].into_iter().collect();
        assert!(next_day_preview(&catalog, 1, &partial).is_none());

        let full: CompletedSet = ["1-1", "1-2"].into_iter().collect();
        let preview = next_day_preview(&catalog, 1, &full).expect("preview");
        assert_eq!(preview.task.id, "2-1");
        assert!(!preview.completed);
    }

    #[test]
    fn preview_reports_work_done_ahead() {
        let catalog = two_day_catalog();
        let ahead: CompletedSet = ["1-1", "1-2", "2-1"].into_iter().collect();
        assert!(next_day_preview(&catalog, 1, &ahead).expect("preview").completed);
    }

    #[test]
    fn preview_shows_only_the_first_task() {
        let catalog = PlanCatalog::standard();
        let day_one: CompletedSet = catalog.tasks_for_day(1).iter().map(|t| t.id.clone()).collect();
        let preview = next_day_preview(catalog, 1, &day_one).expect("preview");
        assert_eq!(preview.task.id, "2-1");
    }

    #[test]
    fn no_preview_after_the_last_day() {
        let catalog = PlanCatalog::standard();
        let all: CompletedSet = catalog.tasks().iter().map(|t| t.id.clone()).collect();
        assert!(next_day_preview(catalog, PLAN_DAYS, &all).is_none());
    }

    #[test]
    fn day_view_assembles_the_pieces() {
        let catalog = two_day_catalog();
        let done: CompletedSet = ["1-1"].into_iter().collect();
        let view = DayView::build(&catalog, 2, 2, &done, Utc::now());
        assert!(view.is_today);
        assert_eq!(view.subject.as_deref(), Some("B"));
        assert_eq!(view.kind, Some(DayKind::Test));
        assert_eq!(ids(&view.tasks), vec!["2-1"]);
        assert!(!view.is_day_completed);
        assert_eq!(ids(&view.spillover), vec!["1-2"]);
        assert!(view.next_task.is_none());
    }

    #[test]
    fn calendar_dates_use_the_given_zone() {
        let catalog = two_day_catalog();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        let ist = chrono::FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let nothing = CompletedSet::default();

        let view = DayView::build_in(&catalog, 1, 1, &nothing, start, &ist);
        assert_eq!(view.calendar_date, NaiveDate::from_ymd_opt(2025, 3, 2));
        let view = DayView::build_in(&catalog, 2, 1, &nothing, start, &Utc);
        assert_eq!(view.calendar_date, NaiveDate::from_ymd_opt(2025, 3, 2));
    }
}
