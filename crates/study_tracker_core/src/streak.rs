//! crates/study_tracker_core/src/streak.rs
//!
//! Derives the current streak of fully completed plan days.

use crate::clock::elapsed_day_index;
use crate::domain::{CompletedSet, UserProgress};
use crate::plan::PlanCatalog;
use chrono::{DateTime, Utc};

/// True when `day` has scheduled tasks and every one of them is completed.
pub fn is_day_complete(catalog: &PlanCatalog, day: u32, completed: &CompletedSet) -> bool {
    let tasks = catalog.tasks_for_day(day);
    !tasks.is_empty() && tasks.iter().all(|task| completed.contains(&task.id))
}

/// Counts consecutive fully completed days ending yesterday, plus one if today is done.
///
/// The walk starts the day before the current one and moves backwards. Days with no
/// scheduled tasks are skipped without touching the count; the first incomplete day
/// stops the walk. Today can only add to the streak, never break it. The current day
/// comes from [`elapsed_day_index`], so past the end of the plan the today bonus
/// never applies.
pub fn calculate_streak(
    catalog: &PlanCatalog,
    completed: &CompletedSet,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u32 {
    let current = elapsed_day_index(start, now);
    streak_ending_at(catalog, completed, current)
}

/// The streak when `current` is the in-progress day.
pub fn streak_ending_at(catalog: &PlanCatalog, completed: &CompletedSet, current: i64) -> u32 {
    let mut streak = 0;

    // Days after the last scheduled day are all empty, so the walk can start there.
    let mut day = (current - 1).min(i64::from(catalog.last_day()));
    while day >= 1 {
        let tasks = catalog.tasks_for_day(day as u32);
        if !tasks.is_empty() {
            if tasks.iter().all(|task| completed.contains(&task.id)) {
                streak += 1;
            } else {
                break;
            }
        }
        day -= 1;
    }

    if let Ok(today) = u32::try_from(current) {
        if is_day_complete(catalog, today, completed) {
            streak += 1;
        }
    }

    streak
}

/// Refreshes the cached streak fields of a progress record as of `now`.
pub fn refresh_streak(catalog: &PlanCatalog, progress: &mut UserProgress, now: DateTime<Utc>) {
    progress.current_streak =
        calculate_streak(catalog, &progress.completed_set(), progress.start_date, now);
    progress.last_streak_update = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DayKind, DayRecord};
    use chrono::Duration;

    fn sparse_catalog() -> PlanCatalog {
        // Day 3 has no tasks at all.
        PlanCatalog::from_records(&[
            DayRecord::new(1, "A", "a1, a2", DayKind::Study),
            DayRecord::new(2, "B", "b1", DayKind::Study),
            DayRecord::new(4, "D", "d1", DayKind::Study),
            DayRecord::new(5, "E", "e1, e2", DayKind::Study),
        ])
    }

    fn completed(ids: &[&str]) -> CompletedSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn empty_days_never_break_the_walk() {
        let catalog = sparse_catalog();
        let done = completed(&["1-1", "1-2", "2-1", "4-1"]);
        assert_eq!(streak_ending_at(&catalog, &done, 5), 3);
    }

    #[test]
    fn first_incomplete_day_stops_the_walk() {
        let catalog = sparse_catalog();
        let done = completed(&["1-1", "1-2", "4-1"]);
        assert_eq!(streak_ending_at(&catalog, &done, 5), 1);
    }

    #[test]
    fn today_only_adds() {
        let catalog = sparse_catalog();
        let without_today = completed(&["1-1", "1-2", "2-1", "4-1", "5-1"]);
        let with_today = completed(&["1-1", "1-2", "2-1", "4-1", "5-1", "5-2"]);
        let base = streak_ending_at(&catalog, &without_today, 5);
        assert_eq!(base, 3);
        assert_eq!(streak_ending_at(&catalog, &with_today, 5), base + 1);
    }

    #[test]
    fn today_bonus_is_independent_of_a_broken_history() {
        let catalog = sparse_catalog();
        let done = completed(&["5-1", "5-2"]);
        assert_eq!(streak_ending_at(&catalog, &done, 5), 1);
    }

    #[test]
    fn past_the_plan_the_streak_is_historical() {
        let catalog = sparse_catalog();
        let all = completed(&["1-1", "1-2", "2-1", "4-1", "5-1", "5-2"]);
        assert_eq!(streak_ending_at(&catalog, &all, 6), 4);
        assert_eq!(streak_ending_at(&catalog, &all, 1_000), 4);
    }

    #[test]
    fn zero_elapsed_time_gives_no_streak() {
        let catalog = PlanCatalog::standard();
        let now = Utc::now();
        let done = completed(&["1-1", "1-2", "1-3", "1-4"]);
        assert_eq!(calculate_streak(catalog, &done, now, now), 0);
    }

    #[test]
    fn calculation_is_idempotent() {
        let catalog = PlanCatalog::standard();
        let now = Utc::now();
        let start = now - Duration::hours(30);
        let done = completed(&["1-1", "1-2", "1-3", "1-4", "2-1"]);
        let first = calculate_streak(catalog, &done, start, now);
        let second = calculate_streak(catalog, &done, start, now);
        assert_eq!(first, second);
        assert_eq!(first, 1);
    }

    #[test]
    fn refresh_rewrites_the_cached_fields() {
        let catalog = PlanCatalog::standard();
        let now = Utc::now();
        let mut progress = UserProgress::fresh(now - Duration::hours(30));
        progress.current_streak = 42;
        progress.completed_task_ids = vec!["1-1".into(), "1-2".into(), "1-3".into(), "1-4".into()];
        refresh_streak(catalog, &mut progress, now);
        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.last_streak_update, now);
    }
}
