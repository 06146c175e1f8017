//! crates/study_tracker_core/src/summary.rs
//!
//! Headline numbers for a user's progress through the plan.

use crate::clock::{active_day_in, calendar_date_in};
use crate::domain::{CompletedSet, UserProgress};
use crate::plan::{Phase, PlanCatalog, PLAN_DAYS};
use crate::streak::calculate_streak;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub active_day: u32,
    pub phase: Phase,
    pub current_streak: u32,
    pub completed_count: usize,
    pub total_tasks: usize,
    pub overall_percent: u32,
    pub start_date: DateTime<Utc>,
    pub target_end_date: Option<NaiveDate>,
}

impl ProgressSummary {
    pub fn compute(catalog: &PlanCatalog, progress: &UserProgress, now: DateTime<Utc>) -> Self {
        Self::compute_in(catalog, progress, now, &Local)
    }

    /// Computes the summary with day boundaries in the given time zone.
    pub fn compute_in<Tz: TimeZone>(
        catalog: &PlanCatalog,
        progress: &UserProgress,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        let completed = progress.completed_set();
        let active_day = active_day_in(progress.start_date, now, tz);

        Self {
            active_day,
            phase: Phase::for_day(active_day),
            current_streak: calculate_streak(catalog, &completed, progress.start_date, now),
            completed_count: completed_in_catalog(catalog, &completed),
            total_tasks: catalog.len(),
            overall_percent: overall_percent(catalog, &completed),
            start_date: progress.start_date,
            target_end_date: calendar_date_in(progress.start_date, PLAN_DAYS, tz),
        }
    }
}

/// Completed ids that name a real task; stale or unknown ids are ignored.
pub fn completed_in_catalog(catalog: &PlanCatalog, completed: &CompletedSet) -> usize {
    completed.iter().filter(|id| catalog.contains(id)).count()
}

/// Share of the catalog completed, rounded to the nearest whole percent.
pub fn overall_percent(catalog: &PlanCatalog, completed: &CompletedSet) -> u32 {
    let total = catalog.len();
    if total == 0 {
        return 0;
    }
    let done = completed_in_catalog(catalog, completed);
    ((done * 100 + total / 2) / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::calendar_date;
    use crate::plan::{DayKind, DayRecord};
    use chrono::{Duration, FixedOffset, NaiveDate};

    #[test]
    fn percent_rounds_and_ignores_unknown_ids() {
        let catalog =
            PlanCatalog::from_records(&[DayRecord::new(1, "A", "a, b, c", DayKind::Study)]);
        let one: CompletedSet = ["1-1", "9-9"].into_iter().collect();
        assert_eq!(overall_percent(&catalog, &one), 33);
        let two: CompletedSet = ["1-1", "1-2"].into_iter().collect();
        assert_eq!(overall_percent(&catalog, &two), 67);
    }

    #[test]
    fn empty_catalog_is_zero_percent() {
        let catalog = PlanCatalog::from_records(&[]);
        assert_eq!(overall_percent(&catalog, &CompletedSet::default()), 0);
    }

    #[test]
    fn summary_of_a_fresh_record() {
        let now = Utc::now();
        let summary =
            ProgressSummary::compute(PlanCatalog::standard(), &UserProgress::fresh(now), now);
        assert_eq!(summary.active_day, 1);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.total_tasks, PlanCatalog::standard().len());
        assert_eq!(summary.phase.number(), 1);
        assert_eq!(
            summary.target_end_date,
            calendar_date(now, 1).map(|d| d + Duration::days(74))
        );
    }

    #[test]
    fn day_boundaries_follow_the_viewer_zone() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        // 01:30 on 2 March in India, still 1 March in UTC.
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 17, 0, 0).unwrap();
        let progress = UserProgress::fresh(start);
        let catalog = PlanCatalog::standard();

        let in_india = ProgressSummary::compute_in(catalog, &progress, now, &ist);
        assert_eq!(in_india.active_day, 1);
        assert_eq!(
            in_india.target_end_date,
            NaiveDate::from_ymd_opt(2025, 5, 15)
        );

        let in_utc = ProgressSummary::compute_in(catalog, &progress, now, &Utc);
        assert_eq!(in_utc.active_day, 2);
        assert_eq!(in_utc.target_end_date, NaiveDate::from_ymd_opt(2025, 5, 14));
    }
}
