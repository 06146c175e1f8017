//! crates/study_tracker_core/src/clock.rs
//!
//! Maps a user's start date and the current instant to a plan day.
//!
//! Two formulas exist and are kept apart on purpose:
//! - [`active_day`] truncates both instants to local calendar midnight and clamps
//!   the result to the plan. It drives day selection and everything the user sees.
//! - [`elapsed_day_index`] rounds the raw elapsed time up to whole days, with no
//!   midnight truncation and no clamping. Only the streak walk uses it.

use crate::plan::PLAN_DAYS;
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// The 1-based plan day for `now`, using the process-local time zone.
pub fn active_day(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    active_day_in(start, now, &Local)
}

/// The 1-based plan day for `now` in the given time zone.
///
/// Day 1 is the start date itself. A start date in the future clamps to 1, and
/// anything past the end of the plan reports the last day.
pub fn active_day_in<Tz: TimeZone>(start: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> u32 {
    let start_date = start.with_timezone(tz).date_naive();
    let today = now.with_timezone(tz).date_naive();
    let elapsed_days = today.signed_duration_since(start_date).num_days();
    (elapsed_days + 1).clamp(1, PLAN_DAYS as i64) as u32
}

/// `ceil(|now - start| / 1 day)`, unclamped. Zero when both instants coincide.
pub fn elapsed_day_index(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = now.signed_duration_since(start).num_milliseconds().abs();
    (millis + DAY_MILLIS - 1) / DAY_MILLIS
}

/// The calendar date on which plan day `day` falls, in the process-local time zone.
pub fn calendar_date(start: DateTime<Utc>, day: u32) -> Option<NaiveDate> {
    calendar_date_in(start, day, &Local)
}

pub fn calendar_date_in<Tz: TimeZone>(
    start: DateTime<Utc>,
    day: u32,
    tz: &Tz,
) -> Option<NaiveDate> {
    let offset = u64::from(day.max(1) - 1);
    start
        .with_timezone(tz)
        .date_naive()
        .checked_add_days(Days::new(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn start_date_is_day_one() {
        let start = at(2026, 3, 1, 9);
        assert_eq!(active_day_in(start, start, &Utc), 1);
        assert_eq!(active_day_in(start, at(2026, 3, 1, 23), &Utc), 1);
    }

    #[test]
    fn crossing_midnight_advances_the_day() {
        let start = at(2026, 3, 1, 23);
        assert_eq!(active_day_in(start, at(2026, 3, 2, 1), &Utc), 2);
        // The loose formula only sees two hours of elapsed time.
        assert_eq!(elapsed_day_index(start, at(2026, 3, 2, 1)), 1);
    }

    #[test]
    fn future_start_clamps_to_first_day() {
        let now = Utc::now();
        assert_eq!(active_day(now + Duration::days(10), now), 1);
    }

    #[test]
    fn long_elapsed_time_clamps_to_last_day() {
        let now = Utc::now();
        assert_eq!(active_day(now - Duration::days(1000), now), PLAN_DAYS);
        assert_eq!(active_day_in(now - Duration::days(75), now, &Utc), PLAN_DAYS);
    }

    #[test]
    fn elapsed_index_rounds_up_and_ignores_direction() {
        let start = at(2026, 3, 1, 0);
        assert_eq!(elapsed_day_index(start, start), 0);
        assert_eq!(elapsed_day_index(start, start + Duration::hours(36)), 2);
        assert_eq!(elapsed_day_index(start, start - Duration::hours(36)), 2);
        assert_eq!(elapsed_day_index(start, start + Duration::days(1000)), 1000);
    }

    #[test]
    fn calendar_dates_count_from_the_start_date() {
        let start = at(2026, 3, 30, 12);
        assert_eq!(
            calendar_date_in(start, 1, &Utc),
            NaiveDate::from_ymd_opt(2026, 3, 30)
        );
        assert_eq!(
            calendar_date_in(start, 75, &Utc),
            NaiveDate::from_ymd_opt(2026, 6, 12)
        );
    }
}
