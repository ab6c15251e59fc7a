//! Retention schedule generation.
//!
//! A schedule is the sorted, deduplicated set of bucket boundaries derived
//! from a [`RetentionPolicy`] and a fixed `now`. Hourly, daily, and weekly
//! boundaries step back by fixed widths from their anchors; monthly
//! boundaries step back one true calendar month at a time, so February and
//! 31-day months never drift.

use time::macros::datetime;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::policy::RetentionPolicy;

/// No monthly boundary is generated at or before this instant.
pub const MONTHLY_FLOOR: OffsetDateTime = datetime!(2007-01-01 0:00 UTC);

/// Generate the bucket boundaries for `policy` as seen from `now`.
///
/// Pure and deterministic: the caller fixes `now` once per run so every
/// volume group is judged against identical boundaries. The result is
/// ascending and duplicate-free, and empty when all tiers are zero.
pub fn generate_schedule(now: OffsetDateTime, policy: &RetentionPolicy) -> Vec<OffsetDateTime> {
    // Anchors are UTC calendar units; a `now` carrying another offset would
    // otherwise anchor to the wrong day near midnight.
    let now = now.to_offset(UtcOffset::UTC);
    let day_start = PrimitiveDateTime::new(now.date(), Time::MIDNIGHT).assume_utc();
    let hour_start = day_start + Duration::hours(i64::from(now.hour()));
    // Week anchor: the most recent Sunday midnight at or before `now`.
    let week_start =
        day_start - Duration::days(i64::from(now.date().weekday().number_days_from_sunday()));

    let mut boundaries = Vec::new();

    for hour in 0..policy.hourly {
        boundaries.push(hour_start - Duration::hours(i64::from(hour)));
    }
    for day in 0..policy.daily {
        boundaries.push(day_start - Duration::days(i64::from(day)));
    }
    for week in 0..policy.weekly {
        boundaries.push(week_start - Duration::weeks(i64::from(week)));
    }

    let mut month_start = month_floor(now.date());
    let mut added = 0u32;
    loop {
        let boundary = PrimitiveDateTime::new(month_start, Time::MIDNIGHT).assume_utc();
        if boundary <= MONTHLY_FLOOR || policy.monthly.is_exhausted(added) {
            break;
        }
        boundaries.push(boundary);
        added += 1;
        // Step into the previous month, then snap to its first day.
        month_start = month_floor(month_start - Duration::days(1));
    }

    boundaries.sort_unstable();
    boundaries.dedup();
    boundaries
}

/// First day of the month containing `date`.
fn month_floor(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}
