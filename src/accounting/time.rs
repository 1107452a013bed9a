//! Reporting-timezone date normalization.
//!
//! Every ledger row's date is a calendar date in one fixed reporting
//! timezone (historically GMT+3), so rows near midnight bucket consistently
//! regardless of storage timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Default reporting offset, in hours east of UTC.
pub const DEFAULT_REPORTING_OFFSET_HOURS: i32 = 3;

/// The default GMT+3 reporting offset.
pub fn default_reporting_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_REPORTING_OFFSET_HOURS * 3600)
        .expect("GMT+3 is a valid offset")
}

/// Build a reporting offset from a whole-hour configuration value, falling
/// back to the default when the value is out of range.
pub fn reporting_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(default_reporting_offset)
}

/// Normalize a stored instant to its calendar date in the reporting timezone.
pub fn reporting_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Lift a calendar date to midnight in the reporting timezone, as a UTC
/// instant. Fixed offsets have no DST gaps, so this is total.
pub fn reporting_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    local_instant(date, NaiveTime::MIN, offset)
}

pub(crate) fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> DateTime<Utc> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .expect("fixed offsets are unambiguous")
        .with_timezone(&Utc)
}
