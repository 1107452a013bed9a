//! The inclusive time window an accounting run aggregates over.

use crate::accounting::time::local_instant;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` range of timezone-aware instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window spanning whole reporting-timezone days: midnight on
    /// `start_date` through 23:59:59 on `end_date`.
    pub fn reporting_days(start_date: NaiveDate, end_date: NaiveDate, offset: FixedOffset) -> Self {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("valid time of day");
        Self {
            start: local_instant(start_date, NaiveTime::MIN, offset),
            end: local_instant(end_date, end_of_day, offset),
        }
    }

    /// Inclusive at both ends.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}
