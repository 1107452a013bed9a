//! Aggregation adapter: ledgers → gross/net offset metrics.

use crate::accounting::engine::{CarbonReleasedRow, CarbonRetiredRow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sum of retired CO2eq over the window.
    pub gross_offset_tons: f64,
    /// Gross minus everything released.
    pub net_offset_tons: f64,
}

/// Pure fold over the two ledgers; no faults possible.
pub fn summarize(retired: &[CarbonRetiredRow], released: &[CarbonReleasedRow]) -> Summary {
    let gross: f64 = retired.iter().map(|row| row.tons_co2eq).sum();
    let released_total: f64 = released.iter().map(|row| row.tons_co2eq).sum();
    Summary {
        gross_offset_tons: gross,
        net_offset_tons: gross - released_total,
    }
}
