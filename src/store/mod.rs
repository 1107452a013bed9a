//! Storage layer: constants store, reference data, and operational records.
//!
//! The accounting engine only ever sees the `DataStore` trait; the SQLite
//! implementation is the production backend, and tests substitute their own
//! (e.g. a counting wrapper around an in-memory store).

pub mod constants;
pub mod paths;
pub mod seed;
pub mod sqlite;

pub use constants::{ConstantsDoc, KeyPath};
pub use sqlite::SqliteStore;

use crate::accounting::records::{
    CarbonCost, Customer, Formulation, Input, Order, ProductionRecord, Supplier,
};
use crate::accounting::window::Window;
use std::fmt;

/// Storage-level failure. All variants are fatal to the current accounting
/// run; retry is the caller's business.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// The backend could not be reached or a query failed.
    Unavailable { detail: String },
    /// A stored row could not be decoded into its record type.
    Corrupt { detail: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable { detail } => write!(f, "store unavailable: {detail}"),
            StoreError::Corrupt { detail } => write!(f, "corrupt record: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable {
            detail: err.to_string(),
        }
    }
}

/// Collaborator contract between storage and the accounting core.
///
/// `prefix` arguments are storage path prefixes from
/// [`paths::collection_prefix`], never raw site names. Reference lookups
/// return `Ok(None)` for absent documents; absence is data, not an error,
/// and the engine decides whether it is fatal.
pub trait DataStore: Send + Sync {
    fn global_constants(&self) -> Result<ConstantsDoc, StoreError>;
    fn site_constants(&self, site: &str) -> Result<ConstantsDoc, StoreError>;
    /// Persist a single constant immediately. Last write wins; there is no
    /// optimistic-concurrency check.
    fn set_constant(&self, group: &str, path: &KeyPath, value: f64) -> Result<(), StoreError>;

    fn list_sites(&self) -> Result<Vec<String>, StoreError>;

    /// Orders with status "Delivered" and delivered date inside the inclusive
    /// window.
    fn delivered_orders(&self, prefix: &str, window: &Window) -> Result<Vec<Order>, StoreError>;
    /// Inputs of type "Biomass" with status "Obtained" and delivery date
    /// inside the window.
    fn biomass_inputs(&self, prefix: &str, window: &Window) -> Result<Vec<Input>, StoreError>;
    fn carbon_costs(&self, prefix: &str, window: &Window) -> Result<Vec<CarbonCost>, StoreError>;
    /// Production runs whose end date falls inside the window.
    fn production_records(
        &self,
        prefix: &str,
        window: &Window,
    ) -> Result<Vec<ProductionRecord>, StoreError>;

    fn formulation(&self, name: &str) -> Result<Option<Formulation>, StoreError>;
    fn customer(&self, prefix: &str, id: &str) -> Result<Option<Customer>, StoreError>;
    fn supplier(&self, prefix: &str, id: &str) -> Result<Option<Supplier>, StoreError>;
}
