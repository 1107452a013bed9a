//! CarbonTrack Backend Library
//!
//! Carbon-credit accounting for biochar production sites. One accounting run
//! aggregates the operational records of a (site, window) pair into a
//! carbon-retired ledger, a carbon-released ledger, and total biochar
//! production, from which gross/net carbon offset are derived.
//!
//! Exposes all modules for use by binaries and tests.

pub mod accounting;
pub mod api;
pub mod models;
pub mod store;

pub use accounting::engine::{AccountingRun, CarbonEngine, EngineConfig};
pub use accounting::fault::AccountingFault;
pub use accounting::window::Window;
pub use store::{DataStore, SqliteStore};
