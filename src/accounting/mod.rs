//! The carbon accounting core: records in, two ledgers and a production
//! total out. See [`engine`] for the ledger rules.

pub mod engine;
pub mod fault;
pub mod records;
pub mod resolver;
pub mod summary;
pub mod time;
pub mod window;
