//! HTTP surface. Thin handlers over the accounting engine; no rendering,
//! no auth.

pub mod routes;

pub use routes::{router, AppState};
