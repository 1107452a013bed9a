//! Site name → storage path mapping.
//!
//! The sandbox site is a reserved name that maps to a fixed test path instead
//! of the production path. Every query goes through `collection_prefix` so the
//! mapping lives in exactly one place.

/// Reserved sentinel site name used for sandbox/test data.
pub const SANDBOX_SITE: &str = "mock-site";

/// Map a site name to the storage path prefix its collections live under.
pub fn collection_prefix(site: &str) -> String {
    if site == SANDBOX_SITE {
        format!("test/{SANDBOX_SITE}")
    } else {
        format!("sites/{site}")
    }
}
