//! Operator seed file.
//!
//! Constants and reference data change rarely and are operator-controlled.
//! A TOML file applied at startup replaces hand-editing the store console:
//!
//! ```toml
//! sites = ["nakuru"]
//!
//! [constants.global]
//! dieselKgCO2PerL = 2.68
//! "transportKgCO2PerKm.truck" = 0.9
//!
//! [constants.nakuru]
//! biocharDensityKgPerL = 1.2
//! biocharCarbonContent = 0.8
//! gramsCO2PerKWh = 400.0
//!
//! [formulations.F1]
//! Biochar = 0.3
//!
//! [[customers]]
//! site = "nakuru"
//! id = "CUST-1"
//! distance_km = 50.0
//! ```
//!
//! Applying a seed is idempotent: every entry is an upsert.

use crate::store::paths::collection_prefix;
use crate::store::{KeyPath, SqliteStore};
use crate::store::DataStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub sites: Vec<String>,
    /// group → dotted path → value.
    #[serde(default)]
    pub constants: BTreeMap<String, BTreeMap<String, f64>>,
    /// formulation name → component → mass fraction.
    #[serde(default)]
    pub formulations: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub customers: Vec<SeedPartner>,
    #[serde(default)]
    pub suppliers: Vec<SeedPartner>,
}

/// A customer or supplier entry, attached to a site by name.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPartner {
    pub site: String,
    pub id: String,
    pub distance_km: Option<f64>,
}

/// Load a seed file from disk.
pub fn load(path: &Path) -> Result<SeedFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse seed file {}", path.display()))
}

/// Apply a seed to the store. Safe to run on every startup.
pub fn apply(store: &SqliteStore, seed: &SeedFile) -> Result<()> {
    for site in &seed.sites {
        store.upsert_site(site)?;
    }

    for (group, entries) in &seed.constants {
        for (raw_path, value) in entries {
            let path: KeyPath = raw_path
                .parse()
                .with_context(|| format!("constants.{group}"))?;
            store.set_constant(group, &path, *value)?;
        }
    }

    for (name, components) in &seed.formulations {
        for (component, fraction) in components {
            store.upsert_formulation_component(name, component, *fraction)?;
        }
    }

    for customer in &seed.customers {
        let prefix = collection_prefix(&customer.site);
        store.upsert_customer(&prefix, &customer.id, customer.distance_km)?;
    }
    for supplier in &seed.suppliers {
        let prefix = collection_prefix(&supplier.site);
        store.upsert_supplier(&prefix, &supplier.id, supplier.distance_km)?;
    }

    info!(
        "Seed applied: {} sites, {} constants groups, {} formulations, {} customers, {} suppliers",
        seed.sites.len(),
        seed.constants.len(),
        seed.formulations.len(),
        seed.customers.len(),
        seed.suppliers.len(),
    );
    Ok(())
}
