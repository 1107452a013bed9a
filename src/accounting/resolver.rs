//! Reference-data resolver with per-run memoization.
//!
//! Repeated ids inside one window are common (the same customer ordering
//! weekly, the same supplier delivering daily), so lookups are memoized for
//! the lifetime of one accounting run. The resolver is constructed inside
//! the run and dropped with it; nothing leaks across runs or sites.
//!
//! Distance caches are keyed by `(site_prefix, id)` — two sites may reuse an
//! id with different distances. Formulations are a global collection and key
//! by name alone.

use crate::accounting::records::{Customer, Formulation, Supplier};
use crate::store::{DataStore, StoreError};
use std::collections::HashMap;

pub struct RefResolver<'a> {
    store: &'a dyn DataStore,
    formulations: HashMap<String, Option<Formulation>>,
    customers: HashMap<(String, String), Option<Customer>>,
    suppliers: HashMap<(String, String), Option<Supplier>>,
}

impl<'a> RefResolver<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self {
            store,
            formulations: HashMap::new(),
            customers: HashMap::new(),
            suppliers: HashMap::new(),
        }
    }

    pub fn formulation(&mut self, name: &str) -> Result<Option<Formulation>, StoreError> {
        if let Some(cached) = self.formulations.get(name) {
            return Ok(cached.clone());
        }
        let fetched = self.store.formulation(name)?;
        self.formulations.insert(name.to_string(), fetched.clone());
        Ok(fetched)
    }

    pub fn customer(&mut self, prefix: &str, id: &str) -> Result<Option<Customer>, StoreError> {
        let key = (prefix.to_string(), id.to_string());
        if let Some(cached) = self.customers.get(&key) {
            return Ok(cached.clone());
        }
        let fetched = self.store.customer(prefix, id)?;
        self.customers.insert(key, fetched.clone());
        Ok(fetched)
    }

    pub fn supplier(&mut self, prefix: &str, id: &str) -> Result<Option<Supplier>, StoreError> {
        let key = (prefix.to_string(), id.to_string());
        if let Some(cached) = self.suppliers.get(&key) {
            return Ok(cached.clone());
        }
        let fetched = self.store.supplier(prefix, id)?;
        self.suppliers.insert(key, fetched.clone());
        Ok(fetched)
    }
}
