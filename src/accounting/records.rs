//! Operational and reference record types.
//!
//! All of these are read-only inputs to an accounting run, owned and
//! persisted elsewhere; the engine never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Order status value that puts an order in accounting scope.
pub const STATUS_DELIVERED: &str = "Delivered";
/// Input status value that puts a biomass input in accounting scope.
pub const STATUS_OBTAINED: &str = "Obtained";
/// Input type that incurs transport accounting.
pub const INPUT_TYPE_BIOMASS: &str = "Biomass";
/// Formulation component whose mass fraction is the biochar share.
pub const COMPONENT_BIOCHAR: &str = "Biochar";

/// A customer order. In accounting scope once delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_number: String,
    pub delivered_date: DateTime<Utc>,
    /// Liters of formulated product delivered.
    pub production_quantity_l: f64,
    pub formulation: String,
    pub customer: String,
    pub vehicle: Option<String>,
    /// Activated orders are consumed or processed further before leaving the
    /// site and never incur outbound transport.
    pub is_activated: bool,
    pub status: String,
}

/// A raw-material intake record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    pub id: String,
    pub delivery_date: DateTime<Utc>,
    pub input_type: String,
    pub supplier: Option<String>,
    pub vehicle: Option<String>,
    pub status: String,
}

/// Category of an energy/fuel carbon-cost entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CostKind {
    Electricity,
    Diesel,
    /// Anything the engine has no conversion rule for.
    Other(String),
}

impl From<String> for CostKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Electricity" => CostKind::Electricity,
            "Diesel" => CostKind::Diesel,
            _ => CostKind::Other(raw),
        }
    }
}

impl From<CostKind> for String {
    fn from(kind: CostKind) -> String {
        kind.to_string()
    }
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostKind::Electricity => write!(f, "Electricity"),
            CostKind::Diesel => write!(f, "Diesel"),
            CostKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// An energy/fuel consumption entry (kWh for electricity, liters for diesel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonCost {
    pub id: String,
    pub date: DateTime<Utc>,
    pub kind: CostKind,
    pub value: f64,
    pub notes: String,
}

/// One production run's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: String,
    pub end_date: DateTime<Utc>,
    /// Missing in some historical records; policy decides zero vs. fault.
    pub quantity_tons: Option<f64>,
}

/// Immutable formulation reference data: component → mass fraction in [0,1].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Formulation {
    pub components: BTreeMap<String, f64>,
}

impl Formulation {
    /// Mass fraction of the biochar component, if the formulation has one.
    pub fn biochar_fraction(&self) -> Option<f64> {
        self.components.get(COMPONENT_BIOCHAR).copied()
    }
}

/// Customer reference data; `distance_km` is the haul from the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub distance_km: Option<f64>,
}

/// Supplier reference data; `distance_km` is the haul to the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub distance_km: Option<f64>,
}
