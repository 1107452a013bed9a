//! Accounting fault taxonomy.
//!
//! Every fault is fatal to the current run: a silently incomplete carbon
//! ledger is worse than a hard failure, so the first fault aborts the run
//! and no partial ledger is returned. Each variant names the record that
//! triggered it so operators can fix the source data and resubmit.

use crate::store::{KeyPath, StoreError};
use std::fmt;

/// Kind of reference data a record failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefEntity {
    Formulation,
    Customer,
    Supplier,
}

impl fmt::Display for RefEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefEntity::Formulation => write!(f, "formulation"),
            RefEntity::Customer => write!(f, "customer"),
            RefEntity::Supplier => write!(f, "supplier"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AccountingFault {
    /// A record references reference data that does not exist, or omits a
    /// mandatory reference entirely (`reference: None`).
    MissingReferenceData {
        entity: RefEntity,
        record: String,
        reference: Option<String>,
    },
    /// Vehicle, distance, or per-km emission rate unresolved for a transport
    /// event.
    MissingTransportData { record: String, detail: String },
    /// A required site/global constant is absent.
    MissingConstant { key: KeyPath },
    /// A carbon-cost entry with no known conversion rule.
    UnsupportedCostType { entry: String, cost_type: String },
    /// A production record without a quantity, under the fault policy.
    MissingProductionQuantity { record: String },
    /// Storage unavailable or the run deadline elapsed.
    Fetch { detail: String, timed_out: bool },
}

impl fmt::Display for AccountingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingFault::MissingReferenceData {
                entity,
                record,
                reference,
            } => match reference {
                Some(id) => write!(f, "record {record}: {entity} {id:?} does not exist"),
                None => write!(f, "record {record} is missing a {entity} reference"),
            },
            AccountingFault::MissingTransportData { record, detail } => {
                write!(f, "record {record} is missing transport data: {detail}")
            }
            AccountingFault::MissingConstant { key } => {
                write!(f, "required constant {key} is not set")
            }
            AccountingFault::UnsupportedCostType { entry, cost_type } => {
                write!(f, "carbon cost {entry} has unsupported type {cost_type:?}")
            }
            AccountingFault::MissingProductionQuantity { record } => {
                write!(f, "production record {record} has no quantity")
            }
            AccountingFault::Fetch { detail, timed_out } => {
                if *timed_out {
                    write!(f, "fetch timed out: {detail}")
                } else {
                    write!(f, "fetch failed: {detail}")
                }
            }
        }
    }
}

impl std::error::Error for AccountingFault {}

impl From<StoreError> for AccountingFault {
    fn from(err: StoreError) -> Self {
        AccountingFault::Fetch {
            detail: err.to_string(),
            timed_out: false,
        }
    }
}

impl AccountingFault {
    /// A run that exceeded its deadline.
    pub fn timeout(detail: impl Into<String>) -> Self {
        AccountingFault::Fetch {
            detail: detail.into(),
            timed_out: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AccountingFault::Fetch { timed_out: true, .. })
    }

    /// Whether the fault is a storage problem rather than a data problem.
    pub fn is_fetch(&self) -> bool {
        matches!(self, AccountingFault::Fetch { .. })
    }
}
