//! Configuration constants: dotted key paths and nested scalar documents.
//!
//! Constants are stored as flat `(group, dotted-path, value)` rows and folded
//! into a `ConstantsDoc` on read. A dotted path is at most two segments deep
//! (e.g. `transportKgCO2PerKm.truck`); the path is an explicit type rather
//! than ad-hoc string concatenation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An explicit constant key path: one or two dot-separated segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(Vec<String>);

/// Error raised when a dotted path string is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeyPath {
    pub raw: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid constant path {:?}: {}", self.raw, self.reason)
    }
}

impl std::error::Error for InvalidKeyPath {}

impl KeyPath {
    /// A single-segment path.
    pub fn single(key: &str) -> Self {
        Self(vec![key.to_string()])
    }

    /// A two-segment path (`key.sub`).
    pub fn nested(key: &str, sub: &str) -> Self {
        Self(vec![key.to_string(), sub.to_string()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for KeyPath {
    type Err = InvalidKeyPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(InvalidKeyPath {
                raw: s.to_string(),
                reason: "empty path segment",
            });
        }
        if segments.len() > 2 {
            return Err(InvalidKeyPath {
                raw: s.to_string(),
                reason: "at most two segments are supported",
            });
        }
        Ok(Self(segments))
    }
}

impl TryFrom<String> for KeyPath {
    type Error = InvalidKeyPath;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyPath> for String {
    fn from(path: KeyPath) -> String {
        path.to_string()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// One constant value: a scalar, or a one-level map of scalars (per-vehicle
/// transport rates and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Scalar(f64),
    Map(BTreeMap<String, f64>),
}

/// A group of constants (global, or one site's), as a nested scalar map.
///
/// An absent group reads back as an empty doc; whether a missing key is a
/// fault is decided by the accounting engine, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantsDoc {
    entries: BTreeMap<String, ConstantValue>,
}

impl ConstantsDoc {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold flat `(dotted-path, value)` rows into a nested doc.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (KeyPath, f64)>,
    {
        let mut doc = Self::default();
        for (path, value) in rows {
            doc.set(&path, value);
        }
        doc
    }

    /// Set a value at a path, overwriting whatever shape was there before.
    pub fn set(&mut self, path: &KeyPath, value: f64) {
        match path.segments() {
            [key] => {
                self.entries.insert(key.clone(), ConstantValue::Scalar(value));
            }
            [key, sub] => match self.entries.get_mut(key) {
                Some(ConstantValue::Map(map)) => {
                    map.insert(sub.clone(), value);
                }
                _ => {
                    let mut map = BTreeMap::new();
                    map.insert(sub.clone(), value);
                    self.entries.insert(key.clone(), ConstantValue::Map(map));
                }
            },
            // KeyPath::from_str caps depth at two.
            _ => {}
        }
    }

    /// Top-level scalar lookup.
    pub fn scalar(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(ConstantValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    /// Nested map lookup (`key.sub`).
    pub fn nested(&self, key: &str, sub: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(ConstantValue::Map(map)) => map.get(sub).copied(),
            _ => None,
        }
    }

    /// Lookup through an explicit path.
    pub fn lookup(&self, path: &KeyPath) -> Option<f64> {
        match path.segments() {
            [key] => self.scalar(key),
            [key, sub] => self.nested(key, sub),
            _ => None,
        }
    }

    pub fn entries(&self) -> &BTreeMap<String, ConstantValue> {
        &self.entries
    }
}
