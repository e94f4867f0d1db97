//! Typed replacement for the heterogeneous "extras" dictionary the source
//! system carries on every market data payload.
//!
//! Per the Design Note in the spec ("Heterogeneous extras dictionary ->
//! a typed `Extras` structure"), this avoids a general `any` type while
//! still round-tripping broker-specific fields losslessly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value in an [`Extras`] map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    I64(i64),
    F64(f64),
    Str(String),
    Bool(bool),
}

impl From<i64> for ExtraValue {
    fn from(v: i64) -> Self {
        ExtraValue::I64(v)
    }
}

impl From<f64> for ExtraValue {
    fn from(v: f64) -> Self {
        ExtraValue::F64(v)
    }
}

impl From<String> for ExtraValue {
    fn from(v: String) -> Self {
        ExtraValue::Str(v)
    }
}

impl From<&str> for ExtraValue {
    fn from(v: &str) -> Self {
        ExtraValue::Str(v.to_string())
    }
}

impl From<bool> for ExtraValue {
    fn from(v: bool) -> Self {
        ExtraValue::Bool(v)
    }
}

/// Ordered map of broker-specific fields that don't have a first-class
/// slot on [`crate::event::MDTickEvent`] / [`crate::event::MDBookEvent`].
///
/// A `BTreeMap` (rather than a `HashMap`) keeps JSON-line output
/// deterministic across runs, which matters for the raw writer's
/// append-only log and for test fixtures.
pub type Extras = BTreeMap<String, ExtraValue>;
