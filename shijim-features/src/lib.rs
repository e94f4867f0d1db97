#![forbid(unsafe_code)]
//! Stateful per-symbol feature calculators consuming book/trade events
//! and emitting derived signals (spec §4.7): order flow imbalance, VPIN,
//! and Hawkes intensity.

pub mod error;
pub mod hawkes;
pub mod ofi;
pub mod vpin;

pub use error::FeatureError;
pub use hawkes::HawkesIntensity;
pub use ofi::{OfiCalculator, OfiWindowAccumulator};
pub use vpin::VpinCalculator;
