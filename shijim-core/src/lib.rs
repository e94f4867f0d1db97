#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]
//! # shijim-core
//!
//! Shared foundation for the shijim market-data and trading pipeline:
//! the normalized event schema (§3 of the spec), the broker-payload
//! normalization contract, the error taxonomy, environment-variable
//! configuration, and `tracing` initializers.
//!
//! Every other `shijim-*` crate depends on this one for `MDTickEvent`,
//! `MDBookEvent`, `Extras`, and `ShijimError`.

/// Normalized per-symbol market data events (`MDTickEvent`, `MDBookEvent`).
pub mod event;

/// Typed `extras` map preserving broker-specific fields losslessly.
pub mod extras;

/// `BrokerPayload` trait and the normalization functions that turn a
/// broker payload into a normalized event.
pub mod normalize;

/// Trading-day and timestamp helpers (`ts_ns` is UTC nanoseconds).
pub mod calendar;

/// Error taxonomy shared across the workspace.
pub mod error;

/// Environment-variable configuration (§6 of the spec).
pub mod config;

/// `tracing` initializers (human-readable and JSON).
pub mod logging;

/// Order intent shared by the strategy, risk, and execution crates.
pub mod order;

pub use error::ShijimError;
pub use event::{AssetType, MDBookEvent, MDTickEvent, MarketDataEvent, Side};
pub use extras::{Extras, ExtraValue};
pub use order::{OrderRequest, OrderRequestAction, OrderSide};
