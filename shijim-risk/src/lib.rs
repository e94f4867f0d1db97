#![forbid(unsafe_code)]
//! Synchronous pre-trade risk gate (spec §4.9): kill switch, fat-finger,
//! position, and rate-limit guards evaluated in a fixed order in front
//! of the execution adapter.

pub mod error;
pub mod gateway;
pub mod guards;

pub use error::RiskError;
pub use gateway::{OrderSink, RejectedOrder, RiskAwareGateway};
pub use guards::{FatFingerGuard, KillSwitch, PositionGuard, RateLimiter, RiskManagerConfig, RiskResult};
