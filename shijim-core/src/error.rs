//! Error taxonomy shared across the `shijim-*` workspace (spec §7).
//!
//! Each crate defines its own `thiserror` enum for its local failure
//! modes; this module only carries the handful of errors that are
//! meaningful at the data-model boundary (event construction,
//! normalization, trading-day derivation).

use thiserror::Error;

/// Errors raised while constructing or normalizing a [`crate::event::MDTickEvent`]
/// or [`crate::event::MDBookEvent`].
///
/// Per spec §7, normalizer failures are "consumer-observable (raise)":
/// callers are expected to log and skip the offending payload rather than
/// abort the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShijimError {
    #[error("ts_ns must be >= 0, got {0}")]
    NegativeTimestamp(i64),

    #[error("bid_prices and bid_volumes must have equal length ({bid_prices} != {bid_volumes})")]
    BidLengthMismatch { bid_prices: usize, bid_volumes: usize },

    #[error("ask_prices and ask_volumes must have equal length ({ask_prices} != {ask_volumes})")]
    AskLengthMismatch { ask_prices: usize, ask_volumes: usize },

    #[error("bid_prices must be non-increasing, violated at index {index}")]
    BidNotDescending { index: usize },

    #[error("ask_prices must be non-decreasing, violated at index {index}")]
    AskNotAscending { index: usize },

    #[error("missing required broker field: {0}")]
    MissingField(&'static str),
}
