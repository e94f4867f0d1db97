use thiserror::Error;

/// Configuration and wiring errors for the risk gate. Per-order
/// accept/reject decisions are carried by `RiskResult`, not this enum.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("rate limiter rate/burst must be positive")]
    InvalidRateLimit,
}
