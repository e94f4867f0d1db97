use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    #[error("bid_prices has {prices} entries but bid_volumes has {volumes}")]
    BidLengthMismatch { prices: usize, volumes: usize },

    #[error("ask_prices has {prices} entries but ask_volumes has {volumes}")]
    AskLengthMismatch { prices: usize, volumes: usize },

    #[error("signed volume must be finite, got {0}")]
    NonFiniteVolume(f64),

    #[error("time must be finite, got {0}")]
    NonFiniteTime(f64),

    #[error("time must be monotonically non-decreasing: got {t} after last event at {last}")]
    TimeWentBackwards { t: f64, last: f64 },
}
