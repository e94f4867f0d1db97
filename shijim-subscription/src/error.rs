use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("session {index} connect failed: {reason}")]
    Connect { index: usize, reason: String },

    #[error("session pool is empty")]
    EmptyPool,

    #[error("batch_size must be positive")]
    InvalidBatchSize,
}
