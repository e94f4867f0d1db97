use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("io error writing to {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("columnar client error: {0}")]
    Columnar(String),

    #[error("writer queue is full; batch dropped")]
    QueueFull,

    #[error("background writer task failed: {0}")]
    TaskJoin(String),
}
