use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EstimateError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("estimation failed: {0}")]
    Estimate(#[from] EstimateError),
    #[error("watch channel send failed")]
    WatchSend,
    #[error("state lock poisoned")]
    StateLock,
}
