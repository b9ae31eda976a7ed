use std::io;
use thiserror::Error;

/// Errors raised outside the per-day engine: configuration, I/O and logging set-up.
#[derive(Debug, Error)]
pub enum CtnsError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("simulation has not been initialized")]
    Uninitialized,
}

impl CtnsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        CtnsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
