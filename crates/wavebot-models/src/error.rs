//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_calibration(msg: impl Into<String>) -> Self {
        Self::InvalidCalibration(msg.into())
    }
}
