//! Tracking error types.

use thiserror::Error;
use wavebot_servo::ServoError;

pub type TrackingResult<T> = Result<T, TrackingError>;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Invalid mapper configuration: {0}")]
    InvalidMapper(String),

    #[error("Servo error: {0}")]
    Servo(#[from] ServoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackingError {
    pub fn invalid_mapper(msg: impl Into<String>) -> Self {
        Self::InvalidMapper(msg.into())
    }
}
