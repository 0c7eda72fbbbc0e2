//! Servo controller error types.

use thiserror::Error;
use wavebot_models::{Channel, ModelError};

pub type ServoResult<T> = Result<T, ServoError>;

/// Failure reported by a PWM sink for a single write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HwError {
    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Channel {0} is not wired on this board")]
    UnsupportedChannel(Channel),
}

impl HwError {
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum ServoError {
    #[error("Servo hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Channel {channel} fault: {source}")]
    ChannelFault {
        channel: Channel,
        #[source]
        source: HwError,
    },

    #[error("Servo controller is not running")]
    NotRunning,

    #[error("Servo controller is still draining; finish stop() before starting again")]
    StillDraining,

    #[error("No async runtime available to host the servo worker")]
    NoRuntime,

    #[error("Servo worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServoError {
    pub fn hardware_unavailable(msg: impl Into<String>) -> Self {
        Self::HardwareUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn channel_fault(channel: Channel, source: HwError) -> Self {
        Self::ChannelFault { channel, source }
    }
}

impl From<ModelError> for ServoError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Json(e) => ServoError::Json(e),
            other => ServoError::InvalidCalibration(other.to_string()),
        }
    }
}
