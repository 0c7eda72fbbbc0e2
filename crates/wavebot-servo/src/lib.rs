//! Queued servo motion controller.
//!
//! This crate provides:
//! - A single-worker FIFO command queue for servo moves
//! - Immediate, gradual (stepped) and centering moves, clamped per channel
//! - Retargeting that voids the unexecuted steps of earlier gradual moves
//! - A lock-free table of last applied angles
//! - Physical (PCA9685) and simulated actuation backends
//!
//! Producers never block on actuator timing; only `stop()` waits, and only
//! for the queue to drain.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod hardware;
#[cfg(feature = "pca9685")]
pub mod pca9685;
pub mod positions;
pub mod worker;

pub use command::{plan_gradual, Command};
pub use config::{BackendKind, ServoConfig};
pub use controller::{ControllerState, ServoController, ServoHandle};
pub use error::{HwError, ServoError, ServoResult};
pub use hardware::{HardwareBackend, PwmSink};
pub use positions::PositionTable;
pub use worker::WorkerStats;
