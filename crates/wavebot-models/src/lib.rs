//! Shared data models for the wavebot rig.
//!
//! This crate provides:
//! - The closed set of servo channels and fixed-size per-channel tables
//! - Calibration limits and rest pose, with startup overrides
//! - Face boxes and frame geometry used by the tracking loop

pub mod calibration;
pub mod channel;
pub mod error;
pub mod face;

pub use calibration::{Calibration, CalibrationOverride, ChannelCalibration};
pub use channel::{Channel, ChannelMap};
pub use error::{ModelError, ModelResult};
pub use face::{FaceBox, FrameOffset, FrameSize};
