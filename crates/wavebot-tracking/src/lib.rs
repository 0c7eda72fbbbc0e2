//! Face tracking for the wavebot rig.
//!
//! Turns face detections into servo targets:
//! - [`FaceTracker`] picks the face to follow
//! - [`AngleMapper`] maps its offset from frame center to channel angles
//! - [`TrackingSession`] runs the per-frame loop, including detection
//!   cadence and idle recentering

pub mod config;
pub mod error;
pub mod idle;
pub mod mapper;
pub mod session;
pub mod tracker;

pub use config::{AngleRange, EyeResponse, MapperConfig, TrackingConfig};
pub use error::{TrackingError, TrackingResult};
pub use idle::IdleRecenter;
pub use mapper::{AngleMapper, AngleTarget};
pub use session::{FrameReport, TrackingSession};
pub use tracker::FaceTracker;
