//! Shared plumbing for the wavebot binaries.

pub mod calibrate;
pub mod logging;
pub mod record;

pub use calibrate::{CalibrateCommand, ParseCommandError};
pub use logging::init_tracing;
pub use record::DetectionRecord;
