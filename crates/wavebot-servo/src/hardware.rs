//! Actuation backends.
//!
//! The worker writes every applied angle through a [`HardwareBackend`],
//! chosen once when the controller is built:
//!
//! - `Physical`: a [`PwmSink`] that drives real servos
//! - `Simulated`: no output at all; the position table and logs are the
//!   only record of motion
//!
//! Callers of the controller never see which one is active.

use std::fmt;

use tracing::{error, info, warn};
use wavebot_models::Channel;

use crate::config::{BackendKind, ServoConfig};
use crate::error::{HwError, ServoResult};

/// PWM output for servo channels.
///
/// Only the servo worker ever calls into a sink, so implementations need
/// no internal locking.
pub trait PwmSink: Send + 'static {
    /// Drive `channel` to `angle` degrees.
    fn set_pwm_duty_cycle(&mut self, channel: Channel, angle: f64) -> Result<(), HwError>;

    /// Short label for logs.
    fn name(&self) -> &'static str {
        "pwm"
    }
}

/// Output path selected at startup.
pub enum HardwareBackend {
    Physical(Box<dyn PwmSink>),
    Simulated,
}

impl HardwareBackend {
    pub fn physical(sink: impl PwmSink) -> Self {
        HardwareBackend::Physical(Box::new(sink))
    }

    pub fn simulated() -> Self {
        HardwareBackend::Simulated
    }

    /// Bring up the configured backend, falling back to simulation when the
    /// board cannot be opened. Never fails.
    pub fn detect(config: &ServoConfig) -> Self {
        if config.backend == BackendKind::Simulated {
            info!("Servo backend: simulated (configured)");
            return HardwareBackend::Simulated;
        }

        match open_physical(config) {
            Ok(sink) => {
                info!(
                    sink = sink.name(),
                    bus = %config.i2c_bus,
                    address = %format!("{:#04x}", config.i2c_address),
                    "Servo backend: physical"
                );
                HardwareBackend::Physical(sink)
            }
            Err(e) => {
                if config.backend == BackendKind::Physical {
                    error!("Physical servo backend requested but unavailable: {}", e);
                } else {
                    warn!("Servo hardware not available: {}", e);
                }
                warn!("Falling back to simulated servos (no real movement)");
                HardwareBackend::Simulated
            }
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, HardwareBackend::Physical(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            HardwareBackend::Physical(sink) => sink.name(),
            HardwareBackend::Simulated => "simulated",
        }
    }

    pub(crate) fn write(&mut self, channel: Channel, angle: f64) -> Result<(), HwError> {
        match self {
            HardwareBackend::Physical(sink) => sink.set_pwm_duty_cycle(channel, angle),
            HardwareBackend::Simulated => Ok(()),
        }
    }
}

impl fmt::Debug for HardwareBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareBackend::Physical(sink) => f.debug_tuple("Physical").field(&sink.name()).finish(),
            HardwareBackend::Simulated => f.write_str("Simulated"),
        }
    }
}

#[cfg(feature = "pca9685")]
fn open_physical(config: &ServoConfig) -> ServoResult<Box<dyn PwmSink>> {
    let sink = crate::pca9685::Pca9685Sink::open(config)?;
    Ok(Box::new(sink))
}

#[cfg(not(feature = "pca9685"))]
fn open_physical(_config: &ServoConfig) -> ServoResult<Box<dyn PwmSink>> {
    Err(crate::error::ServoError::hardware_unavailable(
        "built without the pca9685 feature",
    ))
}

/// Servo pulse width in microseconds for an angle (SG90 mapping:
/// 0° = 1000 µs, 180° = 2000 µs).
pub fn pulse_width_us(angle: f64) -> f64 {
    let angle = if angle.is_nan() { 90.0 } else { angle.clamp(0.0, 180.0) };
    (angle * 1000.0 / 180.0).floor() + 1000.0
}

/// 12-bit PWM off-count for a pulse width at the given output frequency.
pub fn duty_ticks(pulse_us: f64, frequency_hz: f64) -> u16 {
    let ticks = (pulse_us * 4096.0 * frequency_hz / 1_000_000.0).round();
    ticks.clamp(0.0, 4095.0) as u16
}

/// PCA9685 prescaler for the given output frequency (25 MHz oscillator).
pub fn prescale_for(frequency_hz: f64) -> u8 {
    let prescale = (25_000_000.0 / (4096.0 * frequency_hz)).round() - 1.0;
    prescale.clamp(3.0, 255.0) as u8
}
