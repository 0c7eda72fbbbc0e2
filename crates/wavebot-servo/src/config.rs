//! Servo controller configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;
use wavebot_models::Calibration;

use crate::error::{ServoError, ServoResult};

/// Which actuation backend to bring up at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Try the physical board, fall back to simulation.
    #[default]
    Auto,
    /// Never touch hardware.
    Simulated,
    /// Expect the physical board; still falls back, but loudly.
    Physical,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Auto => "auto",
            BackendKind::Simulated => "simulated",
            BackendKind::Physical => "physical",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "simulated" | "sim" | "dummy" => Ok(BackendKind::Simulated),
            "physical" | "hardware" | "pca9685" => Ok(BackendKind::Physical),
            other => Err(ServoError::config(format!("unknown servo backend '{other}'"))),
        }
    }
}

/// Servo controller configuration.
#[derive(Debug, Clone)]
pub struct ServoConfig {
    /// Backend selection policy
    pub backend: BackendKind,
    /// I2C bus device for the PWM board
    pub i2c_bus: String,
    /// I2C address of the PWM board
    pub i2c_address: u8,
    /// PWM output frequency
    pub pwm_frequency_hz: f64,
    /// Optional JSON file with calibration overrides
    pub calibration_file: Option<PathBuf>,
    /// Step size for gradual moves issued by tools
    pub gradual_step_degrees: f64,
    /// Delay between gradual move steps
    pub gradual_step_delay: Duration,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            i2c_bus: "/dev/i2c-1".to_string(),
            i2c_address: 0x40,
            pwm_frequency_hz: 60.0,
            calibration_file: None,
            gradual_step_degrees: 1.0,
            gradual_step_delay: Duration::from_millis(20),
        }
    }
}

impl ServoConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: std::env::var("SERVO_BACKEND")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backend),
            i2c_bus: std::env::var("SERVO_I2C_BUS").unwrap_or(defaults.i2c_bus),
            i2c_address: std::env::var("SERVO_I2C_ADDRESS")
                .ok()
                .and_then(|s| parse_address(&s))
                .unwrap_or(defaults.i2c_address),
            pwm_frequency_hz: std::env::var("SERVO_PWM_FREQUENCY_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|hz: &f64| *hz > 0.0)
                .unwrap_or(defaults.pwm_frequency_hz),
            calibration_file: std::env::var("SERVO_CALIBRATION_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            gradual_step_degrees: std::env::var("SERVO_GRADUAL_STEP_DEGREES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.gradual_step_degrees),
            gradual_step_delay: std::env::var("SERVO_GRADUAL_STEP_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.gradual_step_delay),
        }
    }

    /// Load the calibration table, applying the override file when configured.
    pub fn load_calibration(&self) -> ServoResult<Calibration> {
        let Some(path) = &self.calibration_file else {
            return Ok(Calibration::default());
        };

        let json = std::fs::read_to_string(path)?;
        let calibration = Calibration::from_json_overrides(&json)?;
        info!(path = %path.display(), "Loaded servo calibration overrides");
        Ok(calibration)
    }
}

/// Parse an I2C address written as decimal or `0x`-prefixed hex.
fn parse_address(s: &str) -> Option<u8> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wavebot_models::Channel;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("AUTO".parse::<BackendKind>().unwrap(), BackendKind::Auto);
        assert_eq!("sim".parse::<BackendKind>().unwrap(), BackendKind::Simulated);
        assert_eq!("pca9685".parse::<BackendKind>().unwrap(), BackendKind::Physical);
        assert!("gpio".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x40"), Some(0x40));
        assert_eq!(parse_address("0X41"), Some(0x41));
        assert_eq!(parse_address("64"), Some(64));
        assert_eq!(parse_address("0x1ff"), None);
        assert_eq!(parse_address("bogus"), None);
    }

    #[test]
    fn test_load_calibration_defaults_without_file() {
        let config = ServoConfig::default();
        assert_eq!(config.load_calibration().unwrap(), Calibration::default());
    }

    #[test]
    fn test_load_calibration_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "NECK_X": {{ "min": 40.0, "max": 90.0, "center": 60.0 }} }}"#).unwrap();

        let config = ServoConfig {
            calibration_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let calibration = config.load_calibration().unwrap();
        assert_eq!(calibration.center(Channel::NeckX), 60.0);
        assert_eq!(calibration.clamp(Channel::NeckX, 100.0), 90.0);
    }

    #[test]
    fn test_load_calibration_rejects_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "NECK_X": {{ "min": 90.0, "max": 40.0 }} }}"#).unwrap();

        let config = ServoConfig {
            calibration_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(
            config.load_calibration(),
            Err(ServoError::InvalidCalibration(_))
        ));
    }
}
