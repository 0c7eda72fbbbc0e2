//! Configuration for face tracking and the offset-to-angle mapping.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use wavebot_models::FrameSize;

use crate::error::{TrackingError, TrackingResult};

/// Response curve applied to eye deflections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EyeResponse {
    /// Deflection proportional to offset
    #[default]
    Linear,
    /// `saturation * tanh(d / saturation)`: linear near center, never
    /// exceeding `saturation` degrees
    Sigmoid { saturation: f64 },
}

impl EyeResponse {
    /// Shape a raw deflection in degrees. Odd and monotonic.
    pub fn apply(&self, deflection: f64) -> f64 {
        match *self {
            EyeResponse::Linear => deflection,
            EyeResponse::Sigmoid { saturation } if saturation > 0.0 && saturation.is_finite() => {
                saturation * (deflection / saturation).tanh()
            }
            EyeResponse::Sigmoid { .. } => deflection,
        }
    }
}

/// Inclusive angle window enforced by the mapper before the controller clamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        angle.max(self.min).min(self.max)
    }
}

/// Gains and sign conventions for [`AngleMapper`](crate::AngleMapper).
///
/// Gains are degrees per full frame dimension: a face at the right edge of
/// the frame (offset `width / 2`) deflects the eyes by `eye_gain_x / 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    // === Sign ===
    /// Flip horizontal offsets once before mapping (camera faces the viewer)
    pub mirror_x: bool,

    // === Eyes ===
    /// Horizontal gain for both eyes (default: 50)
    pub eye_gain_x: f64,
    /// Vertical gain for the left eye (default: 180)
    pub eye_left_gain_y: f64,
    /// Vertical gain for the right eye; mounted inverted (default: -190)
    pub eye_right_gain_y: f64,
    /// Damping curve for eye deflections
    pub eye_response: EyeResponse,

    // === Neck / hand ===
    /// Horizontal neck gain (default: 25)
    pub neck_gain_x: f64,
    /// Vertical neck gain (default: -20)
    pub neck_gain_y: f64,
    /// Horizontal hand gain (default: 40)
    pub hand_gain_x: f64,
    /// Neck pan window (default: 45..=110)
    pub neck_x_range: AngleRange,
    /// Neck tilt window (default: 0..=40)
    pub neck_y_range: AngleRange,
    /// Dead zone is `dimension / dead_zone_divisor` pixels (default: 6)
    pub dead_zone_divisor: f64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            mirror_x: true,
            eye_gain_x: 50.0,
            eye_left_gain_y: 180.0,
            eye_right_gain_y: -190.0,
            eye_response: EyeResponse::Linear,
            neck_gain_x: 25.0,
            neck_gain_y: -20.0,
            hand_gain_x: 40.0,
            neck_x_range: AngleRange::new(45.0, 110.0),
            neck_y_range: AngleRange::new(0.0, 40.0),
            dead_zone_divisor: 6.0,
        }
    }
}

impl MapperConfig {
    /// Parse a (possibly partial) JSON mapper config; missing fields keep defaults.
    pub fn from_json(json: &str) -> TrackingResult<Self> {
        let config: MapperConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TrackingResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> TrackingResult<()> {
        let gains = [
            self.eye_gain_x,
            self.eye_left_gain_y,
            self.eye_right_gain_y,
            self.neck_gain_x,
            self.neck_gain_y,
            self.hand_gain_x,
        ];
        if gains.iter().any(|g| !g.is_finite()) {
            return Err(TrackingError::invalid_mapper("gains must be finite"));
        }
        for (name, range) in [("neck_x_range", self.neck_x_range), ("neck_y_range", self.neck_y_range)] {
            if !(range.min <= range.max) {
                return Err(TrackingError::invalid_mapper(format!(
                    "{name}: min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }
        if !(self.dead_zone_divisor > 0.0) {
            return Err(TrackingError::invalid_mapper("dead_zone_divisor must be positive"));
        }
        Ok(())
    }
}

/// Tracking loop configuration.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Frame size assumed when a detection record omits it
    pub frame: FrameSize,
    /// Run detection on every N-th frame and reuse the result in between
    pub detect_every: u32,
    /// Recenter after this long without a face
    pub idle_timeout: Duration,
    /// Optional JSON file with mapper overrides
    pub mapper_file: Option<PathBuf>,
    /// Overrides `MapperConfig::mirror_x` when set
    pub mirror_x: Option<bool>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frame: FrameSize::default(),
            detect_every: 3,
            idle_timeout: Duration::from_secs(5),
            mapper_file: None,
            mirror_x: None,
        }
    }
}

impl TrackingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frame: FrameSize::new(
                env_parse("FRAME_WIDTH")
                    .filter(|w: &u32| *w > 0)
                    .unwrap_or(defaults.frame.width),
                env_parse("FRAME_HEIGHT")
                    .filter(|h: &u32| *h > 0)
                    .unwrap_or(defaults.frame.height),
            ),
            detect_every: env_parse("TRACKING_DETECT_EVERY")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.detect_every),
            idle_timeout: env_parse("TRACKING_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            mapper_file: std::env::var("TRACKING_MAPPER_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            mirror_x: std::env::var("TRACKING_MIRROR_X")
                .ok()
                .map(|s| parse_bool(&s))
                .or(defaults.mirror_x),
        }
    }

    /// Mapper config from the override file (or defaults), with the
    /// `TRACKING_MIRROR_X` override applied only when it was given.
    pub fn load_mapper(&self) -> TrackingResult<MapperConfig> {
        let mut mapper = match &self.mapper_file {
            Some(path) => {
                let mapper = MapperConfig::from_file(path)?;
                info!(path = %path.display(), "Loaded mapper overrides");
                mapper
            }
            None => MapperConfig::default(),
        };
        if let Some(mirror_x) = self.mirror_x {
            mapper.mirror_x = mirror_x;
        }
        Ok(mapper)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
