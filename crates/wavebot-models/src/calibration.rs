//! Per-channel servo calibration: travel limits and rest pose.
//!
//! The table is compiled in with defaults for the stock rig and may be
//! overridden once at startup from a JSON document keyed by channel name:
//!
//! ```json
//! { "NECK_X": { "min": 30.0, "max": 100.0 }, "EYE_LEFT_Y": { "center": 118.0 } }
//! ```
//!
//! After construction the table is immutable for the process lifetime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::channel::{Channel, ChannelMap};
use crate::error::{ModelError, ModelResult};

/// Travel limits and rest angle for a single channel, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub min: f64,
    pub max: f64,
    pub center: f64,
}

impl ChannelCalibration {
    pub const fn new(min: f64, max: f64, center: f64) -> Self {
        Self { min, max, center }
    }

    /// Restrict `angle` to `[min, max]`.
    ///
    /// NaN has no meaningful position and resolves to the rest angle.
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        if angle.is_nan() {
            self.center
        } else {
            angle.max(self.min).min(self.max)
        }
    }

    fn validate(&self, channel: Channel) -> ModelResult<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.center.is_finite()) {
            return Err(ModelError::invalid_calibration(format!(
                "{channel}: limits must be finite (min={}, max={}, center={})",
                self.min, self.max, self.center
            )));
        }
        if self.min > self.max {
            return Err(ModelError::invalid_calibration(format!(
                "{channel}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        if self.center < self.min || self.center > self.max {
            return Err(ModelError::invalid_calibration(format!(
                "{channel}: center {} outside [{}, {}]",
                self.center, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Partial override for one channel. Missing fields keep the default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationOverride {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub center: Option<f64>,
}

/// Validated calibration table for every channel on the rig.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    channels: ChannelMap<ChannelCalibration>,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            channels: ChannelMap::from_fn(default_channel_calibration),
        }
    }
}

fn default_channel_calibration(channel: Channel) -> ChannelCalibration {
    match channel {
        Channel::EyeLeftX => ChannelCalibration::new(100.0, 160.0, 125.0),
        Channel::EyeLeftY => ChannelCalibration::new(55.0, 135.0, 120.0),
        Channel::EyeRightX => ChannelCalibration::new(100.0, 180.0, 130.0),
        Channel::EyeRightY => ChannelCalibration::new(60.0, 140.0, 110.0),
        Channel::HandRight => ChannelCalibration::new(0.0, 180.0, 90.0),
        Channel::NeckX => ChannelCalibration::new(20.0, 110.0, 74.0),
        Channel::NeckY => ChannelCalibration::new(0.0, 40.0, 20.0),
    }
}

impl Calibration {
    /// Build a calibration table, validating every channel.
    pub fn new(channels: ChannelMap<ChannelCalibration>) -> ModelResult<Self> {
        for (channel, cal) in channels.iter() {
            cal.validate(channel)?;
        }
        Ok(Self { channels })
    }

    /// Apply overrides keyed by channel name on top of this table.
    pub fn with_overrides(
        &self,
        overrides: &BTreeMap<String, CalibrationOverride>,
    ) -> ModelResult<Self> {
        let mut channels = self.channels;
        for (name, patch) in overrides {
            let channel: Channel = name.parse()?;
            let slot = &mut channels[channel];
            if let Some(min) = patch.min {
                slot.min = min;
            }
            if let Some(max) = patch.max {
                slot.max = max;
            }
            if let Some(center) = patch.center {
                slot.center = center;
            }
        }
        Self::new(channels)
    }

    /// Parse a JSON override document and apply it over the defaults.
    pub fn from_json_overrides(json: &str) -> ModelResult<Self> {
        let overrides: BTreeMap<String, CalibrationOverride> = serde_json::from_str(json)?;
        Self::default().with_overrides(&overrides)
    }

    pub fn get(&self, channel: Channel) -> &ChannelCalibration {
        &self.channels[channel]
    }

    /// Clamp `angle` to the channel's travel limits.
    #[inline]
    pub fn clamp(&self, channel: Channel, angle: f64) -> f64 {
        self.channels[channel].clamp(angle)
    }

    pub fn center(&self, channel: Channel) -> f64 {
        self.channels[channel].center
    }

    /// Rest angle for every channel.
    pub fn center_pose(&self) -> ChannelMap<f64> {
        self.channels.map(|_, cal| cal.center)
    }

    pub fn channels(&self) -> &ChannelMap<ChannelCalibration> {
        &self.channels
    }
}
