//! Face offset to servo angle mapping.
//!
//! Pure: the same offset, frame and last-commanded table always give the
//! same targets. Nothing here touches the controller.

use wavebot_models::{Calibration, Channel, ChannelMap, FrameOffset, FrameSize};

use crate::config::MapperConfig;

/// One angle the mapper wants a channel to move to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleTarget {
    pub channel: Channel,
    pub angle: f64,
}

impl AngleTarget {
    pub const fn new(channel: Channel, angle: f64) -> Self {
        Self { channel, angle }
    }
}

/// Converts a face's offset from frame center into per-channel targets.
///
/// Eyes follow every offset. Neck and hand only move once the offset on
/// their axis reaches the dead zone (`dimension / dead_zone_divisor`), and
/// only when the new target differs from the last commanded angle.
#[derive(Debug, Clone)]
pub struct AngleMapper {
    config: MapperConfig,
    calibration: Calibration,
}

impl AngleMapper {
    pub fn new(config: MapperConfig, calibration: Calibration) -> Self {
        Self {
            config,
            calibration,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Targets for a face at `offset`, in the order eye-left-x, eye-right-x,
    /// eye-left-y, eye-right-y, neck-x, neck-y, hand.
    ///
    /// Returns nothing for a zero-sized frame.
    pub fn compute_targets(
        &self,
        offset: FrameOffset,
        frame: FrameSize,
        last: &ChannelMap<f64>,
    ) -> Vec<AngleTarget> {
        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }

        let cfg = &self.config;
        let width = f64::from(frame.width);
        let height = f64::from(frame.height);
        let x = if cfg.mirror_x {
            -f64::from(offset.x)
        } else {
            f64::from(offset.x)
        };
        let y = f64::from(offset.y);

        let mut targets = Vec::with_capacity(Channel::COUNT);

        if x != 0.0 {
            let deflection = cfg.eye_response.apply(x * cfg.eye_gain_x / width);
            targets.push(self.eye(Channel::EyeLeftX, deflection));
            targets.push(self.eye(Channel::EyeRightX, deflection));
        }

        let left_y = cfg.eye_response.apply(y * cfg.eye_left_gain_y / height);
        let right_y = cfg.eye_response.apply(y * cfg.eye_right_gain_y / height);
        targets.push(self.eye(Channel::EyeLeftY, left_y));
        targets.push(self.eye(Channel::EyeRightY, right_y));

        let dead_x = width / cfg.dead_zone_divisor;
        let dead_y = height / cfg.dead_zone_divisor;

        if x.abs() >= dead_x {
            let neck_x = cfg
                .neck_x_range
                .clamp(self.calibration.center(Channel::NeckX) + x * cfg.neck_gain_x / width);
            self.push_if_moved(&mut targets, Channel::NeckX, neck_x, last);
        }

        if y.abs() >= dead_y {
            let neck_y = cfg
                .neck_y_range
                .clamp(self.calibration.center(Channel::NeckY) + y * cfg.neck_gain_y / height);
            self.push_if_moved(&mut targets, Channel::NeckY, neck_y, last);
        }

        if x.abs() >= dead_x {
            let hand = self.calibration.center(Channel::HandRight) + x * cfg.hand_gain_x / width;
            self.push_if_moved(&mut targets, Channel::HandRight, hand, last);
        }

        targets
    }

    fn eye(&self, channel: Channel, deflection: f64) -> AngleTarget {
        AngleTarget::new(
            channel,
            self.calibration
                .clamp(channel, self.calibration.center(channel) + deflection),
        )
    }

    fn push_if_moved(
        &self,
        targets: &mut Vec<AngleTarget>,
        channel: Channel,
        angle: f64,
        last: &ChannelMap<f64>,
    ) {
        let angle = self.calibration.clamp(channel, angle);
        if angle != last[channel] {
            targets.push(AngleTarget::new(channel, angle));
        }
    }
}
