//! Per-frame tracking loop.
//!
//! Ties detection cadence, face selection, angle mapping and idle
//! recentering together, and feeds the result to a servo controller.

use std::time::Instant;

use tracing::{debug, info};
use wavebot_models::{FaceBox, FrameOffset, FrameSize};
use wavebot_servo::ServoHandle;

use crate::config::TrackingConfig;
use crate::error::TrackingResult;
use crate::idle::IdleRecenter;
use crate::mapper::{AngleMapper, AngleTarget};
use crate::tracker::FaceTracker;

/// What one processed frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Detection ran on this frame (otherwise the last list was reused)
    pub detected: bool,
    /// Face being followed, if any
    pub face: Option<FaceBox>,
    /// Offset of that face from frame center
    pub offset: Option<FrameOffset>,
    /// Targets queued on the controller
    pub targets: Vec<AngleTarget>,
    /// Idle timeout fired and a centering was queued
    pub recentered: bool,
}

/// Stateful driver for the face-tracking loop.
pub struct TrackingSession {
    mapper: AngleMapper,
    tracker: FaceTracker,
    idle: IdleRecenter,
    detect_every: u64,
    frame_count: u64,
    faces: Vec<FaceBox>,
}

impl TrackingSession {
    pub fn new(config: &TrackingConfig, mapper: AngleMapper, now: Instant) -> Self {
        Self {
            mapper,
            tracker: FaceTracker::new(),
            idle: IdleRecenter::new(config.idle_timeout, now),
            detect_every: u64::from(config.detect_every.max(1)),
            frame_count: 0,
            faces: Vec::new(),
        }
    }

    /// Whether the next call to [`process_frame`](Self::process_frame) will
    /// run detection.
    pub fn should_detect(&self) -> bool {
        (self.frame_count + 1) % self.detect_every == 0
    }

    /// Process one frame.
    ///
    /// `detect` is only invoked on every N-th frame; the frames in between
    /// reuse the previous detection list.
    pub fn process_frame<F>(
        &mut self,
        detect: F,
        frame: FrameSize,
        now: Instant,
        servos: &ServoHandle,
    ) -> TrackingResult<FrameReport>
    where
        F: FnOnce() -> Vec<FaceBox>,
    {
        let mut report = FrameReport {
            detected: self.should_detect(),
            ..Default::default()
        };
        self.frame_count += 1;

        if report.detected {
            self.faces = detect();
            debug!(frame = self.frame_count, faces = self.faces.len(), "Detection ran");
        }

        let previous = self.tracker.tracked();
        let Some(face) = self.tracker.update(&self.faces) else {
            if previous.is_some() {
                debug!(frame = self.frame_count, "Lost face");
            }
            if self.idle.poll(now) {
                info!(
                    timeout_secs = self.idle.timeout().as_secs_f64(),
                    "No face detected, recentering servos"
                );
                servos.queue_center()?;
                report.recentered = true;
            }
            return Ok(report);
        };

        if previous != Some(face) {
            debug!(x = face.x, y = face.y, w = face.width, h = face.height, "Tracking face");
        }
        self.idle.mark_seen(now);

        let offset = face.offset_in(frame);
        let targets = self
            .mapper
            .compute_targets(offset, frame, &servos.commanded_positions());
        for target in &targets {
            servos.queue_set_angle(target.channel, target.angle)?;
        }

        report.face = Some(face);
        report.offset = Some(offset);
        report.targets = targets;
        Ok(report)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
