//! Sticky single-face tracker.
//!
//! Keeps following one face across frames instead of jumping to whichever
//! detection happens to come first.

use wavebot_models::FaceBox;

/// Chooses which detected face the rig looks at.
///
/// - With nothing tracked, the largest face is picked.
/// - A strictly larger face always takes over.
/// - Otherwise a face starting within one box size of the tracked one
///   continues the track at its new position.
/// - An empty detection list drops the track.
#[derive(Debug, Clone, Default)]
pub struct FaceTracker {
    tracked: Option<FaceBox>,
}

impl FaceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one frame's detections and return the face to follow.
    ///
    /// When faces are present but none continues the track, the last
    /// tracked box is kept.
    pub fn update(&mut self, faces: &[FaceBox]) -> Option<FaceBox> {
        if faces.is_empty() {
            self.tracked = None;
            return None;
        }

        let mut tracked = match self.tracked {
            Some(face) => face,
            None => largest(faces)?,
        };

        for face in faces {
            if face.area() > tracked.area() || tracked.is_near(face) {
                tracked = *face;
            }
        }

        self.tracked = Some(tracked);
        self.tracked
    }

    pub fn tracked(&self) -> Option<FaceBox> {
        self.tracked
    }
}

/// Largest face by area; the first one wins ties.
fn largest(faces: &[FaceBox]) -> Option<FaceBox> {
    faces.iter().copied().fold(None, |best, face| match best {
        Some(b) if b.area() >= face.area() => Some(b),
        _ => Some(face),
    })
}
