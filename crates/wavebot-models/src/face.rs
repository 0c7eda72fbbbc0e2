//! Face detections in frame pixel space.

use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel coordinates of the frame origin used for offsets.
    #[inline]
    pub fn origin(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

/// Signed distance of a point from the frame origin.
///
/// `x` grows to the right of center, `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameOffset {
    pub x: i32,
    pub y: i32,
}

impl FrameOffset {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounding box of a detected face, in pixels of the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    /// Left edge x-coordinate
    pub x: i32,
    /// Top edge y-coordinate
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, rounded toward the top-left like integer pixel math.
    /// Saturates at the `i32` range for boxes at the edge of it.
    #[inline]
    pub fn center(&self) -> (i32, i32) {
        (
            saturate(i64::from(self.x) + i64::from(self.width / 2)),
            saturate(i64::from(self.y) + i64::from(self.height / 2)),
        )
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// Offset of the box center from the frame origin.
    pub fn offset_in(&self, frame: FrameSize) -> FrameOffset {
        let (cx, cy) = self.center();
        let (ox, oy) = frame.origin();
        FrameOffset::new(
            saturate(i64::from(cx) - i64::from(ox)),
            saturate(i64::from(oy) - i64::from(cy)),
        )
    }

    /// True when `other` starts within one box size of this one.
    pub fn is_near(&self, other: &FaceBox) -> bool {
        let dx = (i64::from(self.x) - i64::from(other.x)).abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).abs();
        dx <= i64::from(other.width) && dy <= i64::from(other.height)
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
