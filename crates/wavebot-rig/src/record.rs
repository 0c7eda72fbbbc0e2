//! Detection records read by the `wavebot` binary.
//!
//! The external detector writes one JSON object per frame:
//!
//! ```json
//! {"width": 320, "height": 240, "faces": [{"x": 160, "y": 80, "width": 40, "height": 40}]}
//! ```
//!
//! `width`/`height` may be omitted (the configured frame size is used) and
//! `faces` may be omitted or empty.

use serde::Deserialize;
use wavebot_models::{FaceBox, FrameSize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionRecord {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub faces: Vec<FaceBox>,
}

impl DetectionRecord {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    /// Frame size of this record, falling back per dimension.
    pub fn frame(&self, fallback: FrameSize) -> FrameSize {
        FrameSize::new(
            self.width.filter(|w| *w > 0).unwrap_or(fallback.width),
            self.height.filter(|h| *h > 0).unwrap_or(fallback.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let record = DetectionRecord::parse_line(
            r#"{"width":640,"height":480,"faces":[{"x":1,"y":2,"width":30,"height":40}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.frame(FrameSize::default()), FrameSize::new(640, 480));
        assert_eq!(record.faces, vec![FaceBox::new(1, 2, 30, 40)]);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let record = DetectionRecord::parse_line(r#"{"height":0}"#).unwrap().unwrap();
        assert!(record.faces.is_empty());
        assert_eq!(record.frame(FrameSize::new(320, 240)), FrameSize::new(320, 240));
    }

    #[test]
    fn test_blank_and_malformed_lines() {
        assert_eq!(DetectionRecord::parse_line("   ").unwrap(), None);
        assert!(DetectionRecord::parse_line("{not json").is_err());
        assert!(DetectionRecord::parse_line(r#"{"faces":[{"x":1}]}"#).is_err());
    }
}
