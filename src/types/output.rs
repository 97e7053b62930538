//! Output structures for display

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Emotion, ReasonCode};

/// Stabilized, user-facing emotion reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub emotion: Emotion,
    /// Always within [0, 1], never NaN
    pub confidence: f64,
    pub face_detected: bool,
}

impl EmotionResult {
    /// Create a result; confidence is clamped into [0, 1] and NaN becomes 0
    pub fn new(emotion: Emotion, confidence: f64, face_detected: bool) -> Self {
        Self {
            emotion,
            confidence: clamp_unit(confidence),
            face_detected,
        }
    }

    /// The `no-face` reading
    pub fn no_face() -> Self {
        Self::new(Emotion::NoFace, 0.0, false)
    }

    /// Confidence as a whole percentage string
    pub fn confidence_display(&self) -> String {
        format_confidence(self.confidence)
    }
}

/// Clamp into [0, 1]; NaN maps to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Format a confidence for display. NaN, negative and missing values show as `0%`.
pub fn format_confidence(confidence: f64) -> String {
    let pct = (clamp_unit(confidence) * 100.0).round() as u32;
    format!("{}%", pct)
}

/// One processed frame, as reported to the CLI and API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Session frame counter after this frame
    pub frame: u64,
    /// Stabilized reading
    pub result: EmotionResult,
    /// Which branch produced it
    pub reason: ReasonCode,
}

impl FrameReport {
    pub fn new(frame: u64, result: EmotionResult, reason: ReasonCode) -> Self {
        Self {
            timestamp: Utc::now(),
            frame,
            result,
            reason,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let emotion = self.result.emotion;
        format!(
            "{}{} #{:<5} {:<9} {:>4} | face={} | {}{}",
            emotion.color_code(),
            emotion.emoji(),
            self.frame,
            emotion,
            self.result.confidence_display(),
            if self.result.face_detected { "yes" } else { "no" },
            self.reason.code(),
            Emotion::color_reset()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "frame={} | emotion={} | confidence={:.3} | face={} | reason={}",
            self.frame,
            self.result.emotion,
            self.result.confidence,
            self.result.face_detected,
            self.reason.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.876), "88%");
        assert_eq!(format_confidence(f64::NAN), "0%");
        assert_eq!(format_confidence(-0.3), "0%");
        assert_eq!(format_confidence(1.4), "100%");
    }

    #[test]
    fn test_result_clamps_confidence() {
        assert_eq!(EmotionResult::new(Emotion::Happy, f64::NAN, true).confidence, 0.0);
        assert_eq!(EmotionResult::new(Emotion::Happy, 2.0, true).confidence, 1.0);
        let none = EmotionResult::no_face();
        assert_eq!(none.emotion, Emotion::NoFace);
        assert!(!none.face_detected);
    }

    #[test]
    fn test_parseable_line() {
        let report = FrameReport::new(
            42,
            EmotionResult::new(Emotion::Sad, 0.8, true),
            ReasonCode::E002_LABEL_HELD,
        );
        let line = report.to_parseable_string();
        assert!(line.contains("frame=42"));
        assert!(line.contains("emotion=sad"));
        assert!(line.contains("reason=E002_LABEL_HELD"));
    }
}
