//! Emotion vocabulary

use serde::{Deserialize, Serialize};

/// Closed emotion label set plus the `no-face` sentinel.
///
/// Declaration order is the fixed label order used for cumulative
/// weighted sampling; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    Fearful,
    Disgusted,
    Neutral,
    /// No face currently tracked
    #[serde(rename = "no-face")]
    NoFace,
}

impl Emotion {
    /// The seven concrete labels in sampling order (excludes `NoFace`)
    pub const LABELS: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Surprised,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Neutral,
    ];

    /// Parse a detector label (`"happy"`, `"no-face"`, ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "angry" => Some(Emotion::Angry),
            "surprised" => Some(Emotion::Surprised),
            "fearful" => Some(Emotion::Fearful),
            "disgusted" => Some(Emotion::Disgusted),
            "neutral" => Some(Emotion::Neutral),
            "no-face" | "no_face" => Some(Emotion::NoFace),
            _ => None,
        }
    }

    /// Wire label
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Neutral => "neutral",
            Emotion::NoFace => "no-face",
        }
    }

    pub fn is_face(&self) -> bool {
        *self != Emotion::NoFace
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            Emotion::Happy => "\x1b[33m",     // Yellow
            Emotion::Sad => "\x1b[34m",       // Blue
            Emotion::Angry => "\x1b[31m",     // Red
            Emotion::Surprised => "\x1b[35m", // Magenta
            Emotion::Fearful => "\x1b[36m",   // Cyan
            Emotion::Disgusted => "\x1b[32m", // Green
            Emotion::Neutral => "\x1b[37m",   // White
            Emotion::NoFace => "\x1b[90m",    // Gray
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for emotion
    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Happy => "😄",
            Emotion::Sad => "😢",
            Emotion::Angry => "😠",
            Emotion::Surprised => "😲",
            Emotion::Fearful => "😨",
            Emotion::Disgusted => "🤢",
            Emotion::Neutral => "😐",
            Emotion::NoFace => "👤",
        }
    }

    /// Human-readable copy shown under the label
    pub fn description(&self) -> &'static str {
        match self {
            Emotion::Happy => "You're beaming with joy!",
            Emotion::Sad => "You seem a bit down.",
            Emotion::Angry => "You appear frustrated.",
            Emotion::Surprised => "You look astonished!",
            Emotion::Fearful => "You seem concerned.",
            Emotion::Disgusted => "You look displeased.",
            Emotion::Neutral => "You're looking calm and composed.",
            Emotion::NoFace => "No face detected. Move into the frame.",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
