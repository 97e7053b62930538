//! Reason codes for stabilizer decisions

use serde::{Deserialize, Serialize};

/// Which branch of the stabilizer produced a frame's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // E001: Warm-up
    // =========================================================================
    /// Analyzing, neutral placeholder with ramping confidence
    E001_WARMING_UP,

    // =========================================================================
    // E002: Tracked face
    // =========================================================================
    /// Between reconsiderations, label unchanged
    E002_LABEL_HELD,
    /// Reconsideration frame, the label survived re-selection
    E002_LABEL_CONFIRMED,
    /// Reconsideration frame, a new label won
    E002_LABEL_CHANGED,

    // =========================================================================
    // E003: Missing face
    // =========================================================================
    /// Face missing but within the grace window
    E003_GRACE_PERIOD,
    /// Face missing past the debounce threshold
    E003_NO_FACE,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::E001_WARMING_UP => "E001_WARMING_UP",
            Self::E002_LABEL_HELD => "E002_LABEL_HELD",
            Self::E002_LABEL_CONFIRMED => "E002_LABEL_CONFIRMED",
            Self::E002_LABEL_CHANGED => "E002_LABEL_CHANGED",
            Self::E003_GRACE_PERIOD => "E003_GRACE_PERIOD",
            Self::E003_NO_FACE => "E003_NO_FACE",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::E001_WARMING_UP => "Analyzing expression",
            Self::E002_LABEL_HELD => "Holding current label",
            Self::E002_LABEL_CONFIRMED => "Label confirmed on re-evaluation",
            Self::E002_LABEL_CHANGED => "Label changed on re-evaluation",
            Self::E003_GRACE_PERIOD => "Face lost, holding last label",
            Self::E003_NO_FACE => "No face detected",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
