//! Stabilizer session state

use serde::{Deserialize, Serialize};

use crate::types::Emotion;
use crate::DEFAULT_CONFIDENCE;

/// Running state for one detection session
///
/// Owned by exactly one session; create at session start, drop at session end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizerState {
    /// Label currently on screen
    pub last_emotion: Emotion,
    /// Underlying confidence for that label, within [0, 1]
    pub last_confidence: f64,
    /// Frames processed this session
    pub frame_counter: u64,
    /// Consecutive-absence score gating `no-face`
    pub no_face_streak: u32,
    /// Frame at which the current warm-up began
    pub warmup_origin: u64,
}

impl Default for StabilizerState {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilizerState {
    /// Fresh session state
    pub fn new() -> Self {
        Self {
            last_emotion: Emotion::Neutral,
            last_confidence: DEFAULT_CONFIDENCE,
            frame_counter: 0,
            no_face_streak: 0,
            warmup_origin: 0,
        }
    }

    /// Frames since the current warm-up began
    pub fn warmup_progress(&self) -> u64 {
        self.frame_counter.saturating_sub(self.warmup_origin)
    }
}
