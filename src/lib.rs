//! Moodlock: temporal emotion-state estimator
//!
//! Raw per-frame signal (face found + expression distribution) → Stabilizer →
//! temporally stable (emotion, confidence, face_detected) for display.

pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// STABILIZER DEFAULTS
// =============================================================================

/// Confidence reported before any label has been committed
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Frames of "analyzing" before the first label is committed
pub const WARMUP_FRAMES: u64 = 20;

/// Warm-up confidence ramp: starts here...
pub const WARMUP_CONFIDENCE_START: f64 = 0.5;

/// ...and climbs by this much over the warm-up window (ends at 0.8)
pub const WARMUP_CONFIDENCE_SPAN: f64 = 0.3;

/// Reconsider the displayed label only every K frames
pub const RECONSIDER_INTERVAL: u64 = 30;

/// Weight bonus for the label currently on screen
pub const SELF_BIAS: f64 = 0.5;

/// Fresh confidence after reconsideration: BASE_MIN + u * BASE_SPAN
pub const CONFIDENCE_BASE_MIN: f64 = 0.70;
pub const CONFIDENCE_BASE_SPAN: f64 = 0.25;

/// Per-frame confidence noise amplitude (±)
pub const CONFIDENCE_JITTER: f64 = 0.025;

/// Displayed confidence band for a tracked face
pub const DISPLAY_CONFIDENCE_MIN: f64 = 0.65;
pub const DISPLAY_CONFIDENCE_MAX: f64 = 0.98;

/// Confidence lost per grace frame while the face is missing
pub const GRACE_DECAY_STEP: f64 = 0.05;

// =============================================================================
// NO-FACE DEBOUNCE
// =============================================================================

/// Lenient mode: streak step and threshold
pub const NO_FACE_STEP_LENIENT: u32 = 1;
pub const NO_FACE_THRESHOLD_LENIENT: u32 = 10;

/// Aggressive mode: reacts faster to an empty frame
pub const NO_FACE_STEP_AGGRESSIVE: u32 = 2;
pub const NO_FACE_THRESHOLD_AGGRESSIVE: u32 = 3;

// =============================================================================
// SYNTHETIC SOURCE
// =============================================================================

/// Prior weights in label order: happy, sad, angry, surprised, fearful, disgusted, neutral
pub const SYNTHETIC_PRIOR: [f64; 7] = [0.25, 0.10, 0.10, 0.15, 0.05, 0.05, 0.30];

/// Detector failure probability per mode
pub const FAILURE_PROBABILITY_LENIENT: f64 = 0.05;
pub const FAILURE_PROBABILITY_AGGRESSIVE: f64 = 0.40;

/// Simulated detector dropout: frames where counter % PERIOD < WINDOW
pub const DROPOUT_PERIOD: u64 = 60;
pub const DROPOUT_WINDOW: u64 = 5;

// =============================================================================
// EMPTINESS HEURISTIC
// =============================================================================

/// Maximum pixels sampled per frame
pub const EMPTINESS_MAX_SAMPLES: usize = 1500;

/// Mean luma below this → frame considered dark/covered
pub const EMPTINESS_LUMA_THRESHOLD: f64 = 32.0;

/// Luma difference between consecutive samples counted as "contrast"
pub const EMPTINESS_CONTRAST_DELTA: f64 = 20.0;

/// Refined variant: minimum high-contrast sample fraction
pub const EMPTINESS_MIN_CONTRAST_FRACTION: f64 = 0.05;

// =============================================================================
// FRAME LOOP
// =============================================================================

/// Minimum interval between processed frames (milliseconds)
pub const MIN_FRAME_INTERVAL_MS: u64 = 100;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
