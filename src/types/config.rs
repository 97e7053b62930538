//! Tunable policy parameters
//!
//! Thresholds differ between detection modes; none of them is a fixed
//! contract, so every value lives here rather than in the algorithm.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::ConfigError;
use crate::{
    CONFIDENCE_BASE_MIN, CONFIDENCE_BASE_SPAN, CONFIDENCE_JITTER, DISPLAY_CONFIDENCE_MAX,
    DISPLAY_CONFIDENCE_MIN, DROPOUT_PERIOD, DROPOUT_WINDOW, EMPTINESS_CONTRAST_DELTA,
    EMPTINESS_LUMA_THRESHOLD, EMPTINESS_MAX_SAMPLES, EMPTINESS_MIN_CONTRAST_FRACTION,
    FAILURE_PROBABILITY_AGGRESSIVE, FAILURE_PROBABILITY_LENIENT, GRACE_DECAY_STEP,
    MIN_FRAME_INTERVAL_MS, NO_FACE_STEP_AGGRESSIVE, NO_FACE_STEP_LENIENT,
    NO_FACE_THRESHOLD_AGGRESSIVE, NO_FACE_THRESHOLD_LENIENT, RECONSIDER_INTERVAL, SELF_BIAS,
    SYNTHETIC_PRIOR, WARMUP_FRAMES,
};

/// How the no-face streak shrinks when a face comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Streak drops straight to zero
    Reset,
    /// Streak drops by one per face frame
    Decrement,
}

/// Preset sensitivity to empty frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Slow to declare `no-face`, rare synthetic failures
    #[default]
    Lenient,
    /// Reacts to empty frames quickly
    Aggressive,
}

impl std::str::FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(format!("unknown mode '{}' (expected lenient|aggressive)", other)),
        }
    }
}

/// Stabilizer policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Frames of neutral placeholder at session start / re-acquisition
    pub warmup_frames: u64,
    /// Reconsider the label every K frames after warm-up
    pub reconsider_interval: u64,
    /// Weight bonus for the current label during re-selection
    pub self_bias: f64,
    /// Added to the streak per empty frame
    pub no_face_step: u32,
    /// Streak above this emits `no-face`
    pub no_face_threshold: u32,
    /// Confidence lost per grace frame
    pub decay_step: f64,
    pub recovery: RecoveryPolicy,
    /// Fresh confidence band after reconsideration
    pub base_confidence_min: f64,
    pub base_confidence_span: f64,
    /// ± per-frame noise on displayed confidence
    pub jitter: f64,
    /// Displayed confidence band for a tracked face
    pub display_min: f64,
    pub display_max: f64,
    /// Weights used when the signal carries no real distribution
    pub prior: [f64; 7],
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self::for_mode(DetectionMode::Lenient)
    }
}

impl StabilizerConfig {
    pub fn for_mode(mode: DetectionMode) -> Self {
        let (no_face_step, no_face_threshold) = match mode {
            DetectionMode::Lenient => (NO_FACE_STEP_LENIENT, NO_FACE_THRESHOLD_LENIENT),
            DetectionMode::Aggressive => (NO_FACE_STEP_AGGRESSIVE, NO_FACE_THRESHOLD_AGGRESSIVE),
        };
        Self {
            warmup_frames: WARMUP_FRAMES,
            reconsider_interval: RECONSIDER_INTERVAL,
            self_bias: SELF_BIAS,
            no_face_step,
            no_face_threshold,
            decay_step: GRACE_DECAY_STEP,
            recovery: RecoveryPolicy::Decrement,
            base_confidence_min: CONFIDENCE_BASE_MIN,
            base_confidence_span: CONFIDENCE_BASE_SPAN,
            jitter: CONFIDENCE_JITTER,
            display_min: DISPLAY_CONFIDENCE_MIN,
            display_max: DISPLAY_CONFIDENCE_MAX,
            prior: SYNTHETIC_PRIOR,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warmup_frames == 0 {
            return invalid("warmup_frames must be > 0");
        }
        if self.reconsider_interval == 0 {
            return invalid("reconsider_interval must be > 0");
        }
        if self.no_face_step == 0 {
            return invalid("no_face_step must be > 0");
        }
        if !(self.self_bias.is_finite() && self.self_bias >= 0.0) {
            return invalid("self_bias must be a non-negative number");
        }
        if !unit(self.decay_step) || !unit(self.jitter) {
            return invalid("decay_step and jitter must be within [0, 1]");
        }
        if !unit(self.base_confidence_min)
            || !unit(self.base_confidence_span)
            || self.base_confidence_min + self.base_confidence_span > 1.0
        {
            return invalid("base confidence band must lie within [0, 1]");
        }
        if !unit(self.display_min) || !unit(self.display_max) || self.display_min > self.display_max {
            return invalid("display band must satisfy 0 <= display_min <= display_max <= 1");
        }
        if self.prior.iter().any(|w| !w.is_finite() || *w < 0.0) || self.prior.iter().sum::<f64>() <= 0.0 {
            return invalid("prior weights must be non-negative with positive sum");
        }
        Ok(())
    }
}

/// Emptiness heuristic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmptinessConfig {
    pub max_samples: usize,
    pub luma_threshold: f64,
    pub contrast_delta: f64,
    /// Refined variant: also require some contrast
    pub check_contrast: bool,
    pub min_contrast_fraction: f64,
}

impl Default for EmptinessConfig {
    fn default() -> Self {
        Self {
            max_samples: EMPTINESS_MAX_SAMPLES,
            luma_threshold: EMPTINESS_LUMA_THRESHOLD,
            contrast_delta: EMPTINESS_CONTRAST_DELTA,
            check_contrast: false,
            min_contrast_fraction: EMPTINESS_MIN_CONTRAST_FRACTION,
        }
    }
}

impl EmptinessConfig {
    /// Luma and contrast checks
    pub fn refined() -> Self {
        Self {
            check_contrast: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_samples == 0 {
            return invalid("max_samples must be > 0");
        }
        if !unit(self.min_contrast_fraction) {
            return invalid("min_contrast_fraction must be within [0, 1]");
        }
        Ok(())
    }
}

/// Synthetic signal source parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Bernoulli probability that a frame reports no face
    pub failure_probability: f64,
    /// Forced dropout when counter % period < window (period 0 disables)
    pub dropout_period: u64,
    pub dropout_window: u64,
    /// Gate on the emptiness heuristic when a frame is supplied
    pub emptiness: Option<EmptinessConfig>,
    /// Emit the prior as a distribution instead of leaving it to the stabilizer
    pub emit_distribution: bool,
    pub prior: [f64; 7],
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self::for_mode(DetectionMode::Lenient)
    }
}

impl SyntheticConfig {
    pub fn for_mode(mode: DetectionMode) -> Self {
        match mode {
            DetectionMode::Lenient => Self {
                failure_probability: FAILURE_PROBABILITY_LENIENT,
                dropout_period: DROPOUT_PERIOD,
                dropout_window: DROPOUT_WINDOW,
                emptiness: Some(EmptinessConfig::default()),
                emit_distribution: false,
                prior: SYNTHETIC_PRIOR,
            },
            DetectionMode::Aggressive => Self {
                failure_probability: FAILURE_PROBABILITY_AGGRESSIVE,
                dropout_period: DROPOUT_PERIOD,
                dropout_window: DROPOUT_WINDOW * 2,
                emptiness: Some(EmptinessConfig::refined()),
                emit_distribution: false,
                prior: SYNTHETIC_PRIOR,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !unit(self.failure_probability) {
            return invalid("failure_probability must be within [0, 1]");
        }
        if self.dropout_period > 0 && self.dropout_window > self.dropout_period {
            return invalid("dropout_window must not exceed dropout_period");
        }
        if let Some(emptiness) = &self.emptiness {
            emptiness.validate()?;
        }
        Ok(())
    }
}

/// Everything a session needs, as stored in a config file.
///
/// Missing `stabilizer`/`synthetic` fields come from the preset of the
/// file's `mode`, not from the lenient defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SettingsFile")]
pub struct Settings {
    pub mode: DetectionMode,
    pub stabilizer: StabilizerConfig,
    pub synthetic: SyntheticConfig,
    /// Minimum interval between processed frames
    pub frame_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_mode(DetectionMode::Lenient)
    }
}

impl Settings {
    pub fn for_mode(mode: DetectionMode) -> Self {
        Self {
            mode,
            stabilizer: StabilizerConfig::for_mode(mode),
            synthetic: SyntheticConfig::for_mode(mode),
            frame_interval_ms: MIN_FRAME_INTERVAL_MS,
        }
    }

    /// Load settings from file, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stabilizer.validate()?;
        self.synthetic.validate()
    }

    /// Layer partial JSON overrides onto these settings
    pub fn with_overrides(
        mut self,
        stabilizer: Option<Value>,
        synthetic: Option<Value>,
    ) -> Result<Self, ConfigError> {
        if let Some(patch) = stabilizer {
            self.stabilizer = overlay(&self.stabilizer, patch)?;
        }
        if let Some(patch) = synthetic {
            self.synthetic = overlay(&self.synthetic, patch)?;
        }
        Ok(self)
    }
}

/// On-disk shape of `Settings`: sub-blocks stay raw until the mode is known
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    mode: DetectionMode,
    stabilizer: Option<Value>,
    synthetic: Option<Value>,
    frame_interval_ms: Option<u64>,
}

impl TryFrom<SettingsFile> for Settings {
    type Error = ConfigError;

    fn try_from(file: SettingsFile) -> Result<Self, Self::Error> {
        let mut settings =
            Settings::for_mode(file.mode).with_overrides(file.stabilizer, file.synthetic)?;
        if let Some(ms) = file.frame_interval_ms {
            settings.frame_interval_ms = ms;
        }
        Ok(settings)
    }
}

/// Deserialize `base` with the fields of `patch` merged over it
fn overlay<T: Serialize + DeserializeOwned>(base: &T, patch: Value) -> Result<T, ConfigError> {
    let mut merged = serde_json::to_value(base)?;
    merge(&mut merged, patch);
    Ok(serde_json::from_value(merged)?)
}

/// Recursive object merge; anything else in `patch` replaces the target
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn unit(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(msg.to_string()))
}
