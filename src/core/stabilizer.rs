//! Emotion Stabilizer: per-frame state machine with warm-up, hysteresis and
//! no-face debounce
//!
//! Per frame:
//! - no face → grace period (last label, decaying confidence) until the
//!   streak passes the threshold, then `no-face`
//! - face, warm-up → neutral with confidence ramping 0.5 → 0.8
//! - face, every K frames → re-select the label with self-bias
//! - face, otherwise → hold the label, jitter the confidence

use tracing::debug;

use crate::core::random::{random_source, RandomSource};
use crate::core::weighted::{apply_self_bias, weighted_choice};
use crate::types::{
    clamp_unit, Distribution, Emotion, EmotionResult, FrameReport, RawSignal, ReasonCode,
    RecoveryPolicy, StabilizerConfig, StabilizerState,
};
use crate::{WARMUP_CONFIDENCE_SPAN, WARMUP_CONFIDENCE_START};

/// Result of one `process` call
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub result: EmotionResult,
    pub state: StabilizerState,
    pub reason: ReasonCode,
}

/// Advance the stabilizer by one frame.
///
/// Pure apart from the draws taken from `rng`: the previous state is not
/// modified, the updated one is returned in the `Step`.
pub fn process(
    state: &StabilizerState,
    signal: &RawSignal,
    config: &StabilizerConfig,
    rng: &mut dyn RandomSource,
) -> Step {
    let mut next = state.clone();
    next.frame_counter += 1;

    if !signal.has_face() {
        return process_missing(next, config);
    }

    next.no_face_streak = match config.recovery {
        RecoveryPolicy::Reset => 0,
        RecoveryPolicy::Decrement => next.no_face_streak.saturating_sub(1),
    };

    let progress = next.warmup_progress();
    let warmup = config.warmup_frames.max(1);
    if progress <= warmup {
        let ramp = progress as f64 / warmup as f64;
        let confidence = WARMUP_CONFIDENCE_START + ramp * WARMUP_CONFIDENCE_SPAN;
        return Step {
            result: EmotionResult::new(Emotion::Neutral, confidence, true),
            state: next,
            reason: ReasonCode::E001_WARMING_UP,
        };
    }

    let mut reason = ReasonCode::E002_LABEL_HELD;
    if progress % config.reconsider_interval.max(1) == 0 {
        let previous = next.last_emotion;
        let chosen = reconsider(previous, signal.distribution.as_ref(), config, rng);
        if chosen == previous {
            reason = ReasonCode::E002_LABEL_CONFIRMED;
        } else {
            reason = ReasonCode::E002_LABEL_CHANGED;
            debug!(frame = next.frame_counter, from = %previous, to = %chosen, "label changed");
        }
        next.last_emotion = chosen;
        next.last_confidence =
            clamp_unit(config.base_confidence_min + rng.next_unit() * config.base_confidence_span);
    }

    let noise = (rng.next_unit() * 2.0 - 1.0) * config.jitter;
    let displayed = clamp_display(next.last_confidence + noise, config);

    Step {
        result: EmotionResult::new(next.last_emotion, displayed, true),
        state: next,
        reason,
    }
}

fn process_missing(mut next: StabilizerState, config: &StabilizerConfig) -> Step {
    next.no_face_streak = next.no_face_streak.saturating_add(config.no_face_step);

    if next.no_face_streak > config.no_face_threshold {
        // re-acquisition starts a fresh warm-up
        next.warmup_origin = next.frame_counter;
        return Step {
            result: EmotionResult::no_face(),
            state: next,
            reason: ReasonCode::E003_NO_FACE,
        };
    }

    next.last_confidence = clamp_unit(next.last_confidence - config.decay_step);
    Step {
        result: EmotionResult::new(next.last_emotion, next.last_confidence, false),
        state: next,
        reason: ReasonCode::E003_GRACE_PERIOD,
    }
}

/// Clamp into the display band; a malformed band still yields a value in [0, 1]
fn clamp_display(value: f64, config: &StabilizerConfig) -> f64 {
    let (a, b) = (clamp_unit(config.display_min), clamp_unit(config.display_max));
    value.clamp(a.min(b), a.max(b))
}

/// Re-select the displayed label from the frame's weights plus self-bias
fn reconsider(
    current: Emotion,
    distribution: Option<&Distribution>,
    config: &StabilizerConfig,
    rng: &mut dyn RandomSource,
) -> Emotion {
    let weights = match distribution {
        Some(d) => d.weights(),
        None => Distribution::from_weights(config.prior).weights(),
    };
    let biased = apply_self_bias(&weights, current, config.self_bias);
    let draw = rng.next_unit();
    weighted_choice(&biased, draw).unwrap_or(current)
}

/// Stateful stabilizer for one detection session
pub struct Stabilizer {
    state: StabilizerState,
    config: StabilizerConfig,
    rng: Box<dyn RandomSource>,
    last: Option<FrameReport>,
}

impl std::fmt::Debug for Stabilizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stabilizer")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}

impl Stabilizer {
    /// Create a stabilizer drawing from the thread-local generator
    pub fn new(config: StabilizerConfig) -> Self {
        Self::with_random(config, random_source(None))
    }

    /// Create a reproducible stabilizer
    pub fn seeded(config: StabilizerConfig, seed: u64) -> Self {
        Self::with_random(config, random_source(Some(seed)))
    }

    /// Create with an injected random source
    pub fn with_random(config: StabilizerConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            state: StabilizerState::new(),
            config,
            rng,
            last: None,
        }
    }

    /// Process one frame's signal
    pub fn process(&mut self, signal: &RawSignal) -> FrameReport {
        let step = process(&self.state, signal, &self.config, self.rng.as_mut());
        self.state = step.state;
        let report = FrameReport::new(self.state.frame_counter, step.result, step.reason);
        self.last = Some(report.clone());
        report
    }

    /// Last emitted result, or the analyzing placeholder before the first frame
    pub fn current_result(&self) -> EmotionResult {
        self.last
            .as_ref()
            .map(|r| r.result)
            .unwrap_or_else(|| EmotionResult::new(Emotion::Neutral, 0.0, false))
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last.as_ref()
    }

    pub fn state(&self) -> &StabilizerState {
        &self.state
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn frame_counter(&self) -> u64 {
        self.state.frame_counter
    }

    /// Discard session state (camera stopped)
    pub fn reset(&mut self) {
        self.state = StabilizerState::new();
        self.last = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;

    fn config() -> StabilizerConfig {
        StabilizerConfig {
            no_face_threshold: 5,
            no_face_step: 1,
            ..StabilizerConfig::default()
        }
    }

    fn past_warmup(cfg: &StabilizerConfig, last: Emotion, confidence: f64) -> StabilizerState {
        StabilizerState {
            last_emotion: last,
            last_confidence: confidence,
            frame_counter: cfg.warmup_frames + 1,
            no_face_streak: 0,
            warmup_origin: 0,
        }
    }

    #[test]
    fn test_frame_counter_increments() {
        let cfg = config();
        let mut rng = ScriptedRandom::constant(0.5);
        let state = StabilizerState::new();
        let step = process(&state, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.state.frame_counter, 1);
        assert_eq!(state.frame_counter, 0);
        let step = process(&step.state, &RawSignal::no_face(), &cfg, &mut rng);
        assert_eq!(step.state.frame_counter, 2);
    }

    #[test]
    fn test_warmup_ramps_neutral() {
        let cfg = config();
        let mut rng = ScriptedRandom::constant(0.5);
        let mut state = StabilizerState::new();
        let mut prev = 0.0;
        for frame in 1..=cfg.warmup_frames {
            let step = process(&state, &RawSignal::face(), &cfg, &mut rng);
            assert_eq!(step.reason, ReasonCode::E001_WARMING_UP);
            assert_eq!(step.result.emotion, Emotion::Neutral);
            assert!(step.result.confidence > prev);
            let expected = 0.5 + (frame as f64 / cfg.warmup_frames as f64) * 0.3;
            assert!((step.result.confidence - expected).abs() < 1e-12);
            prev = step.result.confidence;
            state = step.state;
        }
        assert!((prev - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_grace_then_no_face() {
        let cfg = config();
        let mut rng = ScriptedRandom::constant(0.5);
        let mut state = past_warmup(&cfg, Emotion::Happy, 0.8);

        let mut prev = state.last_confidence;
        for _ in 0..cfg.no_face_threshold {
            let step = process(&state, &RawSignal::no_face(), &cfg, &mut rng);
            assert_eq!(step.reason, ReasonCode::E003_GRACE_PERIOD);
            assert_eq!(step.result.emotion, Emotion::Happy);
            assert!(!step.result.face_detected);
            assert!(step.result.confidence < prev);
            prev = step.result.confidence;
            state = step.state;
        }

        let step = process(&state, &RawSignal::no_face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E003_NO_FACE);
        assert_eq!(step.result, EmotionResult::no_face());
        // identity survives the no-face report
        assert_eq!(step.state.last_emotion, Emotion::Happy);
    }

    #[test]
    fn test_aggressive_step_counts_double() {
        let cfg = StabilizerConfig {
            no_face_step: 2,
            no_face_threshold: 3,
            ..StabilizerConfig::default()
        };
        let mut rng = ScriptedRandom::constant(0.5);
        let state = past_warmup(&cfg, Emotion::Sad, 0.8);
        let step = process(&state, &RawSignal::no_face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E003_GRACE_PERIOD);
        let step = process(&step.state, &RawSignal::no_face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E003_NO_FACE);
    }

    #[test]
    fn test_recovery_policies() {
        let mut rng = ScriptedRandom::constant(0.5);
        let mut state = past_warmup(&config(), Emotion::Happy, 0.8);
        state.no_face_streak = 4;

        let decrement = config();
        let step = process(&state, &RawSignal::face(), &decrement, &mut rng);
        assert_eq!(step.state.no_face_streak, 3);

        let reset = StabilizerConfig {
            recovery: RecoveryPolicy::Reset,
            ..config()
        };
        let step = process(&state, &RawSignal::face(), &reset, &mut rng);
        assert_eq!(step.state.no_face_streak, 0);
    }

    #[test]
    fn test_no_face_restarts_warmup() {
        let cfg = config();
        let mut rng = ScriptedRandom::constant(0.5);
        let mut state = past_warmup(&cfg, Emotion::Angry, 0.9);
        state.no_face_streak = cfg.no_face_threshold;

        let step = process(&state, &RawSignal::no_face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E003_NO_FACE);

        let step = process(&step.state, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E001_WARMING_UP);
        assert!(step.result.confidence < 0.55);
    }

    #[test]
    fn test_held_frames_only_jitter() {
        let cfg = config();
        let mut rng = ScriptedRandom::new(vec![0.0, 1.0]);
        let mut state = past_warmup(&cfg, Emotion::Surprised, 0.8);
        state.frame_counter = cfg.warmup_frames + 2;

        let step = process(&state, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E002_LABEL_HELD);
        assert_eq!(step.result.emotion, Emotion::Surprised);
        assert!((step.result.confidence - 0.775).abs() < 1e-9);
        assert_eq!(step.state.last_confidence, 0.8);

        let step = process(&step.state, &RawSignal::face(), &cfg, &mut rng);
        assert!((step.result.confidence - 0.825).abs() < 1e-6);
    }

    #[test]
    fn test_jitter_stays_in_display_band() {
        let cfg = config();
        let mut rng = ScriptedRandom::new(vec![0.0, 0.999]);
        let low = past_warmup(&cfg, Emotion::Neutral, 0.2);
        let step = process(&low, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.result.confidence, cfg.display_min);

        let high = past_warmup(&cfg, Emotion::Neutral, 1.0);
        let step = process(&high, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.result.confidence, cfg.display_max);
    }

    #[test]
    fn test_inverted_display_band_does_not_panic() {
        let cfg = StabilizerConfig {
            display_min: 0.9,
            display_max: 0.5,
            ..config()
        };
        let mut rng = ScriptedRandom::constant(0.5);
        let state = past_warmup(&cfg, Emotion::Happy, 0.95);
        let step = process(&state, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.result.confidence, 0.9);

        let nan_band = StabilizerConfig {
            display_min: f64::NAN,
            display_max: f64::NAN,
            ..config()
        };
        let step = process(&state, &RawSignal::face(), &nan_band, &mut rng);
        assert!((0.0..=1.0).contains(&step.result.confidence));
    }

    #[test]
    fn test_reconsideration_self_bias_holds_label() {
        let cfg = config();
        let mut state = past_warmup(&cfg, Emotion::Happy, 0.8);
        state.frame_counter = cfg.reconsider_interval - 1;

        let dist = Distribution::new()
            .with(Emotion::Happy, 0.3)
            .with(Emotion::Neutral, 0.5)
            .with(Emotion::Sad, 0.2);
        // happy's biased share is 0.8 / 1.5 = 0.533
        let mut rng = ScriptedRandom::new(vec![0.5, 0.4, 0.5]);
        let step = process(&state, &RawSignal::with_distribution(dist), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E002_LABEL_CONFIRMED);
        assert_eq!(step.result.emotion, Emotion::Happy);
        assert!((step.state.last_confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_reconsideration_can_change_label() {
        let cfg = config();
        let mut state = past_warmup(&cfg, Emotion::Happy, 0.8);
        state.frame_counter = cfg.reconsider_interval - 1;

        let dist = Distribution::new().with(Emotion::Angry, 1.0);
        let mut rng = ScriptedRandom::new(vec![0.9, 0.0, 0.5]);
        let step = process(&state, &RawSignal::with_distribution(dist), &cfg, &mut rng);
        assert_eq!(step.reason, ReasonCode::E002_LABEL_CHANGED);
        assert_eq!(step.state.last_emotion, Emotion::Angry);
        assert!((step.state.last_confidence - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_reconsideration_uses_prior_without_distribution() {
        let cfg = StabilizerConfig {
            prior: [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            self_bias: 0.0,
            ..config()
        };
        let mut state = past_warmup(&cfg, Emotion::Happy, 0.8);
        state.frame_counter = cfg.reconsider_interval - 1;
        let mut rng = ScriptedRandom::constant(0.3);
        let step = process(&state, &RawSignal::face(), &cfg, &mut rng);
        assert_eq!(step.state.last_emotion, Emotion::Disgusted);
    }

    #[test]
    fn test_empty_distribution_counts_as_missing() {
        let cfg = config();
        let mut rng = ScriptedRandom::constant(0.5);
        let state = past_warmup(&cfg, Emotion::Happy, 0.8);
        let step = process(
            &state,
            &RawSignal::with_distribution(Distribution::new()),
            &cfg,
            &mut rng,
        );
        assert_eq!(step.reason, ReasonCode::E003_GRACE_PERIOD);
        assert_eq!(step.state.no_face_streak, 1);
    }

    #[test]
    fn test_engine_tracks_state_and_reset() {
        let mut engine = Stabilizer::with_random(config(), Box::new(ScriptedRandom::constant(0.5)));
        assert_eq!(engine.current_result().emotion, Emotion::Neutral);
        let report = engine.process(&RawSignal::face());
        assert_eq!(report.frame, 1);
        assert_eq!(engine.current_result(), report.result);

        engine.reset();
        assert_eq!(engine.frame_counter(), 0);
        assert!(engine.last_report().is_none());
    }
}
