//! Integration tests for the stabilizer state machine
//!
//! Drives whole sessions frame by frame and checks the phases end to end:
//! warm-up, held labels, grace period, no-face and re-acquisition.

use moodlock::core::{process, ScriptedRandom, SeededRandom, Stabilizer};
use moodlock::types::{
    DetectionMode, Distribution, Emotion, FrameReport, RawSignal, ReasonCode, RecoveryPolicy,
    StabilizerConfig, StabilizerState,
};
use pretty_assertions::assert_eq;

fn config_with_threshold(threshold: u32) -> StabilizerConfig {
    StabilizerConfig {
        no_face_step: 1,
        no_face_threshold: threshold,
        ..StabilizerConfig::default()
    }
}

fn feed(stabilizer: &mut Stabilizer, signal: &RawSignal, frames: usize) -> Vec<FrameReport> {
    (0..frames).map(|_| stabilizer.process(signal)).collect()
}

#[test]
fn test_fresh_session_warms_up_on_neutral() {
    let mut stabilizer = Stabilizer::seeded(StabilizerConfig::default(), 1);
    let reports = feed(&mut stabilizer, &RawSignal::face(), 20);

    for r in &reports {
        assert_eq!(r.result.emotion, Emotion::Neutral);
        assert_eq!(r.reason, ReasonCode::E001_WARMING_UP);
        assert!(r.result.face_detected);
    }
    for pair in reports.windows(2) {
        assert!(pair[1].result.confidence > pair[0].result.confidence);
    }
    assert!((reports[0].result.confidence - 0.515).abs() < 1e-9);
    assert!((reports[19].result.confidence - 0.8).abs() < 1e-9);
}

#[test]
fn test_ten_missing_frames_grace_then_no_face() {
    let mut stabilizer = Stabilizer::seeded(config_with_threshold(5), 3);
    let reports = feed(&mut stabilizer, &RawSignal::no_face(), 10);

    // grace: last label, decaying confidence, face not detected
    for (i, r) in reports[..5].iter().enumerate() {
        assert_eq!(r.reason, ReasonCode::E003_GRACE_PERIOD);
        assert_eq!(r.result.emotion, Emotion::Neutral);
        assert!(!r.result.face_detected);
        let expected = 0.75 - 0.05 * (i as f64 + 1.0);
        assert!((r.result.confidence - expected).abs() < 1e-9);
    }
    for r in &reports[5..] {
        assert_eq!(r.reason, ReasonCode::E003_NO_FACE);
        assert_eq!(r.result.emotion, Emotion::NoFace);
        assert_eq!(r.result.confidence, 0.0);
        assert!(!r.result.face_detected);
    }
}

#[test]
fn test_face_returns_after_no_face_restarts_warm_up() {
    let mut stabilizer = Stabilizer::seeded(config_with_threshold(5), 9);
    feed(&mut stabilizer, &RawSignal::face(), 45);
    feed(&mut stabilizer, &RawSignal::no_face(), 10);
    assert_eq!(stabilizer.current_result().emotion, Emotion::NoFace);

    let back = stabilizer.process(&RawSignal::face());
    assert_eq!(back.reason, ReasonCode::E001_WARMING_UP);
    assert_eq!(back.result.emotion, Emotion::Neutral);
    assert!(back.result.face_detected);
    assert!((back.result.confidence - 0.515).abs() < 1e-9);
}

#[test]
fn test_brief_dropout_keeps_label_on_screen() {
    let config = config_with_threshold(5);
    let mut stabilizer = Stabilizer::with_random(config, Box::new(ScriptedRandom::constant(0.5)));
    feed(&mut stabilizer, &RawSignal::face(), 40);
    let shown = stabilizer.current_result().emotion;

    let reports = feed(&mut stabilizer, &RawSignal::no_face(), 3);
    for r in &reports {
        assert_eq!(r.result.emotion, shown);
        assert_eq!(r.reason, ReasonCode::E003_GRACE_PERIOD);
    }

    // still past warm-up: no neutral placeholder on return
    let back = stabilizer.process(&RawSignal::face());
    assert_ne!(back.reason, ReasonCode::E001_WARMING_UP);
    assert_eq!(back.result.emotion, shown);
}

#[test]
fn test_recovery_policies_differ_after_long_absence() {
    let decrement = StabilizerConfig {
        recovery: RecoveryPolicy::Decrement,
        ..config_with_threshold(5)
    };
    let reset = StabilizerConfig {
        recovery: RecoveryPolicy::Reset,
        ..config_with_threshold(5)
    };

    let mut slow = Stabilizer::seeded(decrement, 5);
    let mut fast = Stabilizer::seeded(reset, 5);
    for s in [&mut slow, &mut fast] {
        feed(s, &RawSignal::no_face(), 10);
        s.process(&RawSignal::face());
    }

    // one more missing frame: decrement still remembers the long absence
    assert_eq!(slow.process(&RawSignal::no_face()).reason, ReasonCode::E003_NO_FACE);
    assert_eq!(fast.process(&RawSignal::no_face()).reason, ReasonCode::E003_GRACE_PERIOD);
}

#[test]
fn test_label_changes_only_on_reconsideration_frames() {
    let config = StabilizerConfig::default();
    let mut stabilizer = Stabilizer::with_random(config, Box::new(ScriptedRandom::constant(0.1)));
    let happy = RawSignal::with_distribution(Distribution::new().with(Emotion::Happy, 1.0));
    let reports = feed(&mut stabilizer, &happy, 60);

    // frames 21..29 hold the placeholder label
    for r in &reports[20..29] {
        assert_eq!(r.reason, ReasonCode::E002_LABEL_HELD);
        assert_eq!(r.result.emotion, Emotion::Neutral);
    }
    assert_eq!(reports[29].frame, 30);
    assert_eq!(reports[29].reason, ReasonCode::E002_LABEL_CHANGED);
    assert_eq!(reports[29].result.emotion, Emotion::Happy);
    for r in &reports[30..59] {
        assert_eq!(r.reason, ReasonCode::E002_LABEL_HELD);
        assert_eq!(r.result.emotion, Emotion::Happy);
    }
    assert_eq!(reports[59].reason, ReasonCode::E002_LABEL_CONFIRMED);
}

#[test]
fn test_self_bias_makes_label_sticky() {
    let config = StabilizerConfig {
        self_bias: 2.0,
        ..StabilizerConfig::default()
    };
    let mut stabilizer = Stabilizer::seeded(config, 2024);
    let reports = feed(&mut stabilizer, &RawSignal::face(), 20 + 30 * 200);

    let confirmed = reports.iter().filter(|r| r.reason == ReasonCode::E002_LABEL_CONFIRMED).count();
    let changed = reports.iter().filter(|r| r.reason == ReasonCode::E002_LABEL_CHANGED).count();
    assert_eq!(confirmed + changed, 200);
    assert!(confirmed > changed, "confirmed={} changed={}", confirmed, changed);
}

#[test]
fn test_happy_mostly_survives_neutral_leaning_frame() {
    let state = StabilizerState {
        last_emotion: Emotion::Happy,
        last_confidence: 0.8,
        frame_counter: 29,
        no_face_streak: 0,
        warmup_origin: 0,
    };
    let signal = RawSignal::with_distribution(
        Distribution::new().with(Emotion::Happy, 0.3).with(Emotion::Neutral, 0.5),
    );
    let config = StabilizerConfig::default();

    let mut kept = 0;
    let mut to_neutral = 0;
    for seed in 0..2000 {
        let step = process(&state, &signal, &config, &mut SeededRandom::new(seed));
        assert_eq!(step.state.frame_counter, 30);
        match step.result.emotion {
            Emotion::Happy => kept += 1,
            Emotion::Neutral => to_neutral += 1,
            other => panic!("unexpected label {}", other),
        }
    }
    assert!(kept > to_neutral);
    assert!(kept > 1100, "kept={}", kept);
}

#[test]
fn test_tracked_confidence_stays_in_display_band() {
    let mut stabilizer = Stabilizer::seeded(StabilizerConfig::default(), 77);
    let reports = feed(&mut stabilizer, &RawSignal::face(), 500);
    for r in &reports[20..] {
        assert!(r.result.confidence >= 0.65 && r.result.confidence <= 0.98);
        assert_ne!(r.result.emotion, Emotion::NoFace);
    }
}

#[test]
fn test_unvalidated_config_runs_past_warm_up() {
    let config = StabilizerConfig {
        display_min: 0.9,
        display_max: 0.5,
        warmup_frames: 1,
        ..StabilizerConfig::default()
    };
    let mut stabilizer = Stabilizer::seeded(config, 12);
    let reports = feed(&mut stabilizer, &RawSignal::face(), 3);
    for r in &reports[1..] {
        assert!(r.result.confidence >= 0.5 && r.result.confidence <= 0.9);
    }
}

#[test]
fn test_aggressive_mode_reacts_within_two_frames() {
    let mut stabilizer = Stabilizer::seeded(StabilizerConfig::for_mode(DetectionMode::Aggressive), 4);
    let reports = feed(&mut stabilizer, &RawSignal::no_face(), 2);
    assert_eq!(reports[0].reason, ReasonCode::E003_GRACE_PERIOD);
    assert_eq!(reports[1].reason, ReasonCode::E003_NO_FACE);
}

#[test]
fn test_empty_distribution_counts_as_missing_face() {
    let mut stabilizer = Stabilizer::seeded(config_with_threshold(0), 8);
    let report = stabilizer.process(&RawSignal::with_distribution(Distribution::new()));
    assert_eq!(report.result.emotion, Emotion::NoFace);
}

#[test]
fn test_reset_discards_session() {
    let mut stabilizer = Stabilizer::seeded(StabilizerConfig::default(), 6);
    feed(&mut stabilizer, &RawSignal::face(), 50);
    stabilizer.reset();
    assert_eq!(stabilizer.frame_counter(), 0);
    assert!(stabilizer.last_report().is_none());
    assert_eq!(stabilizer.process(&RawSignal::face()).reason, ReasonCode::E001_WARMING_UP);
}
