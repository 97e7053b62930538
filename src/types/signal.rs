//! Raw per-frame signal structures

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::Emotion;

/// Probability per concrete emotion label
///
/// Keys outside the seven concrete labels, negative or non-finite values are
/// ignored when weights are read; values above 1 are capped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(BTreeMap<Emotion, f64>);

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from weights in `Emotion::LABELS` order
    pub fn from_weights(weights: [f64; 7]) -> Self {
        Emotion::LABELS.iter().copied().zip(weights).collect()
    }

    pub fn with(mut self, emotion: Emotion, probability: f64) -> Self {
        self.insert(emotion, probability);
        self
    }

    pub fn insert(&mut self, emotion: Emotion, probability: f64) {
        self.0.insert(emotion, probability);
    }

    /// Sanitized probability for one label (0 when missing or invalid)
    pub fn get(&self, emotion: Emotion) -> f64 {
        if !emotion.is_face() {
            return 0.0;
        }
        self.0
            .get(&emotion)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(|p| p.min(1.0))
            .unwrap_or(0.0)
    }

    /// Ordered (label, weight) pairs, sanitized
    pub fn weights(&self) -> [(Emotion, f64); 7] {
        Emotion::LABELS.map(|e| (e, self.get(e)))
    }

    /// Sum of sanitized probabilities
    pub fn total_mass(&self) -> f64 {
        self.weights().iter().map(|(_, w)| w).sum()
    }

    /// True when no label carries positive mass
    pub fn is_empty(&self) -> bool {
        self.total_mass() <= 0.0
    }

    /// Label with the highest probability (ties go to the earlier label)
    pub fn top(&self) -> Option<(Emotion, f64)> {
        self.weights()
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .fold(None, |best: Option<(Emotion, f64)>, (e, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((e, w)),
            })
    }
}

impl FromIterator<(Emotion, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (Emotion, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One frame's unprocessed face/emotion evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    /// Did the source find a face in this frame?
    pub face_found: bool,
    /// Expression probabilities. None with a face means "use the synthetic prior".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
}

impl RawSignal {
    /// Frame without a face
    pub fn no_face() -> Self {
        Self {
            face_found: false,
            distribution: None,
        }
    }

    /// Face found, no real distribution (stabilizer falls back to its prior)
    pub fn face() -> Self {
        Self {
            face_found: true,
            distribution: None,
        }
    }

    /// Face found with a real distribution
    pub fn with_distribution(distribution: Distribution) -> Self {
        Self {
            face_found: true,
            distribution: Some(distribution),
        }
    }

    /// Whether this frame should count as a tracked face.
    /// A supplied but empty distribution is treated as no face.
    pub fn has_face(&self) -> bool {
        self.face_found && self.distribution.as_ref().map_or(true, |d| !d.is_empty())
    }
}

/// Output of an expression detector for one face
///
/// Labels use the detector's own names; unknown ones are dropped on conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub expressions: HashMap<String, f64>,
}

impl Detection {
    pub fn new(expressions: HashMap<String, f64>) -> Self {
        Self { expressions }
    }

    /// Map detector labels onto the closed emotion set
    pub fn to_distribution(&self) -> Distribution {
        self.expressions
            .iter()
            .filter_map(|(label, p)| {
                Emotion::from_label(label)
                    .filter(Emotion::is_face)
                    .map(|e| (e, *p))
            })
            .collect()
    }
}

impl From<Option<Detection>> for RawSignal {
    fn from(detection: Option<Detection>) -> Self {
        match detection {
            Some(d) => RawSignal::with_distribution(d.to_distribution()),
            None => RawSignal::no_face(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_weights() {
        let d = Distribution::new()
            .with(Emotion::Happy, f64::NAN)
            .with(Emotion::Sad, -0.2)
            .with(Emotion::Angry, 1.7)
            .with(Emotion::NoFace, 0.9);
        assert_eq!(d.get(Emotion::Happy), 0.0);
        assert_eq!(d.get(Emotion::Sad), 0.0);
        assert_eq!(d.get(Emotion::Angry), 1.0);
        assert_eq!(d.get(Emotion::NoFace), 0.0);
        assert!((d.total_mass() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_distribution_means_no_face() {
        let signal = RawSignal::with_distribution(Distribution::new());
        assert!(signal.face_found);
        assert!(!signal.has_face());

        assert!(RawSignal::face().has_face());
        assert!(!RawSignal::no_face().has_face());
    }

    #[test]
    fn test_top_label() {
        let d = Distribution::new()
            .with(Emotion::Happy, 0.3)
            .with(Emotion::Neutral, 0.5);
        assert_eq!(d.top(), Some((Emotion::Neutral, 0.5)));
        assert_eq!(Distribution::new().top(), None);
    }

    #[test]
    fn test_detection_drops_unknown_labels() {
        let mut expressions = HashMap::new();
        expressions.insert("happy".to_string(), 0.6);
        expressions.insert("contempt".to_string(), 0.4);
        let d = Detection::new(expressions).to_distribution();
        assert_eq!(d.get(Emotion::Happy), 0.6);
        assert!((d.total_mass() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_raw_signal_json_shape() {
        let json = r#"{"face_found": true, "distribution": {"happy": 0.3, "neutral": 0.5}}"#;
        let signal: RawSignal = serde_json::from_str(json).unwrap();
        assert!(signal.has_face());
        assert_eq!(signal.distribution.unwrap().get(Emotion::Neutral), 0.5);

        let bare: RawSignal = serde_json::from_str(r#"{"face_found": false}"#).unwrap();
        assert_eq!(bare, RawSignal::no_face());
    }
}
