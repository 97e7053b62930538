//! Synthetic signal source for demo and test mode
//!
//! Fakes a detector: occasional Bernoulli failures, a periodic dropout
//! window, and an optional emptiness gate on supplied frames.

use async_trait::async_trait;

use crate::core::emptiness::EmptinessDetector;
use crate::core::random::{random_source, RandomSource};
use crate::core::source::SignalSource;
use crate::error::SourceError;
use crate::types::{Distribution, FrameBuffer, RawSignal, SyntheticConfig};

/// Pseudo-random stand-in for an expression detector
pub struct SyntheticSource {
    config: SyntheticConfig,
    emptiness: Option<EmptinessDetector>,
    rng: Box<dyn RandomSource>,
    counter: u64,
}

impl std::fmt::Debug for SyntheticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticSource")
            .field("config", &self.config)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, rng: Box<dyn RandomSource>) -> Self {
        let emptiness = config.emptiness.clone().map(EmptinessDetector::new);
        Self {
            config,
            emptiness,
            rng,
            counter: 0,
        }
    }

    pub fn seeded(config: SyntheticConfig, seed: Option<u64>) -> Self {
        Self::new(config, random_source(seed))
    }

    /// Frames sampled so far
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Is the simulated detector dropout active for this counter value?
    pub fn in_dropout(&self, counter: u64) -> bool {
        self.config.dropout_period > 0 && counter % self.config.dropout_period < self.config.dropout_window
    }

    /// Produce the next signal synchronously
    pub fn next_signal(&mut self, frame: Option<&FrameBuffer>) -> RawSignal {
        self.counter += 1;

        if self.in_dropout(self.counter) {
            return RawSignal::no_face();
        }

        if let (Some(detector), Some(frame)) = (&self.emptiness, frame) {
            if detector.is_empty(frame) {
                return RawSignal::no_face();
            }
        }

        if self.rng.next_unit() < self.config.failure_probability {
            return RawSignal::no_face();
        }

        if self.config.emit_distribution {
            RawSignal::with_distribution(Distribution::from_weights(self.config.prior))
        } else {
            RawSignal::face()
        }
    }
}

#[async_trait]
impl SignalSource for SyntheticSource {
    async fn sample(&mut self, frame: Option<&FrameBuffer>) -> Result<RawSignal, SourceError> {
        Ok(self.next_signal(frame))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
