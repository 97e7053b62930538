//! Emptiness heuristic: is this frame likely blank or dark?
//!
//! A cheap proxy, not a detector. Only the synthetic source consults it.

use serde::{Deserialize, Serialize};

use crate::types::{EmptinessConfig, FrameBuffer};

/// Measurements behind an emptiness verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmptinessReport {
    /// Pixels actually sampled
    pub samples: usize,
    /// Mean (R+G+B)/3 over the samples, 0-255
    pub mean_luma: f64,
    /// Fraction of consecutive sample pairs whose luma differs by more than the delta
    pub contrast_fraction: f64,
    pub empty: bool,
}

/// Stride-sampled luma/contrast analyzer
#[derive(Debug, Clone, Default)]
pub struct EmptinessDetector {
    config: EmptinessConfig,
}

impl EmptinessDetector {
    pub fn new(config: EmptinessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmptinessConfig {
        &self.config
    }

    pub fn analyze(&self, frame: &FrameBuffer) -> EmptinessReport {
        let total = frame.pixel_count();
        if total == 0 {
            return EmptinessReport {
                samples: 0,
                mean_luma: 0.0,
                contrast_fraction: 0.0,
                empty: true,
            };
        }

        let stride = (total / self.config.max_samples.max(1)).max(1);
        let mut samples = 0usize;
        let mut luma_sum = 0.0;
        let mut high_contrast = 0usize;
        let mut prev: Option<f64> = None;

        for i in (0..total).step_by(stride).take(self.config.max_samples.max(1)) {
            let Some([r, g, b, _]) = frame.pixel(i) else {
                break;
            };
            let luma = (r as f64 + g as f64 + b as f64) / 3.0;
            if let Some(p) = prev {
                if (luma - p).abs() > self.config.contrast_delta {
                    high_contrast += 1;
                }
            }
            prev = Some(luma);
            luma_sum += luma;
            samples += 1;
        }

        let mean_luma = luma_sum / samples as f64;
        let pairs = samples.saturating_sub(1);
        let contrast_fraction = if pairs == 0 {
            0.0
        } else {
            high_contrast as f64 / pairs as f64
        };

        let dark = mean_luma < self.config.luma_threshold;
        let flat = self.config.check_contrast && contrast_fraction < self.config.min_contrast_fraction;

        EmptinessReport {
            samples,
            mean_luma,
            contrast_fraction,
            empty: dark || flat,
        }
    }

    pub fn is_empty(&self, frame: &FrameBuffer) -> bool {
        self.analyze(frame).empty
    }
}
