//! Core types for Moodlock

mod config;
mod emotion;
mod frame;
mod output;
mod reason;
mod signal;
mod state;

pub use config::{DetectionMode, EmptinessConfig, RecoveryPolicy, Settings, StabilizerConfig, SyntheticConfig};
pub use emotion::Emotion;
pub use frame::FrameBuffer;
pub use output::{clamp_unit, format_confidence, EmotionResult, FrameReport};
pub use reason::ReasonCode;
pub use signal::{Detection, Distribution, RawSignal};
pub use state::StabilizerState;
