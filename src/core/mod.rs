//! Core modules for Moodlock

pub mod api;
pub mod emptiness;
pub mod frame_loop;
pub mod model;
pub mod random;
pub mod source;
pub mod stabilizer;
pub mod synthetic;
pub mod weighted;

pub use api::{create_router, run_server};
pub use emptiness::{EmptinessDetector, EmptinessReport};
pub use frame_loop::{FrameLoop, TickOutcome};
pub use model::{top_expression, AssetLoader, ExpressionDetector, ModelSignalSource, ReplayDetector};
pub use random::{random_source, RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
pub use source::SignalSource;
pub use stabilizer::{process, Stabilizer, Step};
pub use synthetic::SyntheticSource;
pub use weighted::{apply_self_bias, weighted_choice};
