//! Error types

use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by a signal source.
///
/// Caught at the frame-loop boundary; never reaches the stabilizer.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Failed to load model assets: {0}")]
    AssetLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
