//! Real-signal adapter: expression detector → raw signal
//!
//! - `AssetLoader`: load-once, shared by concurrent callers
//! - `ExpressionDetector`: frame → optional detection
//! - `ModelSignalSource`: adapts any detector to `SignalSource`
//! - `ReplayDetector`: replays recorded detections from a JSON-lines file

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::core::source::SignalSource;
use crate::error::SourceError;
use crate::types::{Detection, EmotionResult, FrameBuffer, RawSignal};

/// One-time, idempotent asset load.
///
/// Concurrent callers before completion await the same in-flight load. A failed
/// load leaves the cell empty so the next caller retries.
#[derive(Debug)]
pub struct AssetLoader<T> {
    cell: OnceCell<Arc<T>>,
    attempts: AtomicUsize,
}

impl<T> Default for AssetLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetLoader<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Return the loaded assets, running `load` only if nothing is loaded yet
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<Arc<T>, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        self.cell
            .get_or_try_init(|| async {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                load().await.map(Arc::new)
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of load attempts actually started
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// External expression model: zero or one face per frame
#[async_trait]
pub trait ExpressionDetector: Send + Sync {
    async fn detect(&self, frame: Option<&FrameBuffer>) -> Result<Option<Detection>, SourceError>;
}

/// Signal source backed by an expression detector
#[derive(Debug)]
pub struct ModelSignalSource<D> {
    detector: D,
}

impl<D: ExpressionDetector> ModelSignalSource<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

#[async_trait]
impl<D: ExpressionDetector> SignalSource for ModelSignalSource<D> {
    async fn sample(&mut self, frame: Option<&FrameBuffer>) -> Result<RawSignal, SourceError> {
        let detection = self.detector.detect(frame).await?;
        Ok(RawSignal::from(detection))
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Unstabilized reading: the single most probable label of a detection
pub fn top_expression(detection: Option<&Detection>) -> EmotionResult {
    match detection.and_then(|d| d.to_distribution().top()) {
        Some((emotion, probability)) => EmotionResult::new(emotion, probability, true),
        None => EmotionResult::no_face(),
    }
}

/// Replays recorded detections, one JSON value per line (`null` = no face).
/// Loops back to the start after the last record.
#[derive(Debug)]
pub struct ReplayDetector {
    path: PathBuf,
    assets: AssetLoader<Vec<Option<Detection>>>,
    cursor: AtomicUsize,
}

impl ReplayDetector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            assets: AssetLoader::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load the recording now; returns the number of records
    pub async fn preload(&self) -> Result<usize, SourceError> {
        Ok(self.records().await?.len())
    }

    pub fn assets(&self) -> &AssetLoader<Vec<Option<Detection>>> {
        &self.assets
    }

    async fn records(&self) -> Result<Arc<Vec<Option<Detection>>>, SourceError> {
        let path = self.path.clone();
        self.assets.get_or_load(|| load_recording(path)).await
    }
}

#[async_trait]
impl ExpressionDetector for ReplayDetector {
    async fn detect(&self, _frame: Option<&FrameBuffer>) -> Result<Option<Detection>, SourceError> {
        let records = self.records().await?;
        let i = self.cursor.fetch_add(1, Ordering::SeqCst) % records.len();
        Ok(records[i].clone())
    }
}

async fn load_recording(path: PathBuf) -> Result<Vec<Option<Detection>>, SourceError> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| SourceError::AssetLoad(format!("{}: {}", path.display(), e)))?;
    let records = parse_recording(&path, &content)?;
    info!(path = %path.display(), records = records.len(), "replay recording loaded");
    Ok(records)
}

/// Parse JSON-lines detections; blank lines are skipped
pub fn parse_recording(path: &Path, content: &str) -> Result<Vec<Option<Detection>>, SourceError> {
    let records = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Option<Detection>>(line).map_err(|e| {
                SourceError::AssetLoad(format!("{}:{}: {}", path.display(), n + 1, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if records.is_empty() {
        return Err(SourceError::AssetLoad(format!(
            "{}: recording contains no detections",
            path.display()
        )));
    }
    Ok(records)
}
