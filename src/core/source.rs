//! Signal source capability: frame in, raw signal out

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{FrameBuffer, RawSignal};

/// Produces one `RawSignal` per sampled frame.
///
/// Implementations may block on I/O or inference; the stabilizer never sees
/// that, it only receives the finished signal.
#[async_trait]
pub trait SignalSource: Send {
    /// Sample one frame. `None` means no pixels are available (synthetic mode).
    async fn sample(&mut self, frame: Option<&FrameBuffer>) -> Result<RawSignal, SourceError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
