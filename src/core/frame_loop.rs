//! Frame loop: throttled sampling with at most one in-flight source call
//!
//! The loop owns the boundary between the (possibly slow, fallible) signal
//! source and the stabilizer. Source errors are logged and the frame is fed to
//! the stabilizer as "no face".

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::core::source::SignalSource;
use crate::core::stabilizer::Stabilizer;
use crate::types::{FrameBuffer, FrameReport, RawSignal};

/// What happened to one refresh tick
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Too soon after the last processed frame
    Throttled,
    /// A previous sample is still in flight; frame dropped
    Busy,
    /// Frame sampled and stabilized
    Processed(FrameReport),
}

impl TickOutcome {
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            TickOutcome::Processed(report) => Some(report),
            _ => None,
        }
    }
}

/// Drives one signal source and one stabilizer
pub struct FrameLoop<S> {
    source: Arc<Mutex<S>>,
    stabilizer: Stabilizer,
    min_interval: Duration,
    last_run: Option<Instant>,
    source_errors: u64,
    dropped: u64,
}

impl<S: SignalSource> FrameLoop<S> {
    pub fn new(source: S, stabilizer: Stabilizer, min_interval: Duration) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            stabilizer,
            min_interval,
            last_run: None,
            source_errors: 0,
            dropped: 0,
        }
    }

    /// Shared handle to the source (another task holding it makes ticks `Busy`)
    pub fn source_handle(&self) -> Arc<Mutex<S>> {
        self.source.clone()
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    /// Source failures seen this session
    pub fn source_errors(&self) -> u64 {
        self.source_errors
    }

    /// Frames dropped because a sample was in flight
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Handle one refresh tick at `now`
    pub async fn tick(&mut self, now: Instant, frame: Option<&FrameBuffer>) -> TickOutcome {
        if let Some(last) = self.last_run {
            if now.saturating_duration_since(last) < self.min_interval {
                return TickOutcome::Throttled;
            }
        }

        let Ok(mut source) = self.source.try_lock() else {
            self.dropped += 1;
            return TickOutcome::Busy;
        };
        self.last_run = Some(now);

        let signal = match source.sample(frame).await {
            Ok(signal) => signal,
            Err(e) => {
                self.source_errors += 1;
                warn!(source = source.name(), error = %e, "signal source failed, treating frame as no face");
                RawSignal::no_face()
            }
        };
        drop(source);

        TickOutcome::Processed(self.stabilizer.process(&signal))
    }

    /// Tick on a refresh timer until `max_frames` frames have been processed
    pub async fn run<F>(&mut self, refresh: Duration, max_frames: u64, mut on_report: F)
    where
        F: FnMut(&FrameReport),
    {
        let mut interval = tokio::time::interval(refresh);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut processed = 0;
        while processed < max_frames {
            let at = interval.tick().await;
            if let TickOutcome::Processed(report) = self.tick(at.into_std(), None).await {
                on_report(&report);
                processed += 1;
            }
        }
        debug!(processed, dropped = self.dropped, errors = self.source_errors, "frame loop finished");
    }

    /// Process `frames` frames on a virtual clock starting at `start`,
    /// one `min_interval` apart, without waiting
    pub async fn run_virtual<F>(&mut self, start: Instant, frames: u64, mut on_report: F)
    where
        F: FnMut(&FrameReport),
    {
        let mut at = start;
        for _ in 0..frames {
            if let TickOutcome::Processed(report) = self.tick(at, None).await {
                on_report(&report);
            }
            match at.checked_add(self.min_interval) {
                Some(next) => at = next,
                None => break,
            }
        }
    }

    /// Session over: discard stabilizer state
    pub fn end_session(&mut self) {
        self.stabilizer.reset();
        self.last_run = None;
    }
}
