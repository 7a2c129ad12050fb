//! Progress tracking for a pipeline run

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Thread-safe progress tracker shared by all workers of a run
///
/// The `produced` counter only moves when a target was actually resized and
/// encoded, so it doubles as a count of real work done.
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressUpdate>,
    start_time: Mutex<Option<Instant>>,

    total: AtomicUsize,
    produced: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// Snapshot of the current progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub total_targets: usize,
    pub produced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_time: Duration,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        total_targets: usize,
    },
    TargetStarted {
        name: String,
    },
    TargetProduced {
        name: String,
        processing_time: Duration,
    },
    TargetSkipped {
        name: String,
    },
    TargetFailed {
        name: String,
        error: String,
    },
    Finished {
        final_state: ProgressState,
    },
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);

        Self {
            sender,
            start_time: Mutex::new(None),
            total: AtomicUsize::new(0),
            produced: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Start tracking a run, resetting every counter
    pub fn start(&self, total_targets: usize) {
        *self.start_time.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        self.total.store(total_targets, Ordering::Relaxed);
        self.produced.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);

        let _ = self.sender.send(ProgressUpdate::Started { total_targets });
        debug!("Started progress tracking for {} targets", total_targets);
    }

    /// A worker picked up a target
    pub fn start_target(&self, name: &str) {
        let _ = self.sender.send(ProgressUpdate::TargetStarted {
            name: name.to_string(),
        });
    }

    /// A target was resized, encoded and written
    pub fn target_produced(&self, name: &str, processing_time: Duration) {
        self.produced.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.send(ProgressUpdate::TargetProduced {
            name: name.to_string(),
            processing_time,
        });
    }

    /// A target was already marked in the cache
    pub fn target_skipped(&self, name: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.send(ProgressUpdate::TargetSkipped {
            name: name.to_string(),
        });
    }

    /// A target failed to resize or encode
    pub fn target_failed(&self, name: &str, error: String) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.send(ProgressUpdate::TargetFailed {
            name: name.to_string(),
            error,
        });
    }

    /// Mark the run as finished
    pub fn finish(&self) {
        let final_state = self.get_state();

        info!(
            "Run finished: {} produced, {} cached, {} failed of {} targets in {:.2}s",
            final_state.produced,
            final_state.skipped,
            final_state.failed,
            final_state.total_targets,
            final_state.elapsed_time.as_secs_f64()
        );

        let _ = self.sender.send(ProgressUpdate::Finished { final_state });
    }

    /// Get current progress state
    pub fn get_state(&self) -> ProgressState {
        let elapsed_time = self
            .start_time
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|start| start.elapsed())
            .unwrap_or_default();

        ProgressState {
            total_targets: self.total.load(Ordering::Relaxed),
            produced: self.produced.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed_time,
        }
    }

    /// Number of targets actually resized and encoded
    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::Relaxed)
    }

    /// Number of cache hits
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Number of failed targets
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
