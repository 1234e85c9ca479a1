// src/client/progress.rs

use std::sync::atomic::{AtomicU64, Ordering};

/// Page-level progress bar driven by the navigation guard.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self);
    fn done(&self);
}

/// Progress reported through tracing.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressIndicator for TracingProgress {
    fn start(&self) {
        tracing::trace!("Navigation started");
    }

    fn done(&self) {
        tracing::trace!("Navigation finished");
    }
}

/// Counts start/done signals. A UI polls `in_flight` to decide whether the
/// bar is visible.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    started: AtomicU64,
    finished: AtomicU64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> u64 {
        self.started().saturating_sub(self.finished())
    }
}

impl ProgressIndicator for ProgressCounter {
    fn start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}
