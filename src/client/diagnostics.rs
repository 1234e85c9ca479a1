// src/client/diagnostics.rs

//! Top-level sink for errors raised while rendering.

use std::{
    error::Error,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Forwards captured errors to an external collector.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn Error + 'static), info: &str);
}

#[derive(Default)]
pub struct ErrorSink {
    reporter: Option<Arc<dyn ErrorReporter>>,
    captured: AtomicU64,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            reporter: Some(reporter),
            captured: AtomicU64::new(0),
        }
    }

    /// Logs the error with its context and hands it to the reporter.
    /// Never panics, even when the reporter does.
    pub fn capture(&self, error: &(dyn Error + 'static), info: &str) {
        self.captured.fetch_add(1, Ordering::SeqCst);
        tracing::error!(error = %error, info = %info, "Render error");

        if let Some(reporter) = &self.reporter {
            let reported = catch_unwind(AssertUnwindSafe(|| reporter.report(error, info)));
            if reported.is_err() {
                tracing::warn!(info = %info, "Error reporter panicked");
            }
        }
    }

    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::SeqCst)
    }
}
