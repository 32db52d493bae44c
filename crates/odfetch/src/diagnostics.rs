//! Diagnostic sinks
//!
//! Components that skip a candidate (a resource that failed to fetch or
//! decode, a change-log line that did not parse) report it to the sink they
//! were constructed with and carry on.

use crate::error::{ErrorKind, FetchError};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receiver for per-item diagnostics
pub trait DiagnosticSink: Send + Sync {
    /// Report that `subject` (a URL, a file name, a log line) was skipped
    fn report(&self, subject: &str, error: &FetchError);
}

/// Discards every diagnostic
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _subject: &str, _error: &FetchError) {}
}

/// Forwards diagnostics as `tracing` warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, subject: &str, error: &FetchError) {
        warn!(subject = %subject, kind = %error.kind(), error = %error, "Skipped");
    }
}

/// A reported diagnostic kept by [`CollectingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub subject: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Keeps every diagnostic in memory, optionally forwarding to another sink
#[derive(Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
    forward: Option<Arc<dyn DiagnosticSink>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect and also pass every diagnostic on to `inner`
    pub fn forwarding_to(inner: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            forward: Some(inner),
        }
    }

    /// Snapshot of everything reported so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.entries().into_iter().map(|d| d.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, subject: &str, error: &FetchError) {
        let diagnostic = Diagnostic {
            subject: subject.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
        if let Some(ref inner) = self.forward {
            inner.report(subject, error);
        }
    }
}

/// Shared no-op sink, the default for every component
pub fn noop() -> Arc<dyn DiagnosticSink> {
    Arc::new(NoopSink)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn unsupported() -> FetchError {
        FetchError::UnsupportedFormat {
            name: "obs.bin".to_string(),
            extension: ".bin".to_string(),
        }
    }

    #[test]
    fn test_collecting_sink_records_kind_and_subject() {
        let sink = CollectingSink::new();
        sink.report("https://example.org/obs.bin", &unsupported());

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject, "https://example.org/obs.bin");
        assert_eq!(entries[0].kind, ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_collecting_sink_forwards() {
        let inner = Arc::new(CollectingSink::new());
        let outer = CollectingSink::forwarding_to(inner.clone());
        outer.report("a", &unsupported());
        outer.report("b", &unsupported());

        assert_eq!(outer.len(), 2);
        assert_eq!(inner.len(), 2);
    }
}
