//! Fetch strategies
//!
//! Both strategies share the same shape: one discovery step whose failure
//! ends the run ([`PipelineError`](crate::error::PipelineError)), then a lazy
//! [`FetchRun`] that fetches one candidate per `next()` call. Candidates
//! that fail are reported to the diagnostic sink and skipped.
//!
//! - [`IncrementalPipeline`]: change log + cutoff
//! - [`SnapshotPipeline`]: directory listing + pattern

pub mod incremental;
pub mod snapshot;

pub use incremental::IncrementalPipeline;
pub use snapshot::SnapshotPipeline;

use crate::decode::{strip_extension, Content};
use crate::diagnostics::DiagnosticSink;
use crate::fetch::Fetch;
use crate::file_name_of;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One successfully fetched and decoded resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedResource {
    /// Position in the emitted sequence, from 0
    pub index: usize,
    /// File name without its last extension
    pub base_name: String,
    pub url: String,
    pub content: Content,
}

/// Forward-only sequence of fetched resources
///
/// Nothing is fetched until `next()` is called. Dropping the run stops
/// further fetches; a fetch already in progress always completes first
/// since calls block.
pub struct FetchRun<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    targets: std::vec::IntoIter<String>,
    sink: Arc<dyn DiagnosticSink>,
    emitted: usize,
    skipped: usize,
}

impl<'a, F: Fetch + ?Sized> FetchRun<'a, F> {
    pub(crate) fn new(fetcher: &'a F, targets: Vec<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            fetcher,
            targets: targets.into_iter(),
            sink,
            emitted: 0,
            skipped: 0,
        }
    }

    /// Candidates not yet attempted
    pub fn remaining(&self) -> usize {
        self.targets.len()
    }

    /// Candidates that failed so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<F: Fetch + ?Sized> Iterator for FetchRun<'_, F> {
    type Item = FetchedResource;

    fn next(&mut self) -> Option<Self::Item> {
        for url in self.targets.by_ref() {
            match self.fetcher.fetch(&url) {
                Ok(content) => {
                    let resource = FetchedResource {
                        index: self.emitted,
                        base_name: strip_extension(file_name_of(&url)).to_string(),
                        url,
                        content,
                    };
                    self.emitted += 1;
                    debug!(index = resource.index, name = %resource.base_name, "Emitting resource");
                    return Some(resource);
                },
                Err(err) => {
                    self.skipped += 1;
                    self.sink.report(&url, &err);
                },
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.targets.len()))
    }
}
