//! Change-log driven fetching of files changed since a cutoff

use super::FetchRun;
use crate::changelog::{ChangeLogResolver, SelectionCutoff};
use crate::config::{ChangeLogConfig, FetchConfig};
use crate::decode::{policy::decode_text, Content};
use crate::diagnostics::{self, DiagnosticSink};
use crate::error::PipelineError;
use crate::fetch::{Fetch, RemoteFetcher};
use crate::resolve_url;
use std::sync::Arc;
use tracing::info;

/// Fetches the change log, selects new entries, then fetches each of them
pub struct IncrementalPipeline<F: Fetch = RemoteFetcher> {
    fetcher: F,
    change_log_url: String,
    resolver: ChangeLogResolver,
    sink: Arc<dyn DiagnosticSink>,
}

impl IncrementalPipeline<RemoteFetcher> {
    /// Pipeline over the network with a [`RemoteFetcher`]
    pub fn new(config: &FetchConfig, log_config: &ChangeLogConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let fetcher = RemoteFetcher::new(config)?;
        Self::with_fetcher(fetcher, config, log_config)
    }
}

impl<F: Fetch> IncrementalPipeline<F> {
    pub fn with_fetcher(
        fetcher: F,
        config: &FetchConfig,
        log_config: &ChangeLogConfig,
    ) -> Result<Self, PipelineError> {
        log_config.validate()?;
        let resolver = ChangeLogResolver::new(config.base_url.clone(), &config.pattern)?;
        Ok(Self {
            fetcher,
            change_log_url: resolve_url(&config.base_url, &log_config.content_log_name),
            resolver,
            sink: diagnostics::noop(),
        })
    }

    /// Route per-item diagnostics (skipped lines and resources) to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.resolver = self.resolver.with_sink(sink.clone());
        self.sink = sink;
        self
    }

    pub fn change_log_url(&self) -> &str {
        &self.change_log_url
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch the change log and select the targets
    ///
    /// Failing to retrieve the change log ends the run here. The returned
    /// run fetches the selected files lazily.
    pub fn start(&self, cutoff: &SelectionCutoff) -> Result<FetchRun<'_, F>, PipelineError> {
        let log_text = self.fetch_change_log()?;
        info!(
            url = %self.change_log_url,
            "Change log has {} lines",
            log_text.lines().count()
        );

        let targets = self.resolver.resolve(&log_text, cutoff);
        Ok(FetchRun::new(&self.fetcher, targets, self.sink.clone()))
    }

    fn fetch_change_log(&self) -> Result<String, PipelineError> {
        let content = self
            .fetcher
            .fetch(&self.change_log_url)
            .map_err(|source| PipelineError::ChangeLogFetch {
                url: self.change_log_url.clone(),
                source,
            })?;

        match content {
            Content::Text(text) => Ok(text),
            Content::Bytes(bytes) => Ok(decode_text(bytes)),
            Content::Json(_) => Err(PipelineError::ChangeLogNotText {
                url: self.change_log_url.clone(),
            }),
        }
    }
}
