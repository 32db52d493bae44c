//! odfetch library
//!
//! Retrieval of files from open-data repositories (such as the DWD open-data
//! server) that publish a change log next to their files.
//!
//! # Overview
//!
//! Two strategies share one fetch-and-decode core:
//!
//! - **Incremental** ([`IncrementalPipeline`]): read the repository's change
//!   log, keep the entries matching a path pattern that changed after a
//!   cutoff, fetch each of them
//! - **Snapshot** ([`SnapshotPipeline`]): list the pattern's directory and
//!   fetch every matching file
//!
//! Each fetched file is decoded by extension ([`decode::coerce`]): archives
//! are unwrapped once, text is decoded, JSON is parsed, GRIB and unknown
//! formats stay bytes.
//!
//! # Example
//!
//! ```no_run
//! use odfetch::{ChangeLogConfig, FetchConfig, IncrementalPipeline};
//!
//! # fn main() -> Result<(), odfetch::PipelineError> {
//! let config = FetchConfig::builder()
//!     .base_url("https://opendata.dwd.de/weather/nwp")
//!     .pattern("icon-d2/grib/03/t_2m/.*_icosahedral_.*")
//!     .build();
//! let log_config = ChangeLogConfig::default();
//!
//! let pipeline = IncrementalPipeline::new(&config, &log_config)?;
//! for resource in pipeline.start(&log_config.cutoff(None))? {
//!     println!("{} {}", resource.index, resource.base_name);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod changelog;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod listing;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use changelog::{ChangeLogResolver, LogEntry, SelectionCutoff};
pub use config::{ChangeLogConfig, FetchConfig, FtpConfig};
pub use decode::{coerce, Content};
pub use diagnostics::{CollectingSink, DiagnosticSink, NoopSink, TracingSink};
pub use error::{ErrorKind, FetchError, PipelineError};
pub use fetch::{Fetch, RemoteFetcher};
pub use filter::{FilterMode, PatternFilter};
pub use listing::{DirectoryListing, FtpLister};
pub use output::ResourceWriter;
pub use pipeline::{FetchRun, FetchedResource, IncrementalPipeline, SnapshotPipeline};

/// Join a repository-relative `path` onto `base`
///
/// Exactly one `/` separates the two; a leading `./` on `path` is dropped.
pub fn resolve_url(base: &str, path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path).trim_start_matches('/');
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    format!("{}/{}", base, path)
}

/// Last path segment of `url`, ignoring any query or fragment
pub fn file_name_of(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = url[..end].trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}
