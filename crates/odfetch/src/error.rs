//! Error types for odfetch
//!
//! Two levels: [`FetchError`] describes a failure local to one candidate
//! (one resource, one change-log line) and never stops a run on its own.
//! [`PipelineError`] is a terminal outcome that leaves the candidate set
//! unknown, so the run ends before producing anything.

use thiserror::Error;

/// Result type alias for per-item operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Failure affecting a single resource or change-log line
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure (connect, TLS, read)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    /// FTP working directory could not be entered
    #[error("Cannot change to directory {path}: {message}")]
    Directory { path: String, message: String },

    /// Structured payload did not parse
    #[error("Parse error in {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Zip container holds more than one file
    #[error("Archive {name} holds {members} members, expected exactly one")]
    ArchiveAmbiguous { name: String, members: usize },

    #[error("Archive {name} holds no members")]
    EmptyArchive { name: String },

    #[error("Failed to decompress {name}: {message}")]
    Decompression { name: String, message: String },

    /// Format without a decoder
    #[error("Unsupported format '{extension}' for {name}")]
    UnsupportedFormat { name: String, extension: String },

    /// Change-log line that does not split into path|size|changed_at
    #[error("Malformed change-log line '{line}': {reason}")]
    LogLineMalformed { line: String, reason: String },
}

/// Fieldless classification of [`FetchError`], handy for summaries and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Io,
    Directory,
    Parse,
    ArchiveAmbiguous,
    Decompression,
    UnsupportedFormat,
    LogLineMalformed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Io => "io",
            ErrorKind::Directory => "directory",
            ErrorKind::Parse => "parse",
            ErrorKind::ArchiveAmbiguous => "archive_ambiguous",
            ErrorKind::Decompression => "decompression",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::LogLineMalformed => "log_line_malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network { .. }
            | FetchError::HttpStatus { .. }
            | FetchError::InvalidUrl(_)
            | FetchError::UnsupportedScheme { .. } => ErrorKind::Network,
            FetchError::Io { .. } => ErrorKind::Io,
            FetchError::Directory { .. } => ErrorKind::Directory,
            FetchError::Parse { .. } => ErrorKind::Parse,
            FetchError::ArchiveAmbiguous { .. } => ErrorKind::ArchiveAmbiguous,
            FetchError::EmptyArchive { .. } | FetchError::Decompression { .. } => {
                ErrorKind::Decompression
            },
            FetchError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            FetchError::LogLineMalformed { .. } => ErrorKind::LogLineMalformed,
        }
    }

    pub(crate) fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn decompression(name: &str, err: impl std::fmt::Display) -> Self {
        Self::Decompression {
            name: name.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::LogLineMalformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Terminal failure of a whole run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The change log could not be retrieved, so nothing can be selected
    #[error("Failed to fetch change log {url}: {source}")]
    ChangeLogFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The change log arrived but is not text
    #[error("Change log {url} did not decode to text")]
    ChangeLogNotText { url: String },

    /// Directory listing failed, so nothing can be enumerated
    #[error("Failed to list remote directory: {0}")]
    Listing(#[source] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
