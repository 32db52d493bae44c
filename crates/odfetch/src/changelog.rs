//! Change-log parsing and cutoff selection
//!
//! A change log is a plain-text manifest with one `path|size|changed_at`
//! line per file. `changed_at` has no UTC offset but is always UTC.
//!
//! ```text
//! icon-d2/grib/03/t_2m/icon-d2_..._t_2m.grib2.bz2|1244180|2022-08-05 04:01:03.000000
//! ```

use crate::diagnostics::{self, DiagnosticSink};
use crate::error::{FetchError, PipelineError};
use crate::filter::{FilterMode, PatternFilter};
use crate::resolve_url;
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Default skew tolerance between mirrored backends, in seconds
pub const DEFAULT_MIN_DELTA_SECS: i64 = 60;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H",
    "%Y-%m-%dT%H",
];

/// One parsed change-log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub path: String,
    pub size_bytes: u64,
    pub changed_at: DateTime<Utc>,
}

impl LogEntry {
    /// Parse `path|size|changed_at`
    pub fn parse(line: &str) -> Result<Self, FetchError> {
        let trimmed = line.trim();
        let fields: Vec<&str> = trimmed.split('|').collect();
        let [path, size, changed_at] = fields.as_slice() else {
            return Err(FetchError::malformed(
                trimmed,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        };

        if path.is_empty() {
            return Err(FetchError::malformed(trimmed, "empty path"));
        }

        // The size field may be left empty
        let size_bytes = match size.trim() {
            "" => 0,
            digits => digits.parse().map_err(|_| {
                FetchError::malformed(trimmed, format!("invalid size '{}'", size))
            })?,
        };

        let changed_at = parse_naive(changed_at.trim())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| {
                FetchError::malformed(trimmed, format!("invalid timestamp '{}'", changed_at))
            })?;

        Ok(Self {
            path: path.to_string(),
            size_bytes,
            changed_at,
        })
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Cutoff plus skew tolerance deciding which entries are new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCutoff {
    pub since: DateTime<Utc>,
    pub min_delta_secs: i64,
}

impl SelectionCutoff {
    pub fn new(since: DateTime<Utc>, min_delta_secs: i64) -> Self {
        Self {
            since,
            min_delta_secs,
        }
    }

    /// Local midnight of the current day, with the default tolerance
    pub fn today() -> Self {
        Self::new(local_midnight(Local::now().date_naive()), DEFAULT_MIN_DELTA_SECS)
    }

    /// Parse an ISO-8601 cutoff
    ///
    /// Values with an offset are taken as-is; naive values are local time.
    pub fn parse_since(s: &str) -> Result<DateTime<Utc>, PipelineError> {
        let s = s.trim();
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
            return Ok(with_offset.with_timezone(&Utc));
        }
        if let Ok(with_offset) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Ok(with_offset.with_timezone(&Utc));
        }

        let naive = parse_naive(s).ok_or_else(|| {
            PipelineError::config(format!(
                "'{}' is not an ISO-8601 timestamp (YYYY-MM-DD[*HH[:MM[:SS]]])",
                s
            ))
        })?;
        local_to_utc(naive)
            .ok_or_else(|| PipelineError::config(format!("'{}' does not exist in local time", s)))
    }

    /// Whether `entry` changed strictly more than the tolerance after `since`
    ///
    /// A tolerance too large for [`TimeDelta`] selects nothing.
    pub fn selects(&self, entry: &LogEntry) -> bool {
        match TimeDelta::try_seconds(self.min_delta_secs) {
            Some(min_delta) => entry.changed_at - self.since > min_delta,
            None => false,
        }
    }
}

impl Default for SelectionCutoff {
    fn default() -> Self {
        Self::today()
    }
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    // Midnight can fall into a DST gap
    local_to_utc(naive)
        .or_else(|| local_to_utc(naive + TimeDelta::hours(1)))
        .unwrap_or_else(|| naive.and_utc())
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match naive.and_local_timezone(Local) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Turns change-log text into the list of URLs to fetch
pub struct ChangeLogResolver {
    base_url: String,
    filter: PatternFilter,
    sink: Arc<dyn DiagnosticSink>,
}

impl ChangeLogResolver {
    pub fn new(base_url: impl Into<String>, pattern: &str) -> Result<Self, PipelineError> {
        let filter = PatternFilter::new(pattern, FilterMode::ChangeLog)
            .map_err(|e| PipelineError::config(format!("invalid pattern: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            filter,
            sink: diagnostics::noop(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Matching, well-formed entries in log order
    ///
    /// Lines that do not parse are reported to the sink and skipped.
    pub fn entries(&self, log_text: &str) -> Vec<LogEntry> {
        self.filter
            .filter_lines(log_text)
            .filter_map(|line| match LogEntry::parse(line) {
                Ok(entry) => {
                    debug!(
                        path = %entry.path,
                        size = entry.size_bytes,
                        changed_at = %entry.changed_at,
                        "Change-log entry"
                    );
                    Some(entry)
                },
                Err(err) => {
                    self.sink.report(line, &err);
                    None
                },
            })
            .collect()
    }

    /// Absolute URLs of the entries newer than `cutoff`, in log order
    pub fn resolve(&self, log_text: &str, cutoff: &SelectionCutoff) -> Vec<String> {
        let entries = self.entries(log_text);
        let matched = entries.len();

        let selected: Vec<String> = entries
            .into_iter()
            .filter(|entry| cutoff.selects(entry))
            .map(|entry| resolve_url(&self.base_url, &entry.path))
            .collect();

        info!(
            pattern = %self.filter.pattern(),
            since = %cutoff.since,
            min_delta_secs = cutoff.min_delta_secs,
            "{} of {} matching entries selected",
            selected.len(),
            matched
        );
        selected
    }
}
