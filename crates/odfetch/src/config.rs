//! Configuration for fetch runs
//!
//! Every component receives its settings explicitly at construction; there
//! is no process-wide state.

use crate::changelog::{SelectionCutoff, DEFAULT_MIN_DELTA_SECS};
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// Change-log file name published at the root of a repository
pub const DEFAULT_CONTENT_LOG: &str = "content.log.bz2";

/// User agent sent with HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("odfetch/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_FTP_PORT: u16 = 21;

/// FTP login settings; public mirrors take anonymous logins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpConfig {
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_FTP_PORT,
            username: "anonymous".to_string(),
            password: "anonymous@".to_string(),
        }
    }
}

/// Settings shared by both fetch strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Repository root; change-log paths and listing names resolve against it
    pub base_url: String,

    /// Regular expression selecting remote paths
    pub pattern: String,

    /// Where the raw downloaded bytes are kept; nothing is stored when unset
    pub local_storage_path: Option<PathBuf>,

    /// HTTP timeout; `None` leaves requests unbounded
    pub timeout_secs: Option<u64>,

    pub user_agent: String,

    #[serde(default)]
    pub ftp: FtpConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            pattern: String::new(),
            local_storage_path: None,
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ftp: FtpConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }

    /// Load from environment variables
    ///
    /// - `ODFETCH_BASE_URL`
    /// - `ODFETCH_PATTERN`
    /// - `ODFETCH_STORAGE_PATH`
    /// - `ODFETCH_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, PipelineError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ODFETCH_BASE_URL") {
            config.base_url = url;
        }

        if let Ok(pattern) = std::env::var("ODFETCH_PATTERN") {
            config.pattern = pattern;
        }

        if let Ok(path) = std::env::var("ODFETCH_STORAGE_PATH") {
            config.local_storage_path = Some(PathBuf::from(path));
        }

        if let Ok(secs) = std::env::var("ODFETCH_TIMEOUT_SECS") {
            let secs = secs.trim().parse().map_err(|_| {
                PipelineError::config(format!(
                    "ODFETCH_TIMEOUT_SECS must be an integer, got '{}'",
                    secs
                ))
            })?;
            config.timeout_secs = Some(secs);
        }

        Ok(config)
    }

    /// Check that the base URL parses and the pattern compiles
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.base_url.trim().is_empty() {
            return Err(PipelineError::config("base URL cannot be empty"));
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            PipelineError::config(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;

        if self.pattern.is_empty() {
            return Err(PipelineError::config("pattern cannot be empty"));
        }

        regex::Regex::new(&self.pattern)
            .map_err(|e| PipelineError::config(format!("invalid pattern: {}", e)))?;

        if self.timeout_secs == Some(0) {
            return Err(PipelineError::config("timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for FetchConfig
#[derive(Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.pattern = pattern.into();
        self
    }

    pub fn local_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.local_storage_path = Some(path.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn ftp(mut self, ftp: FtpConfig) -> Self {
        self.config.ftp = ftp;
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

/// Settings specific to change-log driven runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogConfig {
    /// Change-log resource name, relative to the base URL
    pub content_log_name: String,

    /// Extra seconds an entry must be newer than the cutoff
    pub min_delta_secs: i64,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            content_log_name: DEFAULT_CONTENT_LOG.to_string(),
            min_delta_secs: DEFAULT_MIN_DELTA_SECS,
        }
    }
}

impl ChangeLogConfig {
    pub fn new(content_log_name: impl Into<String>) -> Self {
        Self {
            content_log_name: content_log_name.into(),
            ..Self::default()
        }
    }

    pub fn with_min_delta(mut self, secs: i64) -> Self {
        self.min_delta_secs = secs;
        self
    }

    /// Overlay `ODFETCH_CONTENT_LOG` and `ODFETCH_MIN_DELTA`
    pub fn merge_env(mut self) -> Result<Self, PipelineError> {
        if let Ok(name) = std::env::var("ODFETCH_CONTENT_LOG") {
            self.content_log_name = name;
        }

        if let Ok(delta) = std::env::var("ODFETCH_MIN_DELTA") {
            self.min_delta_secs = delta.trim().parse().map_err(|_| {
                PipelineError::config(format!(
                    "ODFETCH_MIN_DELTA must be an integer, got '{}'",
                    delta
                ))
            })?;
        }

        Ok(self)
    }

    /// Cutoff for `since`, defaulting to local midnight today
    pub fn cutoff(&self, since: Option<DateTime<Utc>>) -> SelectionCutoff {
        let since = since.unwrap_or_else(|| SelectionCutoff::today().since);
        SelectionCutoff::new(since, self.min_delta_secs)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.content_log_name.trim().is_empty() {
            return Err(PipelineError::config("change-log name cannot be empty"));
        }
        if self.min_delta_secs < 0 {
            return Err(PipelineError::config("minimum delta cannot be negative"));
        }
        if chrono::TimeDelta::try_seconds(self.min_delta_secs).is_none() {
            return Err(PipelineError::config(format!(
                "minimum delta of {} seconds is out of range",
                self.min_delta_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.ftp.port, 21);
        assert_eq!(config.ftp.username, "anonymous");

        let log = ChangeLogConfig::default();
        assert_eq!(log.content_log_name, "content.log.bz2");
        assert_eq!(log.min_delta_secs, 60);
    }

    #[test]
    fn test_validate() {
        let ok = FetchConfig::builder()
            .base_url("https://opendata.dwd.de/weather/nwp")
            .pattern("icon-d2/grib/03/t_2m/.*")
            .build();
        assert!(ok.validate().is_ok());

        let bad_url = FetchConfig::builder().base_url("not a url").pattern("x").build();
        assert!(bad_url.validate().is_err());

        let bad_pattern = FetchConfig::builder()
            .base_url("https://example.org")
            .pattern("[")
            .build();
        assert!(bad_pattern.validate().is_err());

        let zero_timeout = FetchConfig::builder()
            .base_url("https://example.org")
            .pattern("x")
            .timeout_secs(0)
            .build();
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("ODFETCH_BASE_URL", "https://example.org/weather");
        std::env::set_var("ODFETCH_PATTERN", "synop/.*");
        std::env::set_var("ODFETCH_TIMEOUT_SECS", "30");

        let config = FetchConfig::from_env().unwrap();

        std::env::remove_var("ODFETCH_BASE_URL");
        std::env::remove_var("ODFETCH_PATTERN");
        std::env::remove_var("ODFETCH_TIMEOUT_SECS");

        assert_eq!(config.base_url, "https://example.org/weather");
        assert_eq!(config.pattern, "synop/.*");
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    #[serial]
    fn test_change_log_env_rejects_non_integer() {
        std::env::set_var("ODFETCH_MIN_DELTA", "sixty");
        let result = ChangeLogConfig::default().merge_env();
        std::env::remove_var("ODFETCH_MIN_DELTA");
        assert!(result.is_err());
    }

    #[test]
    fn test_change_log_validate_bounds_delta() {
        assert!(ChangeLogConfig::default().validate().is_ok());
        assert!(ChangeLogConfig::default().with_min_delta(-1).validate().is_err());
        assert!(matches!(
            ChangeLogConfig::default().with_min_delta(i64::MAX).validate(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_cutoff_uses_configured_delta() {
        let since = Utc.with_ymd_and_hms(2022, 8, 5, 0, 0, 0).unwrap();
        let cutoff = ChangeLogConfig::default().with_min_delta(120).cutoff(Some(since));
        assert_eq!(cutoff.since, since);
        assert_eq!(cutoff.min_delta_secs, 120);
    }

    #[test]
    fn test_config_serde() {
        let config = FetchConfig::builder()
            .base_url("ftp://ftp.example.org/pub")
            .pattern(".*")
            .local_storage_path("/tmp/raw")
            .build();
        let json = serde_json::to_string(&config).unwrap();
        let back: FetchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
