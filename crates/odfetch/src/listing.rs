//! Remote directory listing, the discovery source for snapshot runs

use crate::config::FetchConfig;
use crate::error::{PipelineError, Result};
use crate::fetch::ftp::FtpClient;
use tracing::info;
use url::Url;

/// Produces the flat list of names in the remote directory
pub trait DirectoryListing {
    fn list(&self) -> Result<Vec<String>>;
}

/// Directory part of a path pattern (`icon-d2/grib/03/t_2m/.*` -> `icon-d2/grib/03/t_2m`)
pub fn pattern_dir(pattern: &str) -> &str {
    pattern.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Lists the pattern's directory on the FTP host behind the base URL
#[derive(Debug, Clone)]
pub struct FtpLister {
    client: FtpClient,
    base_url: Url,
    directory: String,
}

impl FtpLister {
    pub fn new(config: &FetchConfig) -> std::result::Result<Self, PipelineError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            PipelineError::config(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;
        let directory = join_dir(base_url.path(), pattern_dir(&config.pattern));
        Ok(Self {
            client: FtpClient::new(config.ftp.clone()),
            base_url,
            directory,
        })
    }

    /// Remote directory that will be listed
    pub fn directory(&self) -> &str {
        &self.directory
    }
}

impl DirectoryListing for FtpLister {
    fn list(&self) -> Result<Vec<String>> {
        let names = self.client.list_names(&self.base_url, &self.directory)?;
        info!(
            host = self.base_url.host_str().unwrap_or_default(),
            directory = %self.directory,
            "Listed {} names",
            names.len()
        );
        Ok(names)
    }
}

fn join_dir(base: &str, sub: &str) -> String {
    let base = if base.is_empty() { "/" } else { base };
    if sub.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), sub.trim_start_matches('/'))
}

/// A fixed list of names
impl DirectoryListing for Vec<String> {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.clone())
    }
}
