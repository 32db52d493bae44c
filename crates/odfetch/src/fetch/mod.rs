//! Retrieval of single resources
//!
//! [`Fetch`] is the seam both pipelines are built on. [`RemoteFetcher`]
//! implements it for `http(s)://`, `ftp://` and `file://` URLs:
//!
//! 1. the raw bytes are retrieved (blocking, no retry)
//! 2. if a storage directory is configured and the source is not a local
//!    file, the raw bytes are written there under the resource's own name
//! 3. the bytes are decoded with [`crate::decode::coerce`]

pub mod ftp;

use crate::config::FetchConfig;
use crate::decode::{coerce, Content};
use crate::error::{FetchError, PipelineError, Result};
use crate::file_name_of;
use ftp::FtpClient;
use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Fetch and decode one resource
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Content>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> Result<Content> {
        (**self).fetch(url)
    }
}

/// Blocking fetcher for remote and local resources
pub struct RemoteFetcher {
    client: Client,
    ftp: FtpClient,
    storage: Option<PathBuf>,
}

impl RemoteFetcher {
    pub fn new(config: &FetchConfig) -> std::result::Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            ftp: FtpClient::new(config.ftp.clone()),
            storage: config.local_storage_path.clone(),
        })
    }

    /// Directory receiving raw downloads, if any
    pub fn storage(&self) -> Option<&Path> {
        self.storage.as_deref()
    }

    /// Retrieve the undecoded bytes of `url`
    pub fn fetch_raw(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url),
            "ftp" => self.ftp.retrieve(url),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
                std::fs::read(&path).map_err(|e| FetchError::io(&path, e))
            },
            other => Err(FetchError::UnsupportedScheme {
                scheme: other.to_string(),
                url: url.to_string(),
            }),
        }
    }

    fn fetch_http(&self, url: &Url) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| FetchError::network(url.as_str(), e))?;
        Ok(bytes.to_vec())
    }

    /// Write the raw bytes into the storage directory
    fn persist(&self, dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(FetchError::io(
                dir,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("cannot derive a file name for '{}'", name),
                ),
            ));
        }
        std::fs::create_dir_all(dir).map_err(|e| FetchError::io(dir, e))?;
        let target = dir.join(name);
        std::fs::write(&target, data).map_err(|e| FetchError::io(&target, e))?;
        debug!("Stored {} raw bytes at {}", data.len(), target.display());
        Ok(target)
    }
}

impl Fetch for RemoteFetcher {
    fn fetch(&self, url: &str) -> Result<Content> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let data = self.fetch_raw(&parsed)?;
        let name = file_name_of(url);
        info!(url = %url, bytes = data.len(), "Fetched");

        if let Some(ref dir) = self.storage {
            if parsed.scheme() != "file" {
                self.persist(dir, name, &data)?;
            }
        }

        coerce(data, name)
    }
}
