//! Blocking FTP session helpers
//!
//! One short session per operation: connect, anonymous login, do the work,
//! quit. Sessions use Extended Passive Mode (EPSV), which survives NAT.
//! No retries: repeating a run is the scheduler's business.

use crate::config::FtpConfig;
use crate::error::{FetchError, Result};
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use tracing::{debug, warn};
use url::Url;

/// FTP client bound to one login configuration
#[derive(Debug, Clone)]
pub struct FtpClient {
    config: FtpConfig,
}

impl FtpClient {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    /// Host and port to dial for `url`
    ///
    /// Non-FTP URLs (an HTTPS mirror that also speaks FTP) use the
    /// configured port rather than the URL's.
    pub fn endpoint(&self, url: &Url) -> Result<(String, u16)> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?
            .to_string();
        let port = if url.scheme() == "ftp" {
            url.port().unwrap_or(self.config.port)
        } else {
            self.config.port
        };
        Ok((host, port))
    }

    fn connect(&self, url: &Url) -> Result<FtpStream> {
        let (host, port) = self.endpoint(url)?;
        debug!("Connecting to FTP server: {}:{}", host, port);

        let mut stream = FtpStream::connect(format!("{}:{}", host, port))
            .map_err(|e| FetchError::network(url.as_str(), e))?;
        stream.set_mode(Mode::ExtendedPassive);

        debug!("Logging in as: {}", self.config.username);
        stream
            .login(&self.config.username, &self.config.password)
            .map_err(|e| FetchError::network(url.as_str(), e))?;
        Ok(stream)
    }

    fn close(mut stream: FtpStream) {
        if let Err(e) = stream.quit() {
            warn!("Failed to quit FTP session gracefully: {}", e);
        }
    }

    /// Download the file named by an `ftp://` URL
    pub fn retrieve(&self, url: &Url) -> Result<Vec<u8>> {
        let mut stream = self.connect(url)?;

        let outcome = stream
            .transfer_type(FileType::Binary)
            .and_then(|_| stream.retr_as_buffer(url.path()))
            .map(|cursor| cursor.into_inner())
            .map_err(|e| FetchError::network(url.as_str(), e));

        Self::close(stream);
        let data = outcome?;
        debug!("Downloaded {} bytes from {}", data.len(), url);
        Ok(data)
    }

    /// Names in `directory` on the host of `url`
    ///
    /// A directory that cannot be entered yields [`FetchError::Directory`].
    pub fn list_names(&self, url: &Url, directory: &str) -> Result<Vec<String>> {
        let mut stream = self.connect(url)?;

        debug!("Changing directory: {}", directory);
        if let Err(e) = stream.cwd(directory) {
            Self::close(stream);
            return Err(FetchError::Directory {
                path: directory.to_string(),
                message: e.to_string(),
            });
        }

        let outcome = stream
            .nlst(None)
            .map_err(|e| FetchError::network(url.as_str(), e));
        Self::close(stream);

        let names = outcome?;
        debug!("Listed {} names in {}", names.len(), directory);
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_ftp_url() {
        let client = FtpClient::new(FtpConfig::default());
        let url = Url::parse("ftp://ftp.example.org:2121/pub/data").unwrap();
        assert_eq!(
            client.endpoint(&url).unwrap(),
            ("ftp.example.org".to_string(), 2121)
        );
    }

    #[test]
    fn test_endpoint_for_https_mirror_uses_ftp_port() {
        let client = FtpClient::new(FtpConfig::default());
        let url = Url::parse("https://opendata.dwd.de/climate_environment/CDC/").unwrap();
        assert_eq!(
            client.endpoint(&url).unwrap(),
            ("opendata.dwd.de".to_string(), 21)
        );
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        let client = FtpClient::new(FtpConfig {
            port: 1,
            ..FtpConfig::default()
        });
        let url = Url::parse("ftp://127.0.0.1/pub/file.txt").unwrap();
        let err = client.retrieve(&url).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }
}
