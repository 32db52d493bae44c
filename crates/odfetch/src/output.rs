//! Writing fetched resources to a local directory

use crate::decode::Content;
use crate::error::{FetchError, Result};
use crate::pipeline::FetchedResource;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes each resource to `<dir>/<base_name>`
///
/// Text is written as UTF-8, JSON pretty-printed, bytes as-is.
#[derive(Debug, Clone)]
pub struct ResourceWriter {
    dir: PathBuf,
}

impl ResourceWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `resource`, returning the path written
    pub fn write(&self, resource: &FetchedResource) -> Result<PathBuf> {
        let name = resource.base_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(FetchError::io(
                &self.dir,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' is not usable as a file name", name),
                ),
            ));
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| FetchError::io(&self.dir, e))?;
        let target = self.dir.join(name);

        let written = match &resource.content {
            Content::Text(text) => std::fs::write(&target, text.as_bytes()),
            Content::Bytes(bytes) => std::fs::write(&target, bytes),
            Content::Json(value) => {
                let pretty = serde_json::to_vec_pretty(value).map_err(|source| FetchError::Parse {
                    name: name.to_string(),
                    source,
                })?;
                std::fs::write(&target, pretty)
            },
        };
        written.map_err(|e| FetchError::io(&target, e))?;

        debug!(index = resource.index, path = %target.display(), "Wrote resource");
        Ok(target)
    }
}
