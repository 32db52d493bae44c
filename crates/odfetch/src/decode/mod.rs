//! Extension-driven decoding of fetched bytes
//!
//! [`coerce`] turns the raw bytes of one resource into a [`Content`]:
//!
//! 1. archive extensions (`.bz2`, `.gz`, `.zip`) are unwrapped once and the
//!    extension is taken again from the unwrapped name
//!    (`obs.geojson.gz` -> `obs.geojson`)
//! 2. the final extension picks a [`DecodePolicy`] from a fixed table
//! 3. payloads starting with the `GRIB` magic are never decoded as text or
//!    JSON, whatever their extension says
//! 4. any other unwrapped payload whose inner name has no table extension
//!    is decoded as text (`10minutenwerte_wind_00003_akt.zip`)
//!
//! The function is pure: no I/O, no logging of payloads.

pub mod archive;
pub mod policy;

pub use archive::{decompress, ArchiveFormat};
pub use policy::DecodePolicy;

use crate::error::{FetchError, Result};
use serde::Serialize;
use tracing::debug;

/// Magic bytes at the start of every GRIB message
pub const GRIB_MAGIC: &[u8; 4] = b"GRIB";

/// Decoded payload of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Text(String),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Content::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Whether this payload must be written in binary mode
    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Bytes(_))
    }
}

/// Lower-cased last extension of `name`, with leading dot
///
/// Leading dots of hidden files do not count as an extension.
pub fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rfind('.') {
        Some(pos) if pos > 0 => Some(file[pos..].to_lowercase()),
        _ => None,
    }
}

/// `name` without its last extension
pub fn strip_extension(name: &str) -> &str {
    let start = name.rfind('/').map(|p| p + 1).unwrap_or(0);
    match name[start..].rfind('.') {
        Some(pos) if pos > 0 => &name[..start + pos],
        _ => name,
    }
}

/// Whether `data` is a GRIB message
pub fn is_grib(data: &[u8]) -> bool {
    data.starts_with(GRIB_MAGIC)
}

/// Decode the raw bytes of the resource called `name`
pub fn coerce(data: Vec<u8>, name: &str) -> Result<Content> {
    let mut name = name;
    let mut data = data;
    let mut unwrapped = false;

    if let Some(format) = extension_of(name)
        .as_deref()
        .and_then(ArchiveFormat::from_extension)
    {
        data = decompress(&data, format, name)?;
        name = strip_extension(name);
        unwrapped = true;
    }

    let extension = extension_of(name).unwrap_or_default();
    let policy = DecodePolicy::for_extension(&extension);
    debug!(name = %name, extension = %extension, policy = ?policy, "Decoding payload");

    if policy == DecodePolicy::Unsupported {
        return Err(FetchError::UnsupportedFormat {
            name: name.to_string(),
            extension,
        });
    }

    if is_grib(&data) {
        return Ok(Content::Bytes(data));
    }

    match policy {
        DecodePolicy::Text => Ok(Content::Text(policy::decode_text(data))),
        DecodePolicy::Structured => serde_json::from_slice(&data)
            .map(Content::Json)
            .map_err(|source| FetchError::Parse {
                name: name.to_string(),
                source,
            }),
        DecodePolicy::Raw if unwrapped => Ok(Content::Text(policy::decode_text(data))),
        DecodePolicy::Opaque | DecodePolicy::Raw | DecodePolicy::Unsupported => {
            Ok(Content::Bytes(data))
        },
    }
}
