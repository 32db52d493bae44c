//! Extension -> handling table

use encoding_rs::ISO_8859_15;
use tracing::debug;

/// Extensions decoded to text
pub const TEXT_EXTENSIONS: &[&str] = &[".txt", ".csv", ".log"];

/// Extensions parsed as JSON
pub const STRUCTURED_EXTENSIONS: &[&str] = &[".json", ".geojson"];

/// Extensions with no decoder (BUFR observations)
pub const UNSUPPORTED_EXTENSIONS: &[&str] = &[".bin"];

/// Prefix of the opaque GRIB family (`.grib`, `.grib2`, ...)
pub const OPAQUE_PREFIX: &str = ".grib";

/// How the payload of a (possibly unwrapped) extension is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// UTF-8, falling back to ISO-8859-15
    Text,
    /// JSON / GeoJSON document
    Structured,
    /// No decoder; fails the fetch
    Unsupported,
    /// Left untouched on purpose
    Opaque,
    /// Not in the table; returned as bytes
    Raw,
}

impl DecodePolicy {
    /// Look up the policy for a lower-cased extension with leading dot
    pub fn for_extension(ext: &str) -> Self {
        if TEXT_EXTENSIONS.contains(&ext) {
            DecodePolicy::Text
        } else if STRUCTURED_EXTENSIONS.contains(&ext) {
            DecodePolicy::Structured
        } else if UNSUPPORTED_EXTENSIONS.contains(&ext) {
            DecodePolicy::Unsupported
        } else if ext.starts_with(OPAQUE_PREFIX) {
            DecodePolicy::Opaque
        } else {
            DecodePolicy::Raw
        }
    }
}

/// Decode text, trying UTF-8 first
///
/// ISO-8859-15 maps every byte, so this never fails. The fallback is only
/// taken when the bytes are not valid UTF-8.
pub fn decode_text(data: Vec<u8>) -> String {
    match String::from_utf8(data) {
        Ok(text) => text,
        Err(err) => {
            debug!("Payload is not UTF-8 ({}), decoding as ISO-8859-15", err);
            let bytes = err.into_bytes();
            let (text, _) = ISO_8859_15.decode_without_bom_handling(&bytes);
            text.into_owned()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        assert_eq!(DecodePolicy::for_extension(".csv"), DecodePolicy::Text);
        assert_eq!(DecodePolicy::for_extension(".log"), DecodePolicy::Text);
        assert_eq!(DecodePolicy::for_extension(".geojson"), DecodePolicy::Structured);
        assert_eq!(DecodePolicy::for_extension(".bin"), DecodePolicy::Unsupported);
        assert_eq!(DecodePolicy::for_extension(".grib2"), DecodePolicy::Opaque);
        assert_eq!(DecodePolicy::for_extension(".grib"), DecodePolicy::Opaque);
        assert_eq!(DecodePolicy::for_extension(".h5"), DecodePolicy::Raw);
        assert_eq!(DecodePolicy::for_extension(""), DecodePolicy::Raw);
    }

    #[test]
    fn test_valid_utf8_is_not_reinterpreted() {
        // "Ã¤" would be the Latin-9 reading of these two bytes
        assert_eq!(decode_text("ä".as_bytes().to_vec()), "ä");
    }

    #[test]
    fn test_latin9_specific_characters() {
        // 0xA6 and 0xBD differ between ISO-8859-1 and ISO-8859-15
        assert_eq!(decode_text(vec![0xA6, 0xBD]), "Šœ");
    }
}
