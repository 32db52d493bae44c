//! Single-member archive decompression
//!
//! # Supported Formats
//!
//! - **Bzip2** (.bz2): Using bzip2, concatenated streams accepted
//! - **Gzip** (.gz): Using flate2, concatenated members accepted
//! - **Zip** (.zip): Using zip, exactly one file member
//!
//! The unwrapped bytes are returned as-is; deciding what they are is the
//! job of [`crate::decode::coerce`].

use crate::error::{FetchError, Result};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::io::{Cursor, Read};
use tracing::debug;

/// Archive container keyed by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Bzip2,
    Gzip,
    Zip,
}

impl ArchiveFormat {
    /// Map a lower-cased extension (with leading dot) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".bz2" => Some(ArchiveFormat::Bzip2),
            ".gz" => Some(ArchiveFormat::Gzip),
            ".zip" => Some(ArchiveFormat::Zip),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Bzip2 => ".bz2",
            ArchiveFormat::Gzip => ".gz",
            ArchiveFormat::Zip => ".zip",
        }
    }
}

/// Decompress `data` according to `format`
///
/// `name` is only used in error messages.
pub fn decompress(data: &[u8], format: ArchiveFormat, name: &str) -> Result<Vec<u8>> {
    let decompressed = match format {
        ArchiveFormat::Bzip2 => read_all(MultiBzDecoder::new(data), name)?,
        ArchiveFormat::Gzip => read_all(MultiGzDecoder::new(data), name)?,
        ArchiveFormat::Zip => extract_single_zip(data, name)?,
    };
    debug!(
        name = %name,
        format = format.extension(),
        "Decompressed {} -> {} bytes",
        data.len(),
        decompressed.len()
    );
    Ok(decompressed)
}

fn read_all(mut reader: impl Read, name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| FetchError::decompression(name, e))?;
    Ok(out)
}

/// Extract the only file of a zip archive
///
/// Directory entries are not counted. More than one file is ambiguous and
/// fails without returning any member.
pub fn extract_single_zip(data: &[u8], name: &str) -> Result<Vec<u8>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| FetchError::decompression(name, e))?;

    let mut file_indices = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| FetchError::decompression(name, e))?;
        if !entry.is_dir() {
            file_indices.push(i);
        }
    }

    let index = match file_indices.as_slice() {
        [] => {
            return Err(FetchError::EmptyArchive {
                name: name.to_string(),
            })
        },
        [only] => *only,
        many => {
            return Err(FetchError::ArchiveAmbiguous {
                name: name.to_string(),
                members: many.len(),
            })
        },
    };

    let mut file = archive
        .by_index(index)
        .map_err(|e| FetchError::decompression(name, e))?;
    debug!(name = %name, member = %file.name(), "Extracting single zip member");
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|e| FetchError::decompression(name, e))?;
    Ok(contents)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flate2::write::GzEncoder;
    use proptest::prelude::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    pub(crate) fn bzip2(content: &[u8]) -> Vec<u8> {
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    pub(crate) fn zip_of<C: AsRef<[u8]>>(members: &[(&str, C)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (member, content) in members {
            writer
                .start_file(*member, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_ref()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(ArchiveFormat::from_extension(".bz2"), Some(ArchiveFormat::Bzip2));
        assert_eq!(ArchiveFormat::from_extension(".gz"), Some(ArchiveFormat::Gzip));
        assert_eq!(ArchiveFormat::from_extension(".zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_extension(".tar"), None);
    }

    #[test]
    fn test_decompress_concatenated_gzip_members() {
        let mut data = gzip(b"first,");
        data.extend(gzip(b"second"));
        let out = decompress(&data, ArchiveFormat::Gzip, "two.gz").unwrap();
        assert_eq!(out, b"first,second");
    }

    #[test]
    fn test_decompress_invalid_bzip2() {
        let err = decompress(b"not bzip2 data", ArchiveFormat::Bzip2, "x.bz2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }

    #[test]
    fn test_zip_single_member() {
        let data = zip_of(&[("stations.txt", b"10381 Berlin")]);
        assert_eq!(
            extract_single_zip(&data, "stations.zip").unwrap(),
            b"10381 Berlin"
        );
    }

    #[test]
    fn test_zip_directory_entries_are_not_members() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("data/", SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("data/wind.csv", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"ff;dd").unwrap();
        let data = writer.finish().unwrap().into_inner();

        assert_eq!(extract_single_zip(&data, "wind.zip").unwrap(), b"ff;dd");
    }

    #[test]
    fn test_zip_multiple_members_is_ambiguous() {
        let data = zip_of(&[("a.txt", b"a"), ("b.txt", b"b")]);
        match extract_single_zip(&data, "pair.zip") {
            Err(FetchError::ArchiveAmbiguous { name, members }) => {
                assert_eq!(name, "pair.zip");
                assert_eq!(members, 2);
            },
            other => panic!("expected ArchiveAmbiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_zip_without_files() {
        let data = zip_of::<&[u8]>(&[]);
        assert!(matches!(
            extract_single_zip(&data, "empty.zip"),
            Err(FetchError::EmptyArchive { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_decompress_inverts_compress(
            payload in proptest::collection::vec(any::<u8>(), 0..2048)
        ) {
            prop_assert_eq!(
                decompress(&bzip2(&payload), ArchiveFormat::Bzip2, "p.bz2").unwrap(),
                payload.clone()
            );
            prop_assert_eq!(
                decompress(&gzip(&payload), ArchiveFormat::Gzip, "p.gz").unwrap(),
                payload.clone()
            );
            prop_assert_eq!(
                decompress(&zip_of(&[("p.bin", &payload)]), ArchiveFormat::Zip, "p.zip").unwrap(),
                payload
            );
        }
    }
}
