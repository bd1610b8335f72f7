//! Release archive extraction.
//!
//! Releases are published as gzip-compressed tarballs, with zip archives as
//! an alternative framing. The format is detected from the archive's leading
//! bytes rather than its name, and every entry path is validated before
//! extraction to prevent zip-slip attacks.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use log::warn;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [b'P', b'K', 0x05, 0x06];

/// Trait for extracting release archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the number of regular files written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::UnsupportedFormat`] for anything that is
    /// neither gzip nor zip.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container is malformed.
    #[error("malformed zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive is neither gzip-compressed tar nor zip.
    #[error("unrecognised archive format")]
    UnsupportedFormat,

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Archive framings understood by [`ReleaseExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar.
    TarGz,
    /// Zip.
    Zip,
}

impl ArchiveFormat {
    /// Identify the framing from an archive's leading bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use hackcheck::fetch::extraction::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::sniff(&[0x1f, 0x8b, 0x08, 0x00]), Some(ArchiveFormat::TarGz));
    /// assert_eq!(ArchiveFormat::sniff(b"PK\x03\x04"), Some(ArchiveFormat::Zip));
    /// assert_eq!(ArchiveFormat::sniff(b"<html>"), None);
    /// ```
    #[must_use]
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&GZIP_MAGIC) {
            Some(Self::TarGz)
        } else if header.starts_with(&ZIP_MAGIC) || header.starts_with(&ZIP_EMPTY_MAGIC) {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Default extractor handling `.tar.gz` and `.zip` releases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseExtractor;

impl ArchiveExtractor for ReleaseExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        std::fs::create_dir_all(dest_dir)?;
        let mut file = File::open(archive_path)?;
        let mut header = [0_u8; 4];
        let read = read_header(&mut file, &mut header)?;
        file.seek(SeekFrom::Start(0))?;

        let extracted = match header.get(..read).and_then(ArchiveFormat::sniff) {
            Some(ArchiveFormat::TarGz) => extract_tar_gz(file, dest_dir)?,
            Some(ArchiveFormat::Zip) => extract_zip(file, dest_dir)?,
            None => return Err(ExtractionError::UnsupportedFormat),
        };

        if extracted == 0 {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

fn read_header(file: &mut File, header: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while let Some(rest) = header.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match file.read(rest)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn extract_tar_gz(file: File, dest_dir: &Path) -> Result<usize, ExtractionError> {
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut extracted = 0;

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        // `unpack_in` also refuses entries reached through a symlinked parent.
        let unpacked = entry.unpack_in(dest_dir)?;
        if !unpacked {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if entry.header().entry_type().is_file() {
            extracted += 1;
        }
    }

    Ok(extracted)
}

fn extract_zip(file: File, dest_dir: &Path) -> Result<usize, ExtractionError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut extracted = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(entry_path) = entry.enclosed_name() else {
            return Err(ExtractionError::PathTraversal {
                path: entry.name().to_owned(),
            });
        };
        if entry.is_symlink() {
            warn!("skipping symlink {} in zip release", entry_path.display());
            continue;
        }

        let dest_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut output = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut output)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Validate that an archive entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
