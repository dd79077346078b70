//! Archiving collaborator: unpacked directory to zip bytes.
//!
//! The packer does not implement compression itself; it consumes zip-format
//! bytes from an [`Archiver`]. [`ZipArchiver`] is the stock implementation.
//! Tests substitute their own to pin archive bytes exactly.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipWriter};

use crate::error::{PackError, Result};

/// Produces a zip-format byte sequence from a directory tree.
#[async_trait]
pub trait Archiver: Send + Sync + std::fmt::Debug {
    /// Archive the full contents of `dir` into an in-memory zip.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Archive`] if any directory entry cannot be read,
    /// a file name is not valid UTF-8, or the archive cannot be written.
    async fn build_zip(&self, dir: &Path) -> Result<Vec<u8>>;
}

/// Stock [`Archiver`] producing byte-stable archives.
///
/// Entries are added in sorted path order with a fixed modification time,
/// so repeated runs over unchanged input yield identical bytes. That is not
/// required for correctness (the header is rebuilt per package) but keeps
/// builds reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn build_zip(&self, dir: &Path) -> Result<Vec<u8>> {
        let dir = dir.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || zip_dir(&dir)).await??;
        Ok(bytes)
    }
}

/// Fixed timestamp for all archive entries (DOS epoch).
fn zip_timestamp() -> ZipDateTime {
    ZipDateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap_or_default()
}

fn zip_dir(root: &Path) -> Result<Vec<u8>> {
    let mut entries: Vec<(PathBuf, bool)> = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|err| PackError::Archive(std::io::Error::other(err)))?;
        entries.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
    }
    entries.sort();

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_timestamp())
        .unix_permissions(0o644);

    for (path, is_dir) in &entries {
        let name = relative_name(root, path)?;
        if *is_dir {
            // Keeps empty directories; files re-create their parents anyway.
            writer
                .add_directory(name, options)
                .map_err(zip_to_archive_err)?;
            continue;
        }
        writer.start_file(name, options).map_err(zip_to_archive_err)?;
        let contents = std::fs::read(path).map_err(PackError::Archive)?;
        writer.write_all(&contents).map_err(PackError::Archive)?;
    }

    let cursor = writer.finish().map_err(zip_to_archive_err)?;
    let bytes = cursor.into_inner();
    debug!(
        root = %root.display(),
        entries = entries.len(),
        zip_len = bytes.len(),
        "archived extension directory"
    );
    Ok(bytes)
}

/// Zip entry name: relative to the archive root, forward slashes.
///
/// Entry names are UTF-8 in the archive; a non-UTF-8 file name cannot be
/// represented without mangling it, so it is an archive error.
fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|err| PackError::Archive(std::io::Error::other(err)))?;
    let mut parts: Vec<&str> = Vec::new();
    for component in rel.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            PackError::Archive(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non-UTF-8 file name: {}", path.display()),
            ))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn zip_to_archive_err(err: zip::result::ZipError) -> PackError {
    PackError::Archive(std::io::Error::other(err))
}
