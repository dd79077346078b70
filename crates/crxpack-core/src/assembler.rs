//! Package assembly: the sole public packaging entry point.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::archive::{Archiver, ZipArchiver};
use crate::error::Result;
use crate::header;
use crate::id::ExtensionId;
use crate::keystore::KeyStore;
use crate::{CRX_MAGIC, CRX_PREAMBLE_LEN, CRX_VERSION};

/// A finished package: stable extension ID plus the full `.crx` buffer.
#[derive(Debug, Clone)]
pub struct PackedExtension {
    /// 16-byte identifier derived from the signing key; display it with
    /// `to_string()` for the 32-character a-p form.
    pub id: ExtensionId,
    /// The complete package: preamble, signed header, archive.
    pub bytes: Vec<u8>,
}

/// Orchestrates key store, archiver, and header builder into `.crx` output.
///
/// Holds no mutable state of its own; the only state is the key store's
/// lazily initialized identity, so packing is safe to call repeatedly and
/// concurrently. A packing call either returns a complete package or an
/// error, never a partial buffer.
#[derive(Debug)]
pub struct Packer {
    keys: Arc<KeyStore>,
    archiver: Arc<dyn Archiver>,
}

impl Packer {
    /// Create a packer using the stock [`ZipArchiver`].
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self::with_archiver(keys, Arc::new(ZipArchiver))
    }

    /// Create a packer with a custom archiving collaborator.
    pub fn with_archiver(keys: Arc<KeyStore>, archiver: Arc<dyn Archiver>) -> Self {
        Self { keys, archiver }
    }

    /// Package the unpacked extension at `dir` into a signed `.crx` buffer.
    ///
    /// Repeated calls reuse the process signing identity, so the returned ID
    /// is stable across builds even as the content changes.
    ///
    /// # Errors
    ///
    /// Propagates key store, archiver, and signing failures unchanged; see
    /// [`crate::PackError`]. Nothing is cached on failure except a
    /// successfully initialized signing identity.
    pub async fn pack(&self, dir: &Path) -> Result<PackedExtension> {
        let identity = self.keys.identity().await?;
        let archive = self.archiver.build_zip(dir).await?;
        let header = header::build_header(&identity, &archive)?;
        let id = identity.extension_id()?;

        let mut bytes = Vec::with_capacity(CRX_PREAMBLE_LEN + header.len() + archive.len());
        bytes.extend_from_slice(CRX_MAGIC);
        bytes.extend_from_slice(&CRX_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&archive);

        info!(
            id = %id,
            dir = %dir.display(),
            package_len = bytes.len(),
            "packed extension"
        );
        Ok(PackedExtension { id, bytes })
    }
}
