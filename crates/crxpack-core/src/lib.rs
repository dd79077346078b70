//! crxpack-core - deterministic CRX3 packaging for unpacked extensions.
//!
//! Turns an unpacked extension directory into a single signed `.crx` buffer
//! whose embedded extension ID is a stable function of the signing key. The
//! pipeline is linear:
//!
//! ```text
//! directory ──(Archiver)──▶ zip bytes ──(header)──▶ signed header
//!                                 │                      │
//!                                 └──────────┬───────────┘
//!                                            ▼
//!                       "Cr24" ∥ LE32(3) ∥ LE32(len) ∥ header ∥ zip
//! ```
//!
//! # Architecture
//!
//! - **[`KeyStore`]**: owns the process-wide RSA signing identity; lazy
//!   one-shot initialization, optional PKCS#8 PEM persistence.
//! - **[`ExtensionId`]**: 16-byte identifier derived from the public key,
//!   displayed in the a-p base16 alphabet.
//! - **[`header`]**: builds the `CrxFileHeader` protobuf with an
//!   RSASSA-PKCS1-v1_5/SHA-256 signature binding header and archive.
//! - **[`Packer`]**: orchestrates the above into the final package buffer.
//! - **[`verify`]**: independent reader that parses and validates a package.

pub mod archive;
pub mod assembler;
pub mod error;
pub mod header;
pub mod id;
pub mod keystore;
pub mod proto;
pub mod verify;

pub use archive::{Archiver, ZipArchiver};
pub use assembler::{PackedExtension, Packer};
pub use error::PackError;
pub use id::ExtensionId;
pub use keystore::{KeyStore, KeyStoreConfig, SigningIdentity};

/// Magic bytes at offset 0 of every CRX package.
pub const CRX_MAGIC: &[u8; 4] = b"Cr24";

/// CRX format version carried in the second header word (little-endian).
pub const CRX_VERSION: u32 = 3;

/// Byte length of the fixed preamble: magic + version + header length.
pub const CRX_PREAMBLE_LEN: usize = 12;
