//! Domain-specific errors for package construction and verification.

use thiserror::Error;

/// Errors surfaced by packaging and verification.
///
/// None of these are recoverable inside the core: every failure aborts the
/// current packaging call and propagates to the caller. The core never
/// returns a package buffer without a verifiable signature over its trailing
/// archive bytes.
#[derive(Error, Debug)]
pub enum PackError {
    /// Reading or writing the persisted private key failed.
    #[error("key storage failed at {path}: {source}")]
    KeyStorage {
        /// Location of the persisted key blob.
        path: std::path::PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// PKCS#8 encoding or decoding of private key material failed.
    #[error("invalid PKCS#8 key material: {0}")]
    KeyParse(#[from] rsa::pkcs8::Error),

    /// The crypto backend failed to generate a fresh RSA key pair.
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(#[from] rsa::Error),

    /// The archiver collaborator failed; propagated unchanged.
    #[error("failed to archive extension directory: {0}")]
    Archive(#[source] std::io::Error),

    /// Signing the header failed in the crypto backend.
    #[error("header signing failed: {0}")]
    Signing(#[from] rsa::signature::Error),

    /// Exporting the public key to SPKI DER failed.
    #[error("public key export failed: {0}")]
    Encoding(#[from] rsa::pkcs8::spki::Error),

    /// A package buffer could not be parsed by the reader.
    #[error("malformed package: {0}")]
    Malformed(String),

    /// Joining an offloaded blocking task failed.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PackError>;
