//! Signed CRX3 header construction.
//!
//! The header is a `CrxFileHeader` protobuf carrying the signing public key,
//! an RSASSA-PKCS1-v1_5/SHA-256 signature, and the serialized `SignedData`
//! message (which holds the raw extension ID). The signature covers
//!
//! ```text
//! "CRX3 SignedData\0" ∥ LE32(len(signed_data)) ∥ signed_data ∥ archive
//! ```
//!
//! so the header is cryptographically bound to the exact archive bytes that
//! follow it in the package. Mutating the archive without rebuilding the
//! header makes the package fail verification; that coupling is the whole
//! point.

use rsa::pkcs1v15::SigningKey;
use rsa::signature::{DigestSigner, SignatureEncoding};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::id::ExtensionId;
use crate::keystore::SigningIdentity;
use crate::proto::{self, KeyProof};

/// Domain-separation tag hashed ahead of the signed message. 16 bytes
/// including the trailing NUL. Never emitted into the header itself.
pub const SIGNED_DATA_PREAMBLE: &[u8; 16] = b"CRX3 SignedData\0";

/// Build the serialized header for `archive` signed by `identity`.
///
/// The result is self-contained: a verifier can recover the public key,
/// signature, and signed data from it and check the signature against the
/// archive bytes that follow the header in the package.
///
/// # Errors
///
/// Returns [`crate::PackError::Encoding`] if the public key cannot be
/// exported and [`crate::PackError::Signing`] on crypto backend failure.
pub fn build_header(identity: &SigningIdentity, archive: &[u8]) -> Result<Vec<u8>> {
    let public_key = identity.public_key_der()?;
    let crx_id = ExtensionId::from_public_key(&public_key);
    let signed_data = proto::encode_signed_data(crx_id.as_bytes());

    let signature = sign(identity, &signed_data, archive)?;
    debug!(
        id = %crx_id,
        archive_len = archive.len(),
        "built signed header"
    );

    Ok(proto::encode_file_header(
        &[KeyProof {
            public_key,
            signature,
        }],
        &signed_data,
    ))
}

/// Sign the CRX3 signed message. Streams the archive through the digest, so
/// the (potentially large) zip is never copied.
fn sign(identity: &SigningIdentity, signed_data: &[u8], archive: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha256>::new(identity.private_key().clone());

    let mut digest = Sha256::new();
    digest.update(SIGNED_DATA_PREAMBLE);
    digest.update((signed_data.len() as u32).to_le_bytes());
    digest.update(signed_data);
    digest.update(archive);

    let signature = signing_key.try_sign_digest(digest)?;
    Ok(signature.to_vec())
}
