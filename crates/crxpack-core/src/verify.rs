//! Conformant package reader and signature verification.
//!
//! Independent of the writer path: parses the preamble, decodes the header,
//! recomputes the signed message over the trailing archive bytes, and checks
//! every embedded RSA proof. Used by the CLI `verify`/`id` commands and by
//! tests as the arbiter of what a valid package is.

use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::DigestVerifier;
use sha2::{Digest, Sha256};

use crate::error::{PackError, Result};
use crate::header::SIGNED_DATA_PREAMBLE;
use crate::id::{ExtensionId, RAW_ID_LEN};
use crate::proto::{self, FileHeader};
use crate::{CRX_MAGIC, CRX_PREAMBLE_LEN, CRX_VERSION};

/// Structural parts of a package, split without any crypto checks.
#[derive(Debug)]
pub struct PackageContents<'a> {
    /// Decoded `CrxFileHeader`.
    pub header: FileHeader,
    /// The archive bytes trailing the header.
    pub archive: &'a [u8],
}

/// Split a package buffer into header and archive.
///
/// Checks magic, version, and that the header length field exactly matches
/// the bytes present; performs no signature verification.
///
/// # Errors
///
/// Returns [`PackError::Malformed`] on any structural mismatch.
pub fn split(bytes: &[u8]) -> Result<PackageContents<'_>> {
    if bytes.len() < CRX_PREAMBLE_LEN {
        return Err(PackError::Malformed("shorter than the fixed preamble".into()));
    }
    if &bytes[0..4] != CRX_MAGIC {
        return Err(PackError::Malformed("bad magic, not a CRX package".into()));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != CRX_VERSION {
        return Err(PackError::Malformed(format!(
            "unsupported CRX version {version}, expected {CRX_VERSION}"
        )));
    }
    let header_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let archive_start = CRX_PREAMBLE_LEN
        .checked_add(header_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| PackError::Malformed("header length overruns buffer".into()))?;

    let header = proto::decode_file_header(&bytes[CRX_PREAMBLE_LEN..archive_start])?;
    Ok(PackageContents {
        header,
        archive: &bytes[archive_start..],
    })
}

/// Fully verify a package buffer and return its extension ID.
///
/// Every `sha256_with_rsa` proof must validate against the signed message
/// recomputed from the embedded signed data and the trailing archive bytes,
/// and the signed `crx_id` must match the hash of one of the proof keys.
///
/// # Errors
///
/// Returns [`PackError::Malformed`] for structural problems, failed
/// signatures, and ID/key mismatches.
pub fn verify(bytes: &[u8]) -> Result<ExtensionId> {
    let contents = split(bytes)?;
    let signed_data = &contents.header.signed_header_data;

    let crx_id = proto::decode_signed_data(signed_data)?;
    let raw: [u8; RAW_ID_LEN] = crx_id
        .as_slice()
        .try_into()
        .map_err(|_| PackError::Malformed("crx_id is not 16 bytes".into()))?;
    let id = ExtensionId::from(raw);

    if contents.header.sha256_with_rsa.is_empty() {
        return Err(PackError::Malformed("no RSA signature records".into()));
    }

    let mut id_matches_a_key = false;
    for proof in &contents.header.sha256_with_rsa {
        let public = rsa::RsaPublicKey::from_public_key_der(&proof.public_key)
            .map_err(|err| PackError::Malformed(format!("undecodable public key: {err}")))?;
        let verifying_key = VerifyingKey::<Sha256>::new(public);

        let mut digest = Sha256::new();
        digest.update(SIGNED_DATA_PREAMBLE);
        digest.update((signed_data.len() as u32).to_le_bytes());
        digest.update(signed_data);
        digest.update(contents.archive);

        let signature = Signature::try_from(proof.signature.as_slice())
            .map_err(|err| PackError::Malformed(format!("undecodable signature: {err}")))?;
        verifying_key
            .verify_digest(digest, &signature)
            .map_err(|_| PackError::Malformed("signature verification failed".into()))?;

        if ExtensionId::from_public_key(&proof.public_key) == id {
            id_matches_a_key = true;
        }
    }

    if !id_matches_a_key {
        return Err(PackError::Malformed(
            "signed crx_id does not match any signing key".into(),
        ));
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Packer;
    use crate::keystore::{KeyStore, KeyStoreConfig};
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn packed() -> crate::PackedExtension {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join("manifest.json"),
            br#"{"name":"X","version":"1.0"}"#,
        )
        .unwrap();
        Packer::new(Arc::new(KeyStore::new(KeyStoreConfig::ephemeral())))
            .pack(tmp.path())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn round_trip_verifies() {
        let packed = packed().await;
        let id = verify(&packed.bytes).unwrap();
        assert_eq!(id, packed.id);
    }

    #[tokio::test]
    async fn tampered_archive_is_rejected() {
        let packed = packed().await;
        let mut bytes = packed.bytes;
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = verify(&bytes).unwrap_err();
        assert!(matches!(err, PackError::Malformed(_)));
    }

    #[tokio::test]
    async fn wrong_magic_is_rejected() {
        let packed = packed().await;
        let mut bytes = packed.bytes;
        bytes[0] = b'X';
        assert!(matches!(
            verify(&bytes).unwrap_err(),
            PackError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn oversized_header_length_is_rejected() {
        let packed = packed().await;
        let mut bytes = packed.bytes;
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            verify(&bytes).unwrap_err(),
            PackError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn mismatched_crx_id_is_rejected() {
        use crate::header::SIGNED_DATA_PREAMBLE;
        use crate::proto::{self, KeyProof};
        use rsa::pkcs1v15::SigningKey;
        use rsa::signature::{DigestSigner, SignatureEncoding};

        let identity = KeyStore::new(KeyStoreConfig::ephemeral())
            .identity()
            .await
            .unwrap();

        // Correctly signed header whose signed crx_id belongs to nobody.
        let archive = b"zip".to_vec();
        let signed_data = proto::encode_signed_data(&[0u8; 16]);
        let signing_key = SigningKey::<Sha256>::new(identity.private_key().clone());
        let mut digest = Sha256::new();
        digest.update(SIGNED_DATA_PREAMBLE);
        digest.update((signed_data.len() as u32).to_le_bytes());
        digest.update(&signed_data);
        digest.update(&archive);
        let signature: rsa::pkcs1v15::Signature = signing_key.try_sign_digest(digest).unwrap();

        let header = proto::encode_file_header(
            &[KeyProof {
                public_key: identity.public_key_der().unwrap(),
                signature: signature.to_vec(),
            }],
            &signed_data,
        );

        let mut bytes = Vec::new();
        bytes.extend_from_slice(CRX_MAGIC);
        bytes.extend_from_slice(&CRX_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&archive);

        let err = verify(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
