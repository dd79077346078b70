//! Extension identifiers derived from signing keys.
//!
//! An extension ID is the first 16 bytes of the SHA-256 digest of the
//! signing key's SPKI DER encoding. For display it is hex-encoded and each
//! nibble remapped from `0-9a-f` to `a-p`, the convention Chromium uses so
//! IDs are never mistaken for hexadecimal. Consumers compare IDs as opaque
//! strings, so the remap table is normative, not just "some" base16
//! alphabet.

use sha2::{Digest, Sha256};

/// Byte length of a raw extension ID (truncated SHA-256).
pub const RAW_ID_LEN: usize = 16;

/// Character length of a displayed extension ID.
pub const DISPLAY_ID_LEN: usize = 32;

/// Newtype for a raw 16-byte extension ID.
///
/// Provides compile-time distinction from other byte blobs. The raw form is
/// what gets embedded in the signed header; the [`std::fmt::Display`] form
/// is what users and policy files see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionId([u8; RAW_ID_LEN]);

impl ExtensionId {
    /// Derive the ID for a public key given in SPKI DER encoding.
    ///
    /// Deterministic: the same key bytes always produce the same ID.
    pub fn from_public_key(spki_der: &[u8]) -> Self {
        let digest = Sha256::digest(spki_der);
        let mut raw = [0u8; RAW_ID_LEN];
        raw.copy_from_slice(&digest[..RAW_ID_LEN]);
        Self(raw)
    }

    /// The raw 16 bytes embedded in the signed header.
    pub fn as_bytes(&self) -> &[u8; RAW_ID_LEN] {
        &self.0
    }
}

impl From<[u8; RAW_ID_LEN]> for ExtensionId {
    fn from(raw: [u8; RAW_ID_LEN]) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in hex::encode(self.0).bytes() {
            // '0'..='9' => 'a'..='j', 'a'..='f' => 'k'..='p'
            let mapped = match c {
                b'0'..=b'9' => c - b'0' + b'a',
                _ => c - b'a' + b'k',
            };
            write!(f, "{}", mapped as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_id_is_truncated_sha256() {
        let key = b"not actually DER, hashing does not care";
        let id = ExtensionId::from_public_key(key);
        let digest = Sha256::digest(key);
        assert_eq!(id.as_bytes()[..], digest[..16]);
    }

    #[test]
    fn display_is_32_chars_a_to_p() {
        let id = ExtensionId::from_public_key(b"some key bytes");
        let s = id.to_string();
        assert_eq!(s.len(), DISPLAY_ID_LEN);
        assert!(s.bytes().all(|c| (b'a'..=b'p').contains(&c)));
    }

    #[test]
    fn display_remaps_each_nibble() {
        // 0x00 -> "aa", 0xff -> "pp", 0x4a -> "ek"
        let raw = [0x00, 0xff, 0x4a, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let s = ExtensionId::from(raw).to_string();
        assert!(s.starts_with("aappek"));
    }

    #[test]
    fn display_is_deterministic() {
        let a = ExtensionId::from_public_key(b"fixed key").to_string();
        let b = ExtensionId::from_public_key(b"fixed key").to_string();
        assert_eq!(a, b);
    }
}
