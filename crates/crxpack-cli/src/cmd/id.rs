//! `crxpack id` - report the extension ID a signing key produces.

use std::path::Path;

use anyhow::{Context, Result};
use crxpack_core::ExtensionId;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};

/// Print the 32-character extension ID for the key at `key_path`.
pub fn id(key_path: &Path) -> Result<()> {
    let pem = std::fs::read_to_string(key_path)
        .with_context(|| format!("failed to read {}", key_path.display()))?;
    let private = RsaPrivateKey::from_pkcs8_pem(&pem)
        .with_context(|| format!("{} is not a PKCS#8 private key", key_path.display()))?;
    let spki = private
        .to_public_key()
        .to_public_key_der()
        .context("failed to export public key")?;

    println!("{}", ExtensionId::from_public_key(spki.as_bytes()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_file_reports_path() {
        let err = id(Path::new("/no/such/key.pem")).unwrap_err();
        assert!(err.to_string().contains("key.pem"));
    }
}
