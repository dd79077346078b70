//! Process-wide signing identity with lazy one-shot initialization.
//!
//! The extension ID is a deterministic function of the signing public key,
//! so downstream consumers (update checks, policy configuration) only work
//! if the same key signs every build. The store therefore creates the key
//! pair once per process and hands out the same identity for every
//! subsequent packaging call. With persistence enabled the private key also
//! survives process restarts as a PKCS#8 PEM blob at a configured path.
//!
//! There is no key rotation: rotating the key would change every ID derived
//! from it.

use std::path::PathBuf;
use std::sync::Arc;

use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{PackError, Result};
use crate::id::ExtensionId;

/// RSA modulus size for generated signing keys.
const RSA_BITS: usize = 2048;

/// Configuration for a [`KeyStore`].
///
/// Persistence is an explicit constructor input rather than an ambient
/// environment read; the host layer decides and passes it down.
#[derive(Debug, Clone)]
pub struct KeyStoreConfig {
    /// When true, load the key from `storage_path` if present and write a
    /// freshly generated key there before first use.
    pub persist: bool,
    /// Location of the PKCS#8 PEM private key blob.
    pub storage_path: PathBuf,
}

impl KeyStoreConfig {
    /// In-memory identity only; nothing touches disk.
    pub fn ephemeral() -> Self {
        Self {
            persist: false,
            storage_path: PathBuf::new(),
        }
    }

    /// Load/store the private key at `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            persist: true,
            storage_path: path.into(),
        }
    }
}

/// The RSA key pair used to sign packages.
///
/// The public half is exported as SPKI DER for hashing and for embedding in
/// the package header.
pub struct SigningIdentity {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl SigningIdentity {
    fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    /// Export the public key in SPKI DER encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Encoding`] if DER serialization fails.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.public.to_public_key_der()?.into_vec())
    }

    /// The extension ID every package signed by this identity will carry.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Encoding`] if the public key cannot be exported.
    pub fn extension_id(&self) -> Result<ExtensionId> {
        Ok(ExtensionId::from_public_key(&self.public_key_der()?))
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material.
        f.debug_struct("SigningIdentity").finish_non_exhaustive()
    }
}

/// Owns the signing identity for the process lifetime.
///
/// [`KeyStore::identity`] is idempotent: the first call initializes (load or
/// generate, persist if configured), every later call returns the cached
/// identity without touching storage. Initialization is a critical section:
/// concurrent first calls block on one another and all observe the identity
/// produced by whichever call won.
#[derive(Debug)]
pub struct KeyStore {
    config: KeyStoreConfig,
    identity: OnceCell<Arc<SigningIdentity>>,
}

impl KeyStore {
    /// Create a store with the given persistence configuration.
    pub fn new(config: KeyStoreConfig) -> Self {
        Self {
            config,
            identity: OnceCell::new(),
        }
    }

    /// Obtain the process signing identity, initializing it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::KeyStorage`] on persisted-key I/O failure,
    /// [`PackError::KeyParse`] on undecodable key material, and
    /// [`PackError::KeyGeneration`] if the crypto backend cannot produce a
    /// key pair. A failed initialization leaves the store empty, so a later
    /// call may retry.
    pub async fn identity(&self) -> Result<Arc<SigningIdentity>> {
        self.identity
            .get_or_try_init(|| self.init_identity())
            .await
            .cloned()
    }

    async fn init_identity(&self) -> Result<Arc<SigningIdentity>> {
        if self.config.persist {
            if let Some(identity) = self.load_persisted().await? {
                return Ok(Arc::new(identity));
            }
        }

        debug!(bits = RSA_BITS, "generating signing key pair");
        let private = tokio::task::spawn_blocking(|| {
            let mut rng = rand::thread_rng();
            RsaPrivateKey::new(&mut rng, RSA_BITS)
        })
        .await??;

        if self.config.persist {
            let pem = private.to_pkcs8_pem(LineEnding::LF)?;
            tokio::fs::write(&self.config.storage_path, pem.as_bytes())
                .await
                .map_err(|source| PackError::KeyStorage {
                    path: self.config.storage_path.clone(),
                    source,
                })?;
            info!(path = %self.config.storage_path.display(), "persisted signing key");
        }

        Ok(Arc::new(SigningIdentity::from_private(private)))
    }

    async fn load_persisted(&self) -> Result<Option<SigningIdentity>> {
        let path = &self.config.storage_path;
        let pem = match tokio::fs::read_to_string(path).await {
            Ok(pem) => pem,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PackError::KeyStorage {
                    path: path.clone(),
                    source,
                });
            }
        };

        let private = RsaPrivateKey::from_pkcs8_pem(&pem)?;
        info!(path = %path.display(), "loaded persisted signing key");
        Ok(Some(SigningIdentity::from_private(private)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn identity_is_cached_per_process() {
        let store = KeyStore::new(KeyStoreConfig::ephemeral());
        let a = store.identity().await.unwrap();
        let b = store.identity().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn persisted_key_survives_store_recreation() {
        let tmp = tempdir().unwrap();
        let key_path = tmp.path().join("key.pem");

        let first = KeyStore::new(KeyStoreConfig::persistent(&key_path));
        let id_a = first.identity().await.unwrap().extension_id().unwrap();
        assert!(key_path.exists());

        // A fresh store (simulating a restart) must load the same key.
        let second = KeyStore::new(KeyStoreConfig::persistent(&key_path));
        let id_b = second.identity().await.unwrap().extension_id().unwrap();
        assert_eq!(id_a, id_b);
    }

    #[tokio::test]
    async fn ephemeral_store_never_touches_disk() {
        let store = KeyStore::new(KeyStoreConfig::ephemeral());
        store.identity().await.unwrap();
        assert!(!std::path::Path::new("key.pem").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_first_calls_yield_one_identity() {
        let store = Arc::new(KeyStore::new(KeyStoreConfig::ephemeral()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.identity().await.unwrap() })
            })
            .collect();

        let mut identities = Vec::new();
        for task in tasks {
            identities.push(task.await.unwrap());
        }
        for identity in &identities[1..] {
            assert!(Arc::ptr_eq(&identities[0], identity));
        }
    }

    #[tokio::test]
    async fn failed_key_persist_is_a_storage_error() {
        let tmp = tempdir().unwrap();
        // Parent directory does not exist, so the persist write must fail.
        let key_path = tmp.path().join("no-such-dir").join("key.pem");

        let store = KeyStore::new(KeyStoreConfig::persistent(&key_path));
        let err = store.identity().await.unwrap_err();
        assert!(matches!(err, PackError::KeyStorage { .. }));
        assert!(err.to_string().contains("no-such-dir"));
    }

    #[tokio::test]
    async fn unreadable_key_material_is_a_parse_error() {
        let tmp = tempdir().unwrap();
        let key_path = tmp.path().join("key.pem");
        std::fs::write(&key_path, "not a pem at all").unwrap();

        let store = KeyStore::new(KeyStoreConfig::persistent(&key_path));
        let err = store.identity().await.unwrap_err();
        assert!(matches!(err, PackError::KeyParse(_)));
    }
}
