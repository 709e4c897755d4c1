//! Keys manager
//!
//! Wraps one [`SecretManager`] holding the root key and derives child
//! signing keys per path on demand. Verification keys are cached by
//! path so that signature checks never need the passphrase; signing
//! always re-derives from the freshly decrypted root.

use std::collections::BTreeMap;

use bip39::Mnemonic;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::keypair::{KeyDerivationPath, RootKey, Signature, SigningKey, VerificationKey};
use crate::seed::root_key_from_mnemonic;
use crate::vault::{
    GetPassphrase, PassphraseGetterError, Secret, SecretManager, Vault, VaultError,
};

/// A cached (verification key, path) pair. One per derived path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub verification_key: VerificationKey,
    pub path: KeyDerivationPath,
}

/// Persistable snapshot: the root vault plus every key derived so far.
///
/// Grows monotonically as new paths are derived; restoring it brings
/// back the full cache without re-deriving a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysManagerVault {
    pub root_vault: Vault,
    pub key_infos: Vec<KeyInfo>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyNotFound {
    #[error("no cached verification key for path {0:?}")]
    Path(KeyDerivationPath),
    #[error("verification key {0:?} has no cached derivation path")]
    VerificationKey(VerificationKey),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeysError {
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    KeyNotFound(#[from] KeyNotFound),
}

pub struct KeysManager {
    root: SecretManager,
    cache: BTreeMap<KeyDerivationPath, VerificationKey>,
}

impl KeysManager {
    /// Build a manager around a fresh vault sealing the root key
    /// generated from `mnemonic`.
    pub async fn create<R, G>(
        rng: &mut R,
        get_passphrase: &G,
        mnemonic: &Mnemonic,
    ) -> Result<Self, PassphraseGetterError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        let root_key = root_key_from_mnemonic(mnemonic, "");
        let secret = Secret::new(root_key.as_bytes().to_vec());
        let root = SecretManager::create(rng, get_passphrase, secret).await?;
        Ok(Self {
            root,
            cache: BTreeMap::new(),
        })
    }

    /// Restore a manager (root vault + full key cache) from a snapshot.
    pub fn from_vault(vault: KeysManagerVault) -> Self {
        let cache = vault
            .key_infos
            .into_iter()
            .map(|info| (info.path, info.verification_key))
            .collect();
        Self {
            root: SecretManager::from_vault(vault.root_vault),
            cache,
        }
    }

    /// Derive the signing key for `path` and expose it to
    /// `with_signing_key` for the duration of the call.
    ///
    /// The derived verification key is recorded in the cache;
    /// re-deriving a path is idempotent.
    pub async fn derive<R, G, F, T>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        path: KeyDerivationPath,
        with_signing_key: F,
    ) -> Result<T, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
        F: FnOnce(&SigningKey) -> T,
    {
        let Self { root, cache } = self;
        root.decrypt(rng, get_passphrase, |secret| {
            let root_key =
                RootKey::from_bytes(secret.as_bytes()).map_err(|_| VaultError::InvalidPassphrase)?;
            let signing_key = root_key.derive_signing_key(path);
            if cache
                .insert(path, signing_key.verification_key())
                .is_none()
            {
                debug!(?path, "cached verification key for new path");
            }
            Ok(with_signing_key(&signing_key))
        })
        .await?
    }

    /// Derive every path in `paths` under a single root decryption,
    /// so N keys cost one passphrase prompt. The slice handed to
    /// `with_signing_keys` is in input order.
    pub async fn derive_many<R, G, F, T>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        paths: &[KeyDerivationPath],
        with_signing_keys: F,
    ) -> Result<T, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
        F: FnOnce(&[SigningKey]) -> T,
    {
        let Self { root, cache } = self;
        root.decrypt(rng, get_passphrase, |secret| {
            let root_key =
                RootKey::from_bytes(secret.as_bytes()).map_err(|_| VaultError::InvalidPassphrase)?;
            let signing_keys: Vec<SigningKey> = paths
                .iter()
                .map(|path| root_key.derive_signing_key(*path))
                .collect();
            for (path, signing_key) in paths.iter().zip(&signing_keys) {
                cache.insert(*path, signing_key.verification_key());
            }
            Ok(with_signing_keys(&signing_keys))
        })
        .await?
    }

    /// Derive, then sign `data` with the key at `path`.
    pub async fn sign<R, G>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        path: KeyDerivationPath,
        data: &[u8],
    ) -> Result<Signature, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        self.derive(rng, get_passphrase, path, |signing_key| {
            signing_key.sign(data)
        })
        .await
    }

    /// Check `signature` over `message` against the cached key for
    /// `path`.
    ///
    /// Cache-only by design: a miss returns [`KeyNotFound`] instead of
    /// triggering a derivation, so verification stays usable without a
    /// passphrase prompt. Derive the path once first.
    pub fn verify(
        &self,
        path: KeyDerivationPath,
        message: &[u8],
        signature: &Signature,
    ) -> Result<bool, KeyNotFound> {
        let verification_key = self.cache.get(&path).ok_or(KeyNotFound::Path(path))?;
        Ok(verification_key.verify(message, signature))
    }

    /// The cached derivation path of `verification_key`, if any.
    pub fn lookup_path(&self, verification_key: &VerificationKey) -> Option<KeyDerivationPath> {
        self.cache
            .iter()
            .find(|(_, cached)| *cached == verification_key)
            .map(|(path, _)| *path)
    }

    /// Sign with whichever cached path owns `verification_key`.
    pub async fn sign_by_verification_key<R, G>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        verification_key: &VerificationKey,
        data: &[u8],
    ) -> Result<Signature, KeysError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        let path = self
            .lookup_path(verification_key)
            .ok_or(KeyNotFound::VerificationKey(*verification_key))?;
        Ok(self.sign(rng, get_passphrase, path, data).await?)
    }

    /// Every cached (key, path) pair, ordered by path.
    pub fn key_infos(&self) -> impl Iterator<Item = KeyInfo> + '_ {
        self.cache.iter().map(|(path, verification_key)| KeyInfo {
            verification_key: *verification_key,
            path: *path,
        })
    }

    /// Snapshot for persistence: root vault plus the full cache.
    pub fn vault(&self) -> KeysManagerVault {
        KeysManagerVault {
            root_vault: self.root.vault().clone(),
            key_infos: self.key_infos().collect(),
        }
    }
}
