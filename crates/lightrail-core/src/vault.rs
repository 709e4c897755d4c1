//! Passphrase-gated secret vault
//!
//! Encrypts one opaque secret (the root key) under a passphrase-derived
//! key using PBKDF2-HMAC-SHA256 + AES-256-GCM.
//!
//! # Security Notes
//!
//! - The AEAD nonce is rotated on every successful decryption; a vault
//!   snapshot taken after a decrypt never reuses a nonce.
//! - The passphrase is never stored; a wrong passphrase surfaces as an
//!   authentication failure, never as garbage plaintext.
//! - Plaintext is handed to a synchronous scoped callback and zeroized
//!   when the scope ends.

use std::future::Future;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Salt length for PBKDF2 and the integrity digest
pub const SALT_LEN: usize = 16;

/// Nonce length for AES-256-GCM
pub const NONCE_LEN: usize = 12;

/// PBKDF2-HMAC-SHA256 iteration count for passphrase stretching
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// AES-256 key length
const KEY_LEN: usize = 32;

/// SHA-256 output length
const DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("passphrase retrieval failed: {reason}")]
pub struct PassphraseGetterError {
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The passphrase capability itself failed; propagated unchanged.
    #[error(transparent)]
    PassphraseGetter(#[from] PassphraseGetterError),
    /// AEAD authentication failed: wrong passphrase or corrupted vault.
    #[error("invalid passphrase or corrupted vault")]
    InvalidPassphrase,
}

/// A passphrase held in memory, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Injected passphrase-retrieval capability.
///
/// Invoked once per create/decrypt/derive call. May suspend
/// indefinitely awaiting external input (a prompt, a hardware token).
/// Its failure is opaque to the core and never retried internally.
pub trait GetPassphrase: Send + Sync {
    fn passphrase(
        &self,
    ) -> impl Future<Output = Result<Passphrase, PassphraseGetterError>> + Send;
}

impl<F, Fut> GetPassphrase for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Passphrase, PassphraseGetterError>> + Send,
{
    fn passphrase(
        &self,
    ) -> impl Future<Output = Result<Passphrase, PassphraseGetterError>> + Send {
        self()
    }
}

/// An opaque secret byte buffer, zeroized on drop.
///
/// Only ever exposed to scoped callbacks; never retained beyond them.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Salt for PBKDF2 or the integrity digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt(#[serde(with = "crate::serde_hex")] [u8; SALT_LEN]);

impl Salt {
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SALT_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// AES-256-GCM nonce. Unique per encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CipherNonce(#[serde(with = "crate::serde_hex")] [u8; NONCE_LEN]);

impl CipherNonce {
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// AEAD ciphertext (secret + authentication tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(#[serde(with = "crate::serde_hex")] Vec<u8>);

impl Ciphertext {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Salted SHA-256 commitment to the secret, stored alongside the vault.
///
/// Computed once at creation and carried unchanged through nonce
/// rotations. Decryption relies on AEAD authentication instead; this is
/// tamper evidence for out-of-band copies of the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityDigest {
    salt: Salt,
    #[serde(with = "crate::serde_hex")]
    digest: [u8; DIGEST_LEN],
}

impl IntegrityDigest {
    fn commit<R: RngCore + CryptoRng>(rng: &mut R, secret: &Secret) -> Self {
        let salt = Salt::random(rng);
        Self {
            digest: salted_digest(&salt, secret),
            salt,
        }
    }

    /// Whether `secret` is the value this digest committed to.
    pub fn matches(&self, secret: &Secret) -> bool {
        salted_digest(&self.salt, secret) == self.digest
    }
}

fn salted_digest(salt: &Salt, secret: &Secret) -> [u8; DIGEST_LEN] {
    Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(secret.as_bytes())
        .finalize()
        .into()
}

/// Persisted vault record: everything needed to recover the secret
/// except the passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    salt: Salt,
    nonce: CipherNonce,
    ciphertext: Ciphertext,
    digest: IntegrityDigest,
}

impl Vault {
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn nonce(&self) -> &CipherNonce {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    pub fn digest(&self) -> &IntegrityDigest {
        &self.digest
    }
}

/// Stretch a passphrase into an AES-256 key.
fn stretch_key(passphrase: &Passphrase, salt: &Salt) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        key.as_mut_slice(),
    );
    key
}

fn seal(key: &[u8; KEY_LEN], nonce: &CipherNonce, plaintext: &[u8]) -> Ciphertext {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce.as_bytes()), plaintext)
        .expect("AES-GCM sealing of an in-memory buffer cannot fail");
    Ciphertext(ciphertext)
}

/// Owns one vault and mediates all access to its secret.
///
/// `decrypt` takes `&mut self`: rotation updates the stored nonce and
/// ciphertext, so concurrent decrypts on one vault are a compile error
/// rather than a runtime corruption hazard. Callers that need sharing
/// wrap the manager in a mutex.
pub struct SecretManager {
    vault: Vault,
}

impl SecretManager {
    /// Encrypt `secret` under a passphrase obtained from the capability.
    ///
    /// The secret is consumed and zeroized once sealed. A failing
    /// passphrase callback propagates unchanged, with no side effects.
    pub async fn create<R, G>(
        rng: &mut R,
        get_passphrase: &G,
        secret: Secret,
    ) -> Result<Self, PassphraseGetterError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        let passphrase = get_passphrase.passphrase().await?;
        let salt = Salt::random(rng);
        let key = stretch_key(&passphrase, &salt);
        let nonce = CipherNonce::random(rng);
        let ciphertext = seal(&key, &nonce, secret.as_bytes());
        let digest = IntegrityDigest::commit(rng, &secret);
        Ok(Self {
            vault: Vault {
                salt,
                nonce,
                ciphertext,
                digest,
            },
        })
    }

    /// Restore a manager from a persisted vault snapshot.
    pub fn from_vault(vault: Vault) -> Self {
        Self { vault }
    }

    /// Decrypt the secret and expose it to `with_secret` for the
    /// duration of the call.
    ///
    /// On success the vault is re-encrypted under a freshly drawn nonce
    /// before the secret is handed out, so the stored nonce is never
    /// reused. Authentication failure (wrong passphrase or tampered
    /// ciphertext) returns [`VaultError::InvalidPassphrase`] and leaves
    /// the vault untouched.
    pub async fn decrypt<R, G, F, T>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        with_secret: F,
    ) -> Result<T, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
        F: FnOnce(&Secret) -> T,
    {
        let passphrase = get_passphrase.passphrase().await?;
        let key = stretch_key(&passphrase, &self.vault.salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*key));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(self.vault.nonce.as_bytes()),
                self.vault.ciphertext.as_bytes(),
            )
            .map_err(|_| VaultError::InvalidPassphrase)?;
        let secret = Secret::new(plaintext);

        // Rotate before the secret is exposed: fresh nonce, same key.
        let nonce = CipherNonce::random(rng);
        self.vault.ciphertext = seal(&key, &nonce, secret.as_bytes());
        self.vault.nonce = nonce;
        trace!("vault nonce rotated");

        Ok(with_secret(&secret))
    }

    /// Current (post-rotation) persisted snapshot.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }
}
