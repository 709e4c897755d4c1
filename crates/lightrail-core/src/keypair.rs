//! Key pairs and derivation paths
//!
//! Child signing keys follow the Cardano HD convention:
//!
//! ```text
//! m / 1852' / 1815' / account' / role / index
//! ```
//!
//! The first three steps are hardened (purpose, coin type, account);
//! role and index are soft. Derivation is two-stage: the hardened
//! prefix yields the account key, the soft suffix the signing key.

use std::fmt;

use ed25519_bip32::{DerivationScheme, XPrv};
use ed25519_dalek::Verifier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CIP-1852 purpose constant
pub const PURPOSE: u32 = 1852;

/// Cardano coin type (ADA)
pub const COIN_TYPE: u32 = 1815;

/// Hardened index offset per BIP-32
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Ed25519 verification key length
pub const VERIFICATION_KEY_LEN: usize = 32;

/// Ed25519 signature length
pub const SIGNATURE_LEN: usize = 64;

pub const fn harden(index: u32) -> u32 {
    HARDENED_OFFSET + index
}

/// Wallet/account namespace within the HD tree (the `account'` step).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AccountIndex(pub u32);

/// Key number within one (account, role) namespace (the `index` step).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KeyIndex(pub u32);

/// The `role` step of the derivation path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum KeyRole {
    /// Payment keys
    External = 0,
    /// Change keys
    Internal = 1,
    Stake = 2,
    DRep = 3,
}

impl KeyRole {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Addresses one key in the HD tree. Identity is structural.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KeyDerivationPath {
    pub account_index: AccountIndex,
    pub role: KeyRole,
    pub index: KeyIndex,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("not a valid extended root key")]
pub struct InvalidRootKeyBytes;

/// BIP32-Ed25519 extended root private key (96 bytes).
pub struct RootKey(XPrv);

impl RootKey {
    pub(crate) fn from_xprv(xprv: XPrv) -> Self {
        Self(xprv)
    }

    /// Re-validate root key bytes restored from a vault.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidRootKeyBytes> {
        XPrv::from_slice_verified(bytes)
            .map(Self)
            .map_err(|_| InvalidRootKeyBytes)
    }

    /// Raw 96-byte encoding; this is what the vault stores.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Derive the signing key addressed by `path`.
    ///
    /// Hardened prefix first (purpose / coin type / account), then the
    /// soft role/index suffix.
    pub fn derive_signing_key(&self, path: KeyDerivationPath) -> SigningKey {
        let account = self
            .0
            .derive(DerivationScheme::V2, harden(PURPOSE))
            .derive(DerivationScheme::V2, harden(COIN_TYPE))
            .derive(DerivationScheme::V2, harden(path.account_index.0));
        let child = account
            .derive(DerivationScheme::V2, path.role.index())
            .derive(DerivationScheme::V2, path.index.0);
        SigningKey(child)
    }
}

/// A derived signing key, valid only within the scope of the derive
/// call that produced it.
pub struct SigningKey(XPrv);

impl SigningKey {
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature: ed25519_bip32::Signature<Vec<u8>> = self.0.sign(message);
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes.copy_from_slice(signature.as_ref());
        Signature(bytes)
    }

    pub fn verification_key(&self) -> VerificationKey {
        let xpub = self.0.public();
        let mut bytes = [0u8; VERIFICATION_KEY_LEN];
        bytes.copy_from_slice(&xpub.as_ref()[..VERIFICATION_KEY_LEN]);
        VerificationKey(bytes)
    }
}

/// Ed25519 verification key. Compared by raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationKey(
    #[serde(with = "crate::serde_hex")] [u8; VERIFICATION_KEY_LEN],
);

impl VerificationKey {
    pub fn from_bytes(bytes: [u8; VERIFICATION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VERIFICATION_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Ed25519 verification of `signature` over `message`.
    ///
    /// Bytes that do not decode to a curve point verify nothing.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        key.verify(message, &signature).is_ok()
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKey({})", self.to_hex())
    }
}

/// Detached Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}
