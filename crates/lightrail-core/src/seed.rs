//! Recovery phrase management
//!
//! Mnemonic generation/parsing and Icarus master-key generation.
//!
//! The optional `second_factor` ("25th word") mixed into master-key
//! generation is distinct from the vault passphrase: the former changes
//! which wallet a phrase recovers, the latter only gates the in-memory
//! vault.

use bip39::{Language, Mnemonic};
use ed25519_bip32::{XPrv, XPRV_SIZE};
use pbkdf2::pbkdf2_hmac;
use rand::{CryptoRng, RngCore};
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroize;

use crate::keypair::RootKey;

/// PBKDF2-HMAC-SHA512 iteration count for Icarus master-key generation
const ICARUS_PBKDF2_ROUNDS: u32 = 4096;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

/// Recovery phrase length. More words, more entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Words12,
    Words15,
    Words18,
    Words21,
    Words24,
}

impl WordCount {
    pub fn words(self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words15 => 15,
            Self::Words18 => 18,
            Self::Words21 => 21,
            Self::Words24 => 24,
        }
    }

    /// Entropy carried by a phrase of this length, in bits.
    pub fn entropy_bits(self) -> usize {
        self.words() / 3 * 32
    }
}

/// Generate a random English mnemonic of the given length.
pub fn generate_mnemonic(word_count: WordCount) -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in(Language::English, word_count.words())
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Generate a mnemonic from an injected RNG.
pub fn generate_mnemonic_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    word_count: WordCount,
) -> Result<Mnemonic, SeedError> {
    Mnemonic::generate_in_with(rng, Language::English, word_count.words())
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Parse and checksum-validate an English mnemonic.
pub fn parse_mnemonic(words: &str) -> Result<Mnemonic, SeedError> {
    Mnemonic::parse_in(Language::English, words)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))
}

/// Icarus master-key generation.
///
/// PBKDF2-HMAC-SHA512 keyed by `second_factor` over the phrase's
/// entropy (4096 rounds, 96-byte output), then BIP32-Ed25519 bit
/// normalization. Deriving from the entropy rather than the BIP-39 seed
/// is what makes the result match `cardano-address` and the rest of the
/// Cardano tooling.
pub fn root_key_from_mnemonic(mnemonic: &Mnemonic, second_factor: &str) -> RootKey {
    let mut entropy = mnemonic.to_entropy();
    let mut xprv_bytes = [0u8; XPRV_SIZE];
    pbkdf2_hmac::<Sha512>(
        second_factor.as_bytes(),
        &entropy,
        ICARUS_PBKDF2_ROUNDS,
        &mut xprv_bytes,
    );
    let root = RootKey::from_xprv(XPrv::normalize_bytes_force3rd(xprv_bytes));
    xprv_bytes.zeroize();
    entropy.zeroize();
    root
}
