//! Lightrail Core
//!
//! Vault, key derivation and account management for Lightrail payment
//! channels.
//!
//! # Key Derivation
//!
//! From a single recovery phrase, child signing keys follow the Cardano
//! convention: m/1852'/1815'/account'/role/index.
//!
//! # Encrypted Storage
//!
//! The root key is encrypted at rest using PBKDF2-HMAC-SHA256 +
//! AES-256-GCM, with the AEAD nonce rotated on every decryption.

pub mod account;
pub mod keypair;
pub mod keys;
pub mod seed;
pub mod vault;

mod serde_hex;

pub use account::{AccountEntry, AccountManager, AccountNotFound, AccountVault};
pub use keypair::{
    AccountIndex, KeyDerivationPath, KeyIndex, KeyRole, RootKey, Signature, SigningKey,
    VerificationKey,
};
pub use keys::{KeyInfo, KeyNotFound, KeysError, KeysManager, KeysManagerVault};
pub use seed::{
    generate_mnemonic, generate_mnemonic_with, parse_mnemonic, root_key_from_mnemonic, SeedError,
    WordCount,
};
pub use vault::{
    GetPassphrase, Passphrase, PassphraseGetterError, Secret, SecretManager, Vault, VaultError,
};

pub use bip39::Mnemonic;
