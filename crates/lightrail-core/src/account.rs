//! Account manager
//!
//! A namespace-restricted facade over [`KeysManager`] fixed to one
//! (account index, role) pair. Keys in the namespace are addressed by
//! bare index; fresh keys are allocated sequentially with no gaps.

use std::collections::BTreeMap;

use bip39::Mnemonic;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::keypair::{
    AccountIndex, KeyDerivationPath, KeyIndex, KeyRole, Signature, SigningKey, VerificationKey,
};
use crate::keys::{KeyInfo, KeysManager, KeysManagerVault};
use crate::vault::{GetPassphrase, PassphraseGetterError, Vault, VaultError};

/// Default namespace: first account, payment keys.
pub const DEFAULT_ACCOUNT_INDEX: AccountIndex = AccountIndex(0);
pub const DEFAULT_ROLE: KeyRole = KeyRole::External;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("account not found")]
pub struct AccountNotFound;

/// One (index, verification key) row of an [`AccountVault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub index: KeyIndex,
    pub verification_key: VerificationKey,
}

/// Namespace-restricted projection of the keys-manager vault.
///
/// Records the namespace explicitly so restoration needs no
/// out-of-band constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountVault {
    pub root_vault: Vault,
    pub account_index: AccountIndex,
    pub role: KeyRole,
    pub accounts: Vec<AccountEntry>,
}

pub struct AccountManager {
    keys: KeysManager,
    account_index: AccountIndex,
    role: KeyRole,
}

impl AccountManager {
    /// Build a manager over a fresh keys manager, restricted to
    /// `(account_index, role)`.
    pub async fn create<R, G>(
        rng: &mut R,
        get_passphrase: &G,
        mnemonic: &Mnemonic,
        account_index: AccountIndex,
        role: KeyRole,
    ) -> Result<Self, PassphraseGetterError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        let keys = KeysManager::create(rng, get_passphrase, mnemonic).await?;
        Ok(Self {
            keys,
            account_index,
            role,
        })
    }

    /// Restore a manager from its namespaced projection.
    pub fn from_vault(vault: AccountVault) -> Self {
        let key_infos = vault
            .accounts
            .iter()
            .map(|entry| KeyInfo {
                verification_key: entry.verification_key,
                path: KeyDerivationPath {
                    account_index: vault.account_index,
                    role: vault.role,
                    index: entry.index,
                },
            })
            .collect();
        Self {
            keys: KeysManager::from_vault(KeysManagerVault {
                root_vault: vault.root_vault,
                key_infos,
            }),
            account_index: vault.account_index,
            role: vault.role,
        }
    }

    fn path(&self, index: KeyIndex) -> KeyDerivationPath {
        KeyDerivationPath {
            account_index: self.account_index,
            role: self.role,
            index,
        }
    }

    /// Keys of this namespace, indexed by key number.
    fn accounts(&self) -> BTreeMap<KeyIndex, VerificationKey> {
        self.keys
            .key_infos()
            .filter(|info| {
                info.path.account_index == self.account_index && info.path.role == self.role
            })
            .map(|info| (info.path.index, info.verification_key))
            .collect()
    }

    /// Allocate the next free index and derive its key.
    ///
    /// Next index = 1 + the highest existing index (0 for an empty
    /// namespace): sequential and gap-free. `&mut self` serializes
    /// allocations; duplicate indices are unrepresentable without
    /// external sharing.
    pub async fn derive_fresh_key<R, G, F, T>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        with_fresh_key: F,
    ) -> Result<T, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
        F: FnOnce(KeyIndex, &SigningKey) -> T,
    {
        let next = self
            .accounts()
            .keys()
            .next_back()
            .map(|index| KeyIndex(index.0 + 1))
            .unwrap_or(KeyIndex(0));
        let path = self.path(next);
        debug!(index = next.0, "allocating fresh account key");
        self.keys
            .derive(rng, get_passphrase, path, |signing_key| {
                with_fresh_key(next, signing_key)
            })
            .await
    }

    /// Find the index of `verification_key` by raw-byte equality.
    pub fn lookup_key_index(
        &self,
        verification_key: &VerificationKey,
    ) -> Result<KeyIndex, AccountNotFound> {
        self.accounts()
            .into_iter()
            .find(|(_, cached)| cached == verification_key)
            .map(|(index, _)| index)
            .ok_or(AccountNotFound)
    }

    pub fn lookup_verification_key(
        &self,
        index: KeyIndex,
    ) -> Result<VerificationKey, AccountNotFound> {
        self.accounts().get(&index).copied().ok_or(AccountNotFound)
    }

    /// Sign `data` with the key at `index` (derives it under the hood).
    pub async fn sign<R, G>(
        &mut self,
        rng: &mut R,
        get_passphrase: &G,
        index: KeyIndex,
        data: &[u8],
    ) -> Result<Signature, VaultError>
    where
        R: RngCore + CryptoRng,
        G: GetPassphrase,
    {
        let path = self.path(index);
        self.keys.sign(rng, get_passphrase, path, data).await
    }

    /// Check `signature` over `message` against the cached key at
    /// `index`. Cache-only, like [`KeysManager::verify`].
    pub fn verify(
        &self,
        index: KeyIndex,
        message: &[u8],
        signature: &Signature,
    ) -> Result<bool, AccountNotFound> {
        self.keys
            .verify(self.path(index), message, signature)
            .map_err(|_| AccountNotFound)
    }

    /// Like [`verify`](Self::verify), addressed by key instead of index.
    pub fn verify_by_key(
        &self,
        verification_key: &VerificationKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<bool, AccountNotFound> {
        let index = self.lookup_key_index(verification_key)?;
        self.verify(index, message, signature)
    }

    /// Namespace-restricted snapshot for persistence.
    pub fn vault(&self) -> AccountVault {
        AccountVault {
            root_vault: self.keys.vault().root_vault,
            account_index: self.account_index,
            role: self.role,
            accounts: self
                .accounts()
                .into_iter()
                .map(|(index, verification_key)| AccountEntry {
                    index,
                    verification_key,
                })
                .collect(),
        }
    }
}
