//! End-to-end wallet lifecycle.
//!
//! Covers the full custody flow: generate a recovery phrase, build an
//! account manager, allocate fresh keys, sign and verify, snapshot the
//! vault and carry on from the restored copy.

use lightrail_core::{
    generate_mnemonic, AccountIndex, AccountManager, GetPassphrase, KeyDerivationPath, KeyIndex,
    KeyRole, KeysManager, Passphrase, PassphraseGetterError, WordCount,
};
use rand::rngs::OsRng;

fn get_passphrase(value: &'static str) -> impl GetPassphrase {
    move || async move { Ok(Passphrase::new(value)) }
}

fn path(account: u32, role: KeyRole, index: u32) -> KeyDerivationPath {
    KeyDerivationPath {
        account_index: AccountIndex(account),
        role,
        index: KeyIndex(index),
    }
}

/// 24-word phrase + passphrase "p1" -> derive {account 0, External, 0}
/// -> sign "hello" -> verify against the right key, reject against a
/// different derived key.
#[tokio::test]
async fn mnemonic_to_signed_message() {
    let mut rng = OsRng;
    let getter = get_passphrase("p1");
    let mnemonic = generate_mnemonic(WordCount::Words24).unwrap();
    assert_eq!(mnemonic.word_count(), 24);

    let mut keys = KeysManager::create(&mut rng, &getter, &mnemonic).await.unwrap();
    let p = path(0, KeyRole::External, 0);

    let verification_key = keys
        .derive(&mut rng, &getter, p, |signing_key| signing_key.verification_key())
        .await
        .unwrap();

    let signature = keys.sign(&mut rng, &getter, p, b"hello").await.unwrap();
    assert!(verification_key.verify(b"hello", &signature));
    assert_eq!(keys.verify(p, b"hello", &signature), Ok(true));

    let other = path(0, KeyRole::External, 1);
    let other_key = keys
        .derive(&mut rng, &getter, other, |signing_key| signing_key.verification_key())
        .await
        .unwrap();
    assert_ne!(verification_key, other_key);
    assert!(!other_key.verify(b"hello", &signature));
    assert_eq!(keys.verify(other, b"hello", &signature), Ok(false));
}

#[tokio::test]
async fn fresh_account_keys_are_monotone_and_survive_restore() {
    let mut rng = OsRng;
    let getter = get_passphrase("wallet passphrase");
    let mnemonic = generate_mnemonic(WordCount::Words24).unwrap();

    let mut manager = AccountManager::create(
        &mut rng,
        &getter,
        &mnemonic,
        AccountIndex(0),
        KeyRole::External,
    )
    .await
    .unwrap();

    let mut allocated = Vec::new();
    for expected in 0..3u32 {
        let (index, verification_key) = manager
            .derive_fresh_key(&mut rng, &getter, |index, signing_key| {
                (index, signing_key.verification_key())
            })
            .await
            .unwrap();
        assert_eq!(index, KeyIndex(expected), "indices are 0,1,2,... with no gaps");
        allocated.push((index, verification_key));
    }

    // Every allocated key is visible through the lookups.
    for (index, verification_key) in &allocated {
        assert_eq!(manager.lookup_verification_key(*index), Ok(*verification_key));
        assert_eq!(manager.lookup_key_index(verification_key), Ok(*index));
    }

    // Snapshot, restore, and continue the sequence from 3.
    let snapshot = serde_json::to_string(&manager.vault()).unwrap();
    let mut restored = AccountManager::from_vault(serde_json::from_str(&snapshot).unwrap());
    let next = restored
        .derive_fresh_key(&mut rng, &getter, |index, _| index)
        .await
        .unwrap();
    assert_eq!(next, KeyIndex(3));

    // The restored manager verifies a signature made before the snapshot.
    let signature = manager
        .sign(&mut rng, &getter, KeyIndex(1), b"persisted message")
        .await
        .unwrap();
    assert_eq!(
        restored.verify(KeyIndex(1), b"persisted message", &signature),
        Ok(true)
    );
}

#[tokio::test]
async fn derive_many_prompts_once_for_many_keys() {
    let mut rng = OsRng;
    let mnemonic = generate_mnemonic(WordCount::Words24).unwrap();

    // A counting getter: every decrypt costs one prompt.
    use std::sync::atomic::{AtomicUsize, Ordering};
    static PROMPTS: AtomicUsize = AtomicUsize::new(0);
    let counting = || async {
        PROMPTS.fetch_add(1, Ordering::SeqCst);
        Ok(Passphrase::new("p1"))
    };

    let mut keys = KeysManager::create(&mut rng, &counting, &mnemonic).await.unwrap();
    let before = PROMPTS.load(Ordering::SeqCst);

    let paths = [
        path(0, KeyRole::External, 0),
        path(0, KeyRole::External, 1),
        path(0, KeyRole::Internal, 0),
        path(0, KeyRole::Stake, 0),
    ];
    let count = keys
        .derive_many(&mut rng, &counting, &paths, |signing_keys| signing_keys.len())
        .await
        .unwrap();

    assert_eq!(count, 4);
    assert_eq!(PROMPTS.load(Ordering::SeqCst), before + 1, "one prompt for N keys");
}

#[tokio::test]
async fn passphrase_getter_failure_propagates_unchanged() {
    let mut rng = OsRng;
    let mnemonic = generate_mnemonic(WordCount::Words24).unwrap();
    let failing = || async {
        Err::<Passphrase, _>(PassphraseGetterError {
            reason: "hardware token unplugged".into(),
        })
    };

    let result = KeysManager::create(&mut rng, &failing, &mnemonic).await;
    let error = result.err().unwrap();
    assert_eq!(error.reason, "hardware token unplugged");
}
