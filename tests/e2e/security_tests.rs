//! Security-focused tests across the vault boundary.
//!
//! These verify:
//! 1. Wrong passphrases never yield plaintext
//! 2. Nonce rotation holds across repeated decrypts
//! 3. Tampered vault snapshots are rejected
//! 4. Cancellation leaves no partial writes
//! 5. Malformed wire payloads don't panic

use lightrail_channel::deserialize_cheque_content;
use lightrail_core::{
    GetPassphrase, Passphrase, PassphraseGetterError, Secret, SecretManager, Vault, VaultError,
};
use rand::rngs::OsRng;

fn get_passphrase(value: &'static str) -> impl GetPassphrase {
    move || async move { Ok(Passphrase::new(value)) }
}

#[tokio::test]
async fn wrong_passphrase_never_leaks_plaintext() {
    let mut rng = OsRng;
    let getter = get_passphrase("correct horse battery staple");
    let mut manager =
        SecretManager::create(&mut rng, &getter, Secret::new(b"root key material".to_vec()))
            .await
            .unwrap();

    let wrong = get_passphrase("wrong horse battery staple");
    let result = manager
        .decrypt(&mut rng, &wrong, |secret| secret.as_bytes().to_vec())
        .await;
    assert_eq!(result, Err(VaultError::InvalidPassphrase));

    // The correct passphrase still works.
    manager
        .decrypt(&mut rng, &getter, |secret| {
            assert_eq!(secret.as_bytes(), b"root key material");
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn nonces_never_repeat_across_decrypt_cycles() {
    let mut rng = OsRng;
    let getter = get_passphrase("pw");
    let mut manager = SecretManager::create(&mut rng, &getter, Secret::new(vec![0xAB; 96]))
        .await
        .unwrap();

    let mut seen = vec![*manager.vault().nonce()];
    for _ in 0..10 {
        manager.decrypt(&mut rng, &getter, |_| ()).await.unwrap();
        let nonce = *manager.vault().nonce();
        assert!(!seen.contains(&nonce), "nonce reuse breaks AES-GCM");
        seen.push(nonce);
    }
}

#[tokio::test]
async fn tampered_snapshot_fields_fail_decryption() {
    let mut rng = OsRng;
    let getter = get_passphrase("pw");
    let manager = SecretManager::create(&mut rng, &getter, Secret::new(vec![0x42; 64]))
        .await
        .unwrap();
    let snapshot = serde_json::to_value(manager.vault()).unwrap();

    for field in ["salt", "nonce", "ciphertext"] {
        let mut tampered = snapshot.clone();
        let original = tampered[field].as_str().unwrap();
        let flipped_first = if original.starts_with('0') { "1" } else { "0" };
        tampered[field] =
            serde_json::Value::String(format!("{}{}", flipped_first, &original[1..]));

        let vault: Vault = serde_json::from_value(tampered).unwrap();
        let mut restored = SecretManager::from_vault(vault);
        let result = restored.decrypt(&mut rng, &getter, |_| ()).await;
        assert_eq!(
            result,
            Err(VaultError::InvalidPassphrase),
            "tampered {field} must fail decryption"
        );
    }
}

#[tokio::test]
async fn cancellation_leaves_the_vault_untouched() {
    let mut rng = OsRng;
    let getter = get_passphrase("pw");
    let mut manager = SecretManager::create(&mut rng, &getter, Secret::new(vec![1; 32]))
        .await
        .unwrap();
    let before = manager.vault().clone();

    let cancelled = || async {
        Err::<Passphrase, _>(PassphraseGetterError {
            reason: "prompt dismissed".into(),
        })
    };
    let result = manager.decrypt(&mut rng, &cancelled, |_| ()).await;
    assert!(matches!(result, Err(VaultError::PassphraseGetter(_))));
    assert_eq!(&before, manager.vault());
}

#[test]
fn malformed_wire_payloads_are_rejected_not_panicked() {
    let cases: &[&[u8]] = &[
        b"",
        b"\x00",
        b"\xFF\xFF\xFF\xFF",
        b"\x84",                 // array(4) with no elements
        b"\x9F\xFF",             // empty indefinite array
        b"\x84\x40\x00\x00\x40", // right arity, wrong widths
        b"not cbor at all......",
    ];
    for payload in cases {
        assert!(
            deserialize_cheque_content(payload).is_err(),
            "payload {:?} must be rejected",
            payload
        );
    }
}

#[test]
fn fuzzed_wire_payloads_never_panic() {
    use rand::RngCore;
    let mut rng = OsRng;
    for _ in 0..200 {
        let mut payload = vec![0u8; (rng.next_u32() % 128) as usize];
        rng.fill_bytes(&mut payload);
        // Result does not matter; absence of panics does.
        let _ = deserialize_cheque_content(&payload);
    }
}
