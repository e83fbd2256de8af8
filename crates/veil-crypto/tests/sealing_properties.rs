//! Property-based tests for scope key sealing
//!
//! These tests verify the fundamental invariants of the crypto layer:
//!
//! 1. **Round-trip**: open(seal(m)) == m for all messages and scopes
//! 2. **Isolation**: an envelope never opens under a different scope
//! 3. **Integrity**: any single-bit corruption is rejected
//! 4. **Encoding**: the wire layout decodes to exactly what was encoded

use proptest::prelude::*;
use veil_crypto::{CipherEnvelope, CryptoError, NONCE_SIZE, derive_scope_key, open, scope_binding, seal};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_seal_open_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..1000),
        key_id in any::<u64>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
    ) {
        let key = derive_scope_key(b"property-master-secret", key_id);
        let aad = scope_binding(key_id);

        let envelope = seal(&key, nonce, &aad, &plaintext);
        let opened = open(&key, &aad, &envelope).unwrap();

        prop_assert_eq!(opened, plaintext);
    }

    #[test]
    fn prop_wrong_scope_never_opens(
        plaintext in prop::collection::vec(any::<u8>(), 0..200),
        key_id in any::<u64>(),
        other_id in any::<u64>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
    ) {
        prop_assume!(key_id != other_id);

        let envelope = seal(
            &derive_scope_key(b"property-master-secret", key_id),
            nonce,
            &scope_binding(key_id),
            &plaintext,
        );

        let result = open(
            &derive_scope_key(b"property-master-secret", other_id),
            &scope_binding(other_id),
            &envelope,
        );

        prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn prop_corruption_is_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..200),
        key_id in any::<u64>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
        flip in any::<(usize, u8)>(),
    ) {
        let key = derive_scope_key(b"property-master-secret", key_id);
        let aad = scope_binding(key_id);
        let mut envelope = seal(&key, nonce, &aad, &plaintext);

        let index = flip.0 % envelope.ciphertext.len();
        let mask = 1u8 << (flip.1 % 8);
        envelope.ciphertext[index] ^= mask;

        let result = open(&key, &aad, &envelope);
        prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn prop_envelope_bytes_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..500),
        key_id in any::<u64>(),
        nonce in any::<[u8; NONCE_SIZE]>(),
    ) {
        let key = derive_scope_key(b"property-master-secret", key_id);
        let aad = scope_binding(key_id);
        let envelope = seal(&key, nonce, &aad, &plaintext);

        let decoded = CipherEnvelope::from_bytes(&envelope.to_bytes()).unwrap();
        prop_assert_eq!(&decoded, &envelope);

        let decoded = CipherEnvelope::from_base64(&envelope.to_base64()).unwrap();
        prop_assert_eq!(&decoded, &envelope);
    }

    #[test]
    fn prop_derivation_deterministic(key_id in any::<u64>()) {
        let a = derive_scope_key(b"property-master-secret", key_id);
        let b = derive_scope_key(b"property-master-secret", key_id);
        prop_assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
