//! Per-scope key derivation from the master secret.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a derived scope key in bytes.
pub const SCOPE_KEY_SIZE: usize = 32;

/// A 256-bit symmetric key derived for a single scope.
///
/// Wiped from memory on drop. Never serialized, never logged.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ScopeKey([u8; SCOPE_KEY_SIZE]);

impl ScopeKey {
    /// Raw key bytes, for handing to the AEAD cipher.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SCOPE_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must not leak through Debug output
        f.write_str("ScopeKey(..)")
    }
}

/// Derive the symmetric key for a scope.
///
/// `key = SHA-256(master_secret ‖ decimal_string(key_id))`
///
/// Pure and total: same inputs always produce the same key, distinct
/// `key_id` values produce distinct keys (up to SHA-256 collisions). The
/// caller guarantees `master_secret` is non-empty; that precondition is
/// checked once at service startup, not here.
///
/// This function does not know whether a key id names a channel or a DM
/// conversation. Encoding the two id spaces into disjoint numeric ranges is
/// the caller's job when constructing the key id.
#[must_use]
pub fn derive_scope_key(master_secret: &[u8], key_id: u64) -> ScopeKey {
    let mut hasher = Sha256::new();
    hasher.update(master_secret);
    hasher.update(scope_binding(key_id));
    ScopeKey(hasher.finalize().into())
}

/// Canonical byte encoding of a scope key id.
///
/// Used both as the derivation input suffix and as AEAD associated data, so
/// the two bindings can never drift apart.
#[must_use]
pub fn scope_binding(key_id: u64) -> Vec<u8> {
    key_id.to_string().into_bytes()
}
