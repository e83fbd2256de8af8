//! Encryption service: the encrypt/decrypt boundary of the core.
//!
//! Wraps key derivation and the cipher codec behind two operations and owns
//! the nonce-uniqueness policy (fresh 96-bit CSPRNG nonce per seal). The
//! service is stateless across calls except for a bounded key cache, which
//! makes it safe to share between any number of concurrent callers and to
//! replicate horizontally without coordination.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use rand::{RngCore, rngs::OsRng};
use veil_crypto::{CipherEnvelope, CryptoError, NONCE_SIZE, ScopeKey, derive_scope_key, open, scope_binding, seal};

use crate::{
    config::{DEFAULT_KEY_CACHE_CAPACITY, MasterSecret},
    scope::ScopeId,
};

/// Per-scope encryption and decryption.
///
/// Derived keys are recomputed on demand or served from a bounded cache.
/// The cache lives exactly as long as the process; master-secret rotation is
/// unsupported, so no invalidation path exists beyond restart.
pub struct EncryptionService {
    master_secret: MasterSecret,
    /// key id → derived key. Bounded by `cache_capacity`; once full, keys
    /// for new scopes are derived per call instead of inserted.
    key_cache: Mutex<HashMap<u64, ScopeKey>>,
    cache_capacity: usize,
}

impl EncryptionService {
    /// Create a service with the default key-cache capacity.
    #[must_use]
    pub fn new(master_secret: MasterSecret) -> Self {
        Self::with_cache_capacity(master_secret, DEFAULT_KEY_CACHE_CAPACITY)
    }

    /// Create a service with an explicit key-cache capacity. Zero disables
    /// caching entirely.
    #[must_use]
    pub fn with_cache_capacity(master_secret: MasterSecret, cache_capacity: usize) -> Self {
        Self { master_secret, key_cache: Mutex::new(HashMap::new()), cache_capacity }
    }

    /// Seal a plaintext for a scope.
    ///
    /// Generates a fresh random nonce from the OS CSPRNG, derives (or looks
    /// up) the scope key, and binds the scope's key id as associated data.
    /// Sealing is total: derivation and the cipher have no failure path with
    /// a valid key.
    #[must_use]
    pub fn encrypt(&self, scope: ScopeId, plaintext: &[u8]) -> CipherEnvelope {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let key = self.scope_key(scope.key_id());
        seal(&key, nonce, &scope_binding(scope.key_id()), plaintext)
    }

    /// Open a stored envelope for a scope.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::AuthenticationFailure`] on tamper, wrong scope, or
    ///   corruption. Never retried here: the same key and envelope can only
    ///   fail again.
    /// - [`CryptoError::UnsupportedVersion`] for unknown envelope versions.
    pub fn decrypt(&self, scope: ScopeId, envelope: &CipherEnvelope) -> Result<Vec<u8>, CryptoError> {
        let key = self.scope_key(scope.key_id());
        open(&key, &scope_binding(scope.key_id()), envelope)
    }

    /// Number of cached scope keys. Test and diagnostics hook.
    pub fn cached_keys(&self) -> usize {
        self.key_cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn scope_key(&self, key_id: u64) -> ScopeKey {
        let mut cache = self.key_cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(key) = cache.get(&key_id) {
            return key.clone();
        }

        let key = derive_scope_key(self.master_secret.as_bytes(), key_id);
        if cache.len() < self.cache_capacity {
            cache.insert(key_id, key.clone());
        }
        key
    }
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("cached_keys", &self.cached_keys())
            .field("cache_capacity", &self.cache_capacity)
            .finish_non_exhaustive()
    }
}
