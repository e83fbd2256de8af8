//! Service configuration.
//!
//! The master secret is an explicit constructor argument everywhere it is
//! used; nothing in the crypto path reads the process environment. Absence
//! of the secret is a startup failure, never a per-request fallback.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default capacity of the per-scope key cache.
pub const DEFAULT_KEY_CACHE_CAPACITY: usize = 1024;

/// Fatal configuration errors, detected once at process start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The master secret was not supplied or is empty.
    #[error("master secret is missing or empty; set VEIL_MASTER_SECRET")]
    MissingMasterSecret,
}

/// The single root secret all scope keys derive from.
///
/// Non-empty by construction and wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret(Vec<u8>);

impl MasterSecret {
    /// Validate and wrap the secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingMasterSecret`] for empty input. Callers
    /// treat this as fatal at startup.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ConfigError::MissingMasterSecret);
        }
        Ok(Self(bytes))
    }

    /// Raw secret bytes, for key derivation only.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret material must not leak through Debug output
        f.write_str("MasterSecret(..)")
    }
}
