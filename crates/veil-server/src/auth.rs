//! Auth collaborator boundary.
//!
//! Token issuance lives outside this core; the server only needs a seam to
//! hand a bearer credential to and get an identity back. The credential is
//! carried as a connection parameter and trusted for nothing until
//! [`TokenVerifier::verify`] accepts it.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Identity attached to a connection after successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Verified user id.
    pub user_id: u64,
    /// Verified display name.
    pub username: String,
}

/// The bearer credential was rejected. Carries no detail on purpose.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unauthorized: credential rejected")]
pub struct Unauthorized;

/// Verifies a bearer credential, once per connection.
pub trait TokenVerifier: Send + Sync {
    /// Verify a credential and return the identity it proves.
    ///
    /// # Errors
    ///
    /// Returns [`Unauthorized`] for malformed, forged, or expired
    /// credentials. The caller closes the connection without registering it.
    fn verify(&self, token: &str) -> Result<AuthContext, Unauthorized>;
}

/// Shared-secret token verifier.
///
/// Accepts tokens of the form `{user_id}.{username}.{hex tag}` where
/// `tag = SHA-256(secret ‖ user_id ‖ "." ‖ username)`. Stands in for the
/// external auth service in development and tests; a production deployment
/// plugs its own [`TokenVerifier`] in.
pub struct SharedSecretVerifier {
    secret: Vec<u8>,
}

impl SharedSecretVerifier {
    /// Create a verifier over a shared secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Mint a token this verifier accepts. Test and tooling helper.
    #[must_use]
    pub fn mint(&self, user_id: u64, username: &str) -> String {
        format!("{user_id}.{username}.{}", hex_tag(&self.secret, user_id, username))
    }
}

impl TokenVerifier for SharedSecretVerifier {
    fn verify(&self, token: &str) -> Result<AuthContext, Unauthorized> {
        let mut parts = token.splitn(3, '.');
        let user_id =
            parts.next().and_then(|part| part.parse::<u64>().ok()).ok_or(Unauthorized)?;
        let username = parts.next().filter(|name| !name.is_empty()).ok_or(Unauthorized)?;
        let tag = parts.next().ok_or(Unauthorized)?;

        let expected = hex_tag(&self.secret, user_id, username);
        if expected.as_bytes().ct_eq(tag.as_bytes()).into() {
            Ok(AuthContext { user_id, username: username.to_string() })
        } else {
            Err(Unauthorized)
        }
    }
}

impl std::fmt::Debug for SharedSecretVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret must not leak through Debug output
        f.write_str("SharedSecretVerifier(..)")
    }
}

fn hex_tag(secret: &[u8], user_id: u64, username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(user_id.to_string().as_bytes());
    hasher.update(b".");
    hasher.update(username.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
