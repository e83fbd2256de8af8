//! Message sealing and opening with AES-256-GCM.
//!
//! Both functions are pure: the nonce is supplied by the caller, which owns
//! the randomness policy (a CSPRNG in production, fixed bytes in tests).

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{
    derivation::ScopeKey,
    envelope::{CipherEnvelope, ENVELOPE_VERSION, NONCE_SIZE},
    error::CryptoError,
};

/// Seal a plaintext under a scope key.
///
/// The scope binding is mixed in as AEAD associated data, so the resulting
/// envelope verifies only under the exact scope it was sealed for.
///
/// # Security
///
/// The nonce MUST be fresh per call under a given key; callers in production
/// draw it from a CSPRNG. Reuse breaks GCM confidentiality and authenticity.
#[must_use]
pub fn seal(key: &ScopeKey, nonce: [u8; NONCE_SIZE], aad: &[u8], plaintext: &[u8]) -> CipherEnvelope {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("AES-256-GCM encryption cannot fail with a valid key and nonce");
    };

    CipherEnvelope { version: ENVELOPE_VERSION, nonce, ciphertext }
}

/// Open an envelope under a scope key.
///
/// # Errors
///
/// - [`CryptoError::UnsupportedVersion`] if the envelope's version is
///   unknown to this build.
/// - [`CryptoError::AuthenticationFailure`] if the tag does not verify:
///   tampered ciphertext, wrong key, or wrong scope binding. Never returns
///   partial or empty plaintext in that case.
pub fn open(key: &ScopeKey, aad: &[u8], envelope: &CipherEnvelope) -> Result<Vec<u8>, CryptoError> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(CryptoError::UnsupportedVersion(envelope.version));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&envelope.nonce);

    cipher
        .decrypt(nonce, Payload { msg: envelope.ciphertext.as_slice(), aad })
        .map_err(|_| CryptoError::AuthenticationFailure)
}
