//! Versioned ciphertext envelope.
//!
//! Wire layout: `[version: 1 byte] ‖ [nonce: 12 bytes] ‖ [ciphertext+tag]`.
//! The envelope is immutable once produced; decoding validates structure
//! only, authenticity is checked by [`crate::open`].

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::CryptoError;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes (trailing bytes of `ciphertext`).
pub const GCM_TAG_SIZE: usize = 16;

/// Minimum decodable envelope: version byte, nonce, and tag of an empty
/// plaintext.
const MIN_ENVELOPE_SIZE: usize = 1 + NONCE_SIZE + GCM_TAG_SIZE;

/// A sealed message: version tag, nonce, and ciphertext with the GCM tag in
/// its tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    /// Envelope format version, for forward compatibility.
    pub version: u8,
    /// The fresh random nonce this envelope was sealed with.
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext including the 16-byte GCM tag.
    pub ciphertext: Vec<u8>,
}

impl CipherEnvelope {
    /// Plaintext length (ciphertext length minus authentication tag).
    #[must_use]
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(GCM_TAG_SIZE)
    }

    /// Encode to the binary wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + NONCE_SIZE + self.ciphertext.len());
        out.push(self.version);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decode from the binary wire layout.
    ///
    /// Structural validation only: the version byte is carried through
    /// unchecked and rejected by [`crate::open`] if unknown.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::TruncatedEnvelope`] if `bytes` is too short to hold a
    ///   version, nonce, and authentication tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_ENVELOPE_SIZE {
            return Err(CryptoError::TruncatedEnvelope {
                len: bytes.len(),
                min: MIN_ENVELOPE_SIZE,
            });
        }

        let version = bytes[0];
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[1..=NONCE_SIZE]);
        let ciphertext = bytes[1 + NONCE_SIZE..].to_vec();

        Ok(Self { version, nonce, ciphertext })
    }

    /// Encode to base64 text, the transport form used by the HTTP boundary
    /// and persisted by the storage collaborator.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Decode from base64 text.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Encoding`] if the input is not valid base64.
    /// - [`CryptoError::TruncatedEnvelope`] if the decoded bytes are too
    ///   short.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64.decode(text)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CipherEnvelope {
        CipherEnvelope {
            version: ENVELOPE_VERSION,
            nonce: [0xAB; NONCE_SIZE],
            ciphertext: vec![0x42; 20],
        }
    }

    #[test]
    fn bytes_roundtrip() {
        let envelope = sample();
        let decoded = CipherEnvelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn base64_roundtrip() {
        let envelope = sample();
        let decoded = CipherEnvelope::from_base64(&envelope.to_base64()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn wire_layout() {
        let envelope = sample();
        let bytes = envelope.to_bytes();
        assert_eq!(bytes[0], ENVELOPE_VERSION);
        assert_eq!(&bytes[1..=NONCE_SIZE], &[0xAB; NONCE_SIZE]);
        assert_eq!(&bytes[1 + NONCE_SIZE..], &[0x42; 20]);
    }

    #[test]
    fn truncated_input_rejected() {
        // One byte short of version + nonce + tag
        let short = vec![0u8; 1 + NONCE_SIZE + GCM_TAG_SIZE - 1];
        let result = CipherEnvelope::from_bytes(&short);
        assert!(matches!(result, Err(CryptoError::TruncatedEnvelope { len: 28, min: 29 })));
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(
            CipherEnvelope::from_bytes(&[]),
            Err(CryptoError::TruncatedEnvelope { len: 0, .. })
        ));
    }

    #[test]
    fn minimum_envelope_accepted() {
        // Empty plaintext still carries a full tag
        let bytes = vec![ENVELOPE_VERSION; 1 + NONCE_SIZE + GCM_TAG_SIZE];
        let envelope = CipherEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.plaintext_len(), 0);
    }

    #[test]
    fn invalid_base64_rejected() {
        let result = CipherEnvelope::from_base64("not~~base64!!");
        assert!(matches!(result, Err(CryptoError::Encoding(_))));
    }

    #[test]
    fn unknown_version_survives_decode() {
        // Structural decode carries the version through; open() rejects it
        let mut bytes = sample().to_bytes();
        bytes[0] = 99;
        let envelope = CipherEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.version, 99);
    }

    #[test]
    fn plaintext_len_subtracts_tag() {
        let envelope = CipherEnvelope {
            version: ENVELOPE_VERSION,
            nonce: [0; NONCE_SIZE],
            ciphertext: vec![0; GCM_TAG_SIZE + 11],
        };
        assert_eq!(envelope.plaintext_len(), 11);
    }
}
