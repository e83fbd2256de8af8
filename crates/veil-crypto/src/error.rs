//! Crypto error taxonomy.

/// Errors from envelope decoding and AEAD operations.
///
/// All variants are terminal for the message they concern: a failed open can
/// never succeed on retry with the same key and envelope, and there is no
/// unauthenticated fallback path.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The GCM tag did not verify: tampered ciphertext, wrong key, wrong
    /// scope binding, or corrupted envelope. Deliberately carries no detail
    /// beyond this, so nothing about the key or plaintext can leak.
    #[error("authentication failed: envelope rejected")]
    AuthenticationFailure,

    /// The envelope declares a format version this build does not know.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    /// The envelope is too short to contain a version, nonce, and tag.
    #[error("truncated envelope: {len} bytes, need at least {min}")]
    TruncatedEnvelope {
        /// Actual encoded length.
        len: usize,
        /// Minimum structurally valid length.
        min: usize,
    },

    /// The base64 transport encoding failed to decode.
    #[error("invalid envelope encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
}
