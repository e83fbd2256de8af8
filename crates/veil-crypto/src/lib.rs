//! Veil Cryptographic Primitives
//!
//! Cryptographic building blocks for Veil. Pure functions with deterministic
//! outputs. Callers provide random nonces, which keeps this crate free of RNG
//! state and makes every operation testable with fixed inputs.
//!
//! # Key Lifecycle
//!
//! One master secret fans out into a distinct symmetric key per conversation
//! scope. The derivation is a single deterministic hash, so keys are never
//! stored: they are recomputed (or served from a bounded in-process cache by
//! the caller) and zeroized on drop.
//!
//! ```text
//! Master Secret
//!        │
//!        ▼
//! SHA-256(master ‖ decimal scope key id) → Scope Key (32 bytes)
//!        │
//!        ▼
//! AES-256-GCM seal → CipherEnvelope (version ‖ nonce ‖ ciphertext+tag)
//! ```
//!
//! # Security
//!
//! Scope Isolation:
//! - Each scope derives its own key; compromising one scope's ciphertext
//!   reveals nothing about another scope's key
//! - The scope key id is additionally bound as AEAD associated data, so an
//!   envelope sealed for one scope can never verify under another
//!
//! Authenticity:
//! - AES-256-GCM provides tamper detection in the same primitive
//! - Failed authentication tag -> reject message, never partial plaintext
//!
//! Nonce Discipline:
//! - 96-bit nonces are supplied by the caller and MUST come from a CSPRNG in
//!   production; under a fixed key no two seals may reuse a nonce

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod derivation;
mod envelope;
mod error;
mod sealing;

pub use derivation::{SCOPE_KEY_SIZE, ScopeKey, derive_scope_key, scope_binding};
pub use envelope::{CipherEnvelope, ENVELOPE_VERSION, GCM_TAG_SIZE, NONCE_SIZE};
pub use error::CryptoError;
pub use sealing::{open, seal};
