//! Encrypt/decrypt boundary handlers.
//!
//! HTTP-shaped but thin: each handler validates the scope, calls the
//! encryption service, and maps errors to statuses. The liveness probe has
//! no side effects and is used by orchestration to gate dependent services.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use veil_core::ScopeId;
use veil_crypto::CipherEnvelope;

use crate::{error::ApiError, state::AppState};

/// `POST /encrypt` request body.
#[derive(Debug, Deserialize)]
pub struct EncryptRequest {
    /// Scope to seal for.
    pub scope: ScopeId,
    /// Plaintext message body.
    pub plaintext: String,
}

/// `POST /encrypt` response body.
#[derive(Debug, Serialize)]
pub struct EncryptResponse {
    /// Sealed envelope, base64-encoded.
    pub envelope: String,
}

/// `POST /decrypt` request body.
#[derive(Debug, Deserialize)]
pub struct DecryptRequest {
    /// Scope the envelope was sealed for.
    pub scope: ScopeId,
    /// Sealed envelope, base64-encoded.
    pub envelope: String,
}

/// `POST /decrypt` response body.
#[derive(Debug, Serialize)]
pub struct DecryptResponse {
    /// Recovered plaintext.
    pub plaintext: String,
}

/// `GET /health` — liveness probe, no side effects.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /encrypt` — seal a plaintext for a scope.
pub async fn encrypt(
    State(state): State<AppState>,
    Json(request): Json<EncryptRequest>,
) -> Result<Json<EncryptResponse>, ApiError> {
    let scope = request.scope.validated()?;
    let envelope = state.encryption.encrypt(scope, request.plaintext.as_bytes());

    tracing::debug!(scope = %scope, "sealed message");
    Ok(Json(EncryptResponse { envelope: envelope.to_base64() }))
}

/// `POST /decrypt` — open a stored envelope for a scope.
pub async fn decrypt(
    State(state): State<AppState>,
    Json(request): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError> {
    let scope = request.scope.validated()?;
    let envelope = CipherEnvelope::from_base64(&request.envelope)?;

    let plaintext = state.encryption.decrypt(scope, &envelope).map_err(|error| {
        // The error names the failure class only; no key or plaintext
        // material is available to leak.
        tracing::warn!(scope = %scope, %error, "decrypt rejected");
        ApiError::from(error)
    })?;

    tracing::debug!(scope = %scope, "opened message");
    Ok(Json(DecryptResponse { plaintext: String::from_utf8_lossy(&plaintext).into_owned() }))
}
