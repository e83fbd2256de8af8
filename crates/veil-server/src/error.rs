//! HTTP error mapping.
//!
//! Client data/integrity problems map to 4xx, service misconfiguration to
//! 5xx. A failed decrypt is never substituted with plaintext or empty
//! output; the error is surfaced as-is (minus anything sensitive).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use veil_core::ScopeError;
use veil_crypto::CryptoError;

/// Error response of the encrypt/decrypt boundary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A client-side data problem.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    /// Response status. Test hook.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CryptoError> for ApiError {
    fn from(error: CryptoError) -> Self {
        // Every crypto failure on this boundary is a client data/integrity
        // problem: tampered or truncated envelope, unknown version, wrong
        // scope. Misconfiguration (missing secret) cannot reach here; it is
        // fatal at startup.
        Self::bad_request(error.to_string())
    }
}

impl From<ScopeError> for ApiError {
    fn from(error: ScopeError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_to_bad_request() {
        let error = ApiError::from(CryptoError::AuthenticationFailure);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let error = ApiError::from(CryptoError::UnsupportedVersion(9));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn scope_errors_map_to_bad_request() {
        let error = ApiError::from(ScopeError::ChannelIdOutOfRange(2_000_000));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
