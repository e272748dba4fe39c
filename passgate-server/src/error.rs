//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use passgate_core::PassgateError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication error with specific error code
    #[error("{message}")]
    AuthError { message: String, code: String },

    /// Authority error - ceremony, code or token failure from passgate-core
    #[error("Passgate error: {0}")]
    Passgate(#[from] PassgateError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an authentication error with a specific error code
    pub fn auth_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Missing or non-Bearer Authorization header
    pub fn missing_auth_header() -> Self {
        Self::auth_error(
            "AUTH_MISSING_TOKEN",
            "Missing or invalid authorization header",
        )
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Passgate(e) => match e {
                // Client input and ceremony/code lifecycle failures → 400
                PassgateError::MissingUsername
                | PassgateError::ChallengeMissing
                | PassgateError::AttestationInvalid
                | PassgateError::AssertionInvalid
                | PassgateError::CodeNotFound
                | PassgateError::CodeExpired => StatusCode::BAD_REQUEST,

                // Bearer token failures → 401
                PassgateError::TokenInvalid | PassgateError::TokenExpired => {
                    StatusCode::UNAUTHORIZED
                }

                PassgateError::UserNotFound => StatusCode::NOT_FOUND,

                // Internal failures → 500
                PassgateError::Entropy(_) | PassgateError::Signing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::AuthError { code, .. } => code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Passgate(e) => match e {
                PassgateError::MissingUsername => "MISSING_USERNAME",
                PassgateError::ChallengeMissing => "CHALLENGE_MISSING",
                PassgateError::AttestationInvalid => "ATTESTATION_INVALID",
                PassgateError::AssertionInvalid => "ASSERTION_INVALID",
                PassgateError::CodeNotFound => "CODE_NOT_FOUND",
                PassgateError::CodeExpired => "CODE_EXPIRED",
                PassgateError::TokenInvalid => "AUTH_INVALID_TOKEN",
                PassgateError::TokenExpired => "AUTH_TOKEN_EXPIRED",
                PassgateError::UserNotFound => "USER_NOT_FOUND",
                PassgateError::Entropy(_) => "ENTROPY_ERROR",
                PassgateError::Signing(_) => "SIGNING_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Passgate(e) => match e {
                PassgateError::MissingUsername => "username required".to_string(),
                PassgateError::ChallengeMissing => "challenge missing".to_string(),
                PassgateError::AttestationInvalid | PassgateError::AssertionInvalid => {
                    "verify failed".to_string()
                }
                PassgateError::CodeNotFound => "invalid code".to_string(),
                PassgateError::CodeExpired => "code expired".to_string(),
                PassgateError::TokenInvalid => "Invalid token".to_string(),
                PassgateError::TokenExpired => "Token expired".to_string(),
                PassgateError::UserNotFound => "User not found".to_string(),
                PassgateError::Entropy(_) | PassgateError::Signing(_) => {
                    "Internal server error".to_string()
                }
            },
            // Internal details stay in the logs
            Self::Internal(_) => "Internal server error".to_string(),
            Self::AuthError { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::AuthError { .. } => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Passgate(e) => match e {
                PassgateError::MissingUsername => "client_input",
                PassgateError::ChallengeMissing => "ceremony_state",
                PassgateError::AttestationInvalid | PassgateError::AssertionInvalid => {
                    "verification"
                }
                PassgateError::CodeNotFound
                | PassgateError::CodeExpired
                | PassgateError::TokenInvalid
                | PassgateError::TokenExpired
                | PassgateError::UserNotFound => "credential_lifecycle",
                PassgateError::Entropy(_) | PassgateError::Signing(_) => "internal",
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code().to_string();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Server error"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Authentication error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = %code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passgate_status_mapping() {
        let cases = [
            (PassgateError::MissingUsername, StatusCode::BAD_REQUEST, "MISSING_USERNAME"),
            (PassgateError::ChallengeMissing, StatusCode::BAD_REQUEST, "CHALLENGE_MISSING"),
            (PassgateError::AssertionInvalid, StatusCode::BAD_REQUEST, "ASSERTION_INVALID"),
            (PassgateError::CodeExpired, StatusCode::BAD_REQUEST, "CODE_EXPIRED"),
            (PassgateError::TokenExpired, StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            (PassgateError::UserNotFound, StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            (
                PassgateError::Signing("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "SIGNING_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let api = ApiError::from(PassgateError::Entropy("rng offline".into()));
        assert_eq!(api.client_message(), "Internal server error");

        let api = ApiError::internal("database password leaked");
        assert_eq!(api.client_message(), "Internal server error");
    }

    #[test]
    fn test_missing_auth_header_code() {
        let api = ApiError::missing_auth_header();
        assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.error_code(), "AUTH_MISSING_TOKEN");
    }
}
