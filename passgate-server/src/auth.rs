//! Bearer token authentication
//!
//! Provides the `AuthenticatedUser` extractor for Axum handlers. Tokens are
//! the HS256 JWTs minted by the code exchange and are checked by the
//! authority, including expiry.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(ApiError::missing_auth_header)?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| ApiError::missing_auth_header())?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(ApiError::missing_auth_header)
}

/// Holder of a valid access token.
///
/// Use this as a handler parameter to require authentication:
/// ```ignore
/// async fn handler(user: AuthenticatedUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Token subject
    pub username: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let username = state.authority.verify_token(token)?;
        Ok(Self { username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/user");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer_token() {
        let parts = parts(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        let err = extract_bearer_token(&parts(None)).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_MISSING_TOKEN");
    }

    #[test]
    fn test_wrong_scheme() {
        let err = extract_bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_MISSING_TOKEN");

        let err = extract_bearer_token(&parts(Some("Bearer "))).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_MISSING_TOKEN");
    }
}
