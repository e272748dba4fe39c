//! Bearer access tokens
//!
//! Tokens are HS256 JWTs carrying `{sub, scope, iat, exp}` and are never
//! stored server-side. Signature and structure are checked by
//! `jsonwebtoken`; expiry is checked against the caller's clock so it stays
//! consistent with code and challenge expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{PassgateError, Result};

/// Default token lifetime (1 hour)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Scope granted to every token
pub const TOKEN_SCOPE: &str = "basic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

/// Successful code exchange, serialized as the OAuth token response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is compared against the injected clock in verify_token
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue_token(&self, username: &str, now: DateTime<Utc>) -> Result<TokenResponse> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: username.to_string(),
            scope: TOKEN_SCOPE.to_string(),
            iat,
            exp: iat + self.ttl.num_seconds(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sign access token");
                PassgateError::Signing(e.to_string())
            })?;

        tracing::info!(username = %username, exp = claims.exp, "Issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Validate `token` and return its claims
    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            PassgateError::TokenInvalid
        })?;

        if now.timestamp() >= data.claims.exp {
            tracing::debug!(sub = %data.claims.sub, exp = data.claims.exp, "Access token expired");
            return Err(PassgateError::TokenExpired);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
