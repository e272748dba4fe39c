//! OAuth-style code exchange

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use passgate_core::TokenResponse;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Code exchange request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// One-time code from `/webauthn/authentication/verify`
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015")]
    pub code: String,
}

/// POST /oauth/token
///
/// Redeems a one-time code for a Bearer token. A code works once; an expired
/// code is consumed by the failed attempt.
#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = "Token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "JSON with access_token, token_type (Bearer) and expires_in"),
        (status = 400, description = "Unknown, used or expired code")
    )
)]
pub async fn exchange_code(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = payload?;
    let token = state.authority.exchange_code(req.code.trim())?;
    Ok(Json(token))
}
