//! WebAuthn ceremony endpoints
//!
//! Each ceremony is an options/verify pair keyed by username. Options
//! responses are the JSON the browser passes to `navigator.credentials`.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use passgate_core::{AssertionResponse, AttestationResponse, CreationOptions, RequestOptions};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

/// Request for registration options
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptionsRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
    /// Defaults to the username
    #[schema(example = "Bob")]
    pub display_name: Option<String>,
}

/// Attestation from `navigator.credentials.create()`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationVerifyRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
    /// W3C PublicKeyCredential JSON with base64url fields
    #[schema(value_type = Object)]
    pub att_resp: AttestationResponse,
}

/// Request for authentication options
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthenticationOptionsRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
}

/// Assertion from `navigator.credentials.get()`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationVerifyRequest {
    #[serde(default)]
    #[schema(example = "bob")]
    pub username: String,
    /// W3C PublicKeyCredential JSON with base64url fields
    #[schema(value_type = Object)]
    pub auth_resp: AssertionResponse,
}

/// Result of a successful ceremony
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub verified: bool,
    /// One-time authorization code (authentication only, valid 60 seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015")]
    pub code: Option<String>,
}

/// POST /webauthn/registration/options
///
/// Creates the user on first sight and returns creation options with a fresh
/// challenge. Any earlier unconsumed challenge for the username is replaced.
#[utoipa::path(
    post,
    path = "/webauthn/registration/options",
    tag = "WebAuthn",
    request_body = RegistrationOptionsRequest,
    responses(
        (status = 200, description = "PublicKeyCredentialCreationOptions JSON"),
        (status = 400, description = "Missing username")
    )
)]
pub async fn registration_options(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationOptionsRequest>, JsonRejection>,
) -> Result<Json<CreationOptions>, ApiError> {
    let Json(req) = payload?;
    let options = state
        .authority
        .begin_registration(&req.username, req.display_name.as_deref())?;
    Ok(Json(options))
}

/// POST /webauthn/registration/verify
#[utoipa::path(
    post,
    path = "/webauthn/registration/verify",
    tag = "WebAuthn",
    request_body = RegistrationVerifyRequest,
    responses(
        (status = 200, description = "Credential registered", body = VerifyResponse),
        (status = 400, description = "Challenge missing or attestation invalid")
    )
)]
pub async fn registration_verify(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationVerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(req) = payload?;
    state
        .authority
        .finish_registration(&req.username, &req.att_resp)?;
    Ok(Json(VerifyResponse {
        verified: true,
        code: None,
    }))
}

/// POST /webauthn/authentication/options
///
/// `allowCredentials` is omitted for users without credentials so the
/// browser can offer a discoverable credential.
#[utoipa::path(
    post,
    path = "/webauthn/authentication/options",
    tag = "WebAuthn",
    request_body = AuthenticationOptionsRequest,
    responses(
        (status = 200, description = "PublicKeyCredentialRequestOptions JSON"),
        (status = 400, description = "Missing username")
    )
)]
pub async fn authentication_options(
    State(state): State<AppState>,
    payload: Result<Json<AuthenticationOptionsRequest>, JsonRejection>,
) -> Result<Json<RequestOptions>, ApiError> {
    let Json(req) = payload?;
    let options = state.authority.begin_authentication(&req.username)?;
    Ok(Json(options))
}

/// POST /webauthn/authentication/verify
///
/// On success returns a one-time code to redeem at `/oauth/token`.
#[utoipa::path(
    post,
    path = "/webauthn/authentication/verify",
    tag = "WebAuthn",
    request_body = AuthenticationVerifyRequest,
    responses(
        (status = 200, description = "Assertion verified, code issued", body = VerifyResponse),
        (status = 400, description = "Challenge missing or assertion invalid")
    )
)]
pub async fn authentication_verify(
    State(state): State<AppState>,
    payload: Result<Json<AuthenticationVerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(req) = payload?;
    let code = state
        .authority
        .finish_authentication(&req.username, &req.auth_resp)?;
    Ok(Json(VerifyResponse {
        verified: true,
        code: Some(code),
    }))
}
