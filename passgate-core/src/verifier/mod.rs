//! Signature verification primitive for WebAuthn ceremonies
//!
//! The authority treats verification as a black box behind
//! [`CeremonyVerifier`]: given the browser's response and what the server
//! expects, it answers verified or not plus the authenticator's new counter.
//! [`WebauthnVerifier`] does the real cryptography; [`MockVerifier`] is a
//! deterministic stand-in for tests and local development.

mod mock;
mod webauthn;

pub use mock::MockVerifier;
pub use webauthn::WebauthnVerifier;

use ring::digest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::base64url_decode;

/// Why a ceremony response was rejected.
///
/// Details are for server-side logs only; callers see an opaque
/// `AttestationInvalid` / `AssertionInvalid`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("malformed response: {0}")]
    Format(String),

    #[error("client data rejected: {0}")]
    ClientData(String),

    #[error("challenge mismatch")]
    Challenge,

    #[error("origin mismatch: expected {expected}, got {received}")]
    Origin { expected: String, received: String },

    #[error("authenticator data rejected: {0}")]
    AuthenticatorData(String),

    #[error("signature counter did not increase (stored {stored}, received {received})")]
    Counter { stored: u32, received: u32 },

    #[error("signature verification failed")]
    Signature,

    #[error("unsupported public key: {0}")]
    UnsupportedKey(String),
}

/// Attestation produced by `navigator.credentials.create()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    /// Base64url credential id
    pub id: String,
    #[serde(default)]
    pub raw_id: String,
    #[serde(rename = "type", default = "public_key_type")]
    pub kind: String,
    pub response: AttestationPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

/// Assertion produced by `navigator.credentials.get()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    /// Base64url credential id
    pub id: String,
    #[serde(default)]
    pub raw_id: String,
    #[serde(rename = "type", default = "public_key_type")]
    pub kind: String,
    pub response: AssertionPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

fn public_key_type() -> String {
    "public-key".to_string()
}

/// What the server expects a response to be bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// Base64url challenge exactly as issued
    pub challenge: String,
    pub origin: String,
    pub rp_id: String,
    pub require_user_verification: bool,
}

/// Stored state of the credential an assertion claims to use
#[derive(Debug, Clone, Copy)]
pub struct StoredCredential<'a> {
    pub public_key: &'a [u8],
    pub counter: u32,
    /// Base64url of the owning user's handle
    pub user_handle: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRegistration {
    /// Base64url credential id
    pub credential_id: String,
    /// COSE public key bytes
    pub public_key: Vec<u8>,
    pub counter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAssertion {
    pub new_counter: u32,
}

/// Verification primitive used by the ceremonies
pub trait CeremonyVerifier: Send + Sync {
    fn verify_registration(
        &self,
        response: &AttestationResponse,
        expected: &Expected,
    ) -> Result<VerifiedRegistration, VerificationFailure>;

    fn verify_authentication(
        &self,
        response: &AssertionResponse,
        expected: &Expected,
        credential: StoredCredential<'_>,
    ) -> Result<VerifiedAssertion, VerificationFailure>;
}

/// Counter rule shared by all verifiers.
///
/// The received counter must be strictly greater than the stored one, unless
/// both are zero (authenticator does not implement counters).
pub fn check_counter(stored: u32, received: u32) -> Result<(), VerificationFailure> {
    if (received > 0 || stored > 0) && received <= stored {
        return Err(VerificationFailure::Counter { stored, received });
    }
    Ok(())
}

pub(crate) const CLIENT_DATA_CREATE: &str = "webauthn.create";
pub(crate) const CLIENT_DATA_GET: &str = "webauthn.get";

/// Decoded `clientDataJSON`
#[derive(Debug, Clone)]
pub(crate) struct ClientData {
    pub kind: String,
    pub challenge: String,
    pub origin: String,
    /// Exact bytes the authenticator hashed
    pub raw: Vec<u8>,
}

#[derive(Deserialize)]
struct ClientDataJson {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

impl ClientData {
    pub fn from_base64(client_data_json: &str) -> Result<Self, VerificationFailure> {
        let raw = base64url_decode(client_data_json)
            .map_err(|e| VerificationFailure::Format(format!("clientDataJSON: {e}")))?;
        let parsed: ClientDataJson = serde_json::from_slice(&raw)
            .map_err(|e| VerificationFailure::ClientData(format!("invalid JSON: {e}")))?;

        Ok(Self {
            kind: parsed.kind,
            challenge: parsed.challenge,
            origin: parsed.origin,
            raw,
        })
    }

    /// Check ceremony type, challenge and origin
    pub fn verify(&self, expected_kind: &str, expected: &Expected) -> Result<(), VerificationFailure> {
        if self.kind != expected_kind {
            return Err(VerificationFailure::ClientData(format!(
                "type {} (expected {expected_kind})",
                self.kind
            )));
        }
        if self.challenge.trim_end_matches('=') != expected.challenge.trim_end_matches('=') {
            return Err(VerificationFailure::Challenge);
        }
        if self.origin != expected.origin {
            return Err(VerificationFailure::Origin {
                expected: expected.origin.clone(),
                received: self.origin.clone(),
            });
        }
        Ok(())
    }

    pub fn hash(&self) -> digest::Digest {
        digest::digest(&digest::SHA256, &self.raw)
    }
}

pub(crate) mod flags {
    pub const USER_PRESENT: u8 = 1 << 0;
    pub const USER_VERIFIED: u8 = 1 << 2;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 1 << 6;
}

/// Length of the fixed authenticator data prefix (rpIdHash, flags, counter)
pub(crate) const AUTH_DATA_MIN_LEN: usize = 37;

/// Parsed fixed prefix of authenticator data
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatorData<'a> {
    pub rp_id_hash: &'a [u8],
    pub flags: u8,
    pub counter: u32,
    /// Everything after the counter (attested credential data, extensions)
    pub rest: &'a [u8],
    pub raw: &'a [u8],
}

impl<'a> AuthenticatorData<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self, VerificationFailure> {
        if raw.len() < AUTH_DATA_MIN_LEN {
            return Err(VerificationFailure::AuthenticatorData(format!(
                "too short ({} bytes)",
                raw.len()
            )));
        }
        Ok(Self {
            rp_id_hash: &raw[..32],
            flags: raw[32],
            counter: u32::from_be_bytes([raw[33], raw[34], raw[35], raw[36]]),
            rest: &raw[AUTH_DATA_MIN_LEN..],
            raw,
        })
    }

    /// Check the relying party hash and presence/verification flags
    pub fn verify(&self, expected: &Expected) -> Result<(), VerificationFailure> {
        let rp_hash = digest::digest(&digest::SHA256, expected.rp_id.as_bytes());
        if self.rp_id_hash != rp_hash.as_ref() {
            return Err(VerificationFailure::AuthenticatorData(
                "rpIdHash mismatch".to_string(),
            ));
        }
        if self.flags & flags::USER_PRESENT == 0 {
            return Err(VerificationFailure::AuthenticatorData(
                "user not present".to_string(),
            ));
        }
        if expected.require_user_verification && self.flags & flags::USER_VERIFIED == 0 {
            return Err(VerificationFailure::AuthenticatorData(
                "user not verified".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_attested_credential(&self) -> bool {
        self.flags & flags::ATTESTED_CREDENTIAL_DATA != 0
    }
}
