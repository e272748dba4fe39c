//! Deterministic verifier for tests and local development
//!
//! Client data is checked exactly as the real verifier does (type, challenge,
//! origin), but no signatures are involved:
//! - the registered "public key" is the raw decoded `attestationObject`;
//! - an assertion's "signature" must equal that public key;
//! - the counter is read from bytes 33..37 of `authenticatorData`.
//!
//! `registration_response` and `authentication_response` build responses this
//! verifier accepts, so callers can simulate an authenticator.

use super::{
    check_counter, AssertionPayload, AssertionResponse, AttestationPayload, AttestationResponse,
    CeremonyVerifier, ClientData, Expected, StoredCredential, VerificationFailure,
    VerifiedAssertion, VerifiedRegistration, AUTH_DATA_MIN_LEN, CLIENT_DATA_CREATE,
    CLIENT_DATA_GET,
};
use crate::encoding::{base64url_decode, base64url_encode};

#[derive(Debug, Default, Clone, Copy)]
pub struct MockVerifier;

impl MockVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Build an attestation for `credential_id` carrying `public_key`
    pub fn registration_response(
        credential_id: &str,
        public_key: &[u8],
        challenge: &str,
        origin: &str,
    ) -> AttestationResponse {
        AttestationResponse {
            id: credential_id.to_string(),
            raw_id: credential_id.to_string(),
            kind: "public-key".to_string(),
            response: AttestationPayload {
                client_data_json: client_data(CLIENT_DATA_CREATE, challenge, origin),
                attestation_object: base64url_encode(public_key),
                transports: Vec::new(),
            },
        }
    }

    /// Build an assertion signed with `public_key` reporting `counter`
    pub fn authentication_response(
        credential_id: &str,
        public_key: &[u8],
        challenge: &str,
        origin: &str,
        counter: u32,
    ) -> AssertionResponse {
        let mut auth_data = vec![0u8; AUTH_DATA_MIN_LEN];
        auth_data[32] = super::flags::USER_PRESENT | super::flags::USER_VERIFIED;
        auth_data[33..37].copy_from_slice(&counter.to_be_bytes());

        AssertionResponse {
            id: credential_id.to_string(),
            raw_id: credential_id.to_string(),
            kind: "public-key".to_string(),
            response: AssertionPayload {
                client_data_json: client_data(CLIENT_DATA_GET, challenge, origin),
                authenticator_data: base64url_encode(auth_data),
                signature: base64url_encode(public_key),
                user_handle: None,
            },
        }
    }
}

fn client_data(kind: &str, challenge: &str, origin: &str) -> String {
    let json = serde_json::json!({
        "type": kind,
        "challenge": challenge,
        "origin": origin,
    });
    base64url_encode(json.to_string())
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>, VerificationFailure> {
    base64url_decode(value).map_err(|e| VerificationFailure::Format(format!("{field}: {e}")))
}

impl CeremonyVerifier for MockVerifier {
    fn verify_registration(
        &self,
        response: &AttestationResponse,
        expected: &Expected,
    ) -> Result<VerifiedRegistration, VerificationFailure> {
        ClientData::from_base64(&response.response.client_data_json)?
            .verify(CLIENT_DATA_CREATE, expected)?;

        let public_key = decode("attestationObject", &response.response.attestation_object)?;
        if public_key.is_empty() || response.id.is_empty() {
            return Err(VerificationFailure::Format(
                "empty credential".to_string(),
            ));
        }

        Ok(VerifiedRegistration {
            credential_id: response.id.clone(),
            public_key,
            counter: 0,
        })
    }

    fn verify_authentication(
        &self,
        response: &AssertionResponse,
        expected: &Expected,
        credential: StoredCredential<'_>,
    ) -> Result<VerifiedAssertion, VerificationFailure> {
        ClientData::from_base64(&response.response.client_data_json)?
            .verify(CLIENT_DATA_GET, expected)?;

        let auth_data = decode("authenticatorData", &response.response.authenticator_data)?;
        if auth_data.len() < AUTH_DATA_MIN_LEN {
            return Err(VerificationFailure::AuthenticatorData(
                "too short".to_string(),
            ));
        }
        let counter = u32::from_be_bytes([auth_data[33], auth_data[34], auth_data[35], auth_data[36]]);

        if let Some(handle) = response.response.user_handle.as_deref() {
            if handle != credential.user_handle {
                return Err(VerificationFailure::ClientData(
                    "user handle does not match credential owner".to_string(),
                ));
            }
        }

        check_counter(credential.counter, counter)?;

        if decode("signature", &response.response.signature)? != credential.public_key {
            return Err(VerificationFailure::Signature);
        }

        Ok(VerifiedAssertion {
            new_counter: counter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://localhost:3001";

    fn expected(challenge: &str) -> Expected {
        Expected {
            challenge: challenge.to_string(),
            origin: ORIGIN.to_string(),
            rp_id: "localhost".to_string(),
            require_user_verification: true,
        }
    }

    #[test]
    fn test_registration_round() {
        let response = MockVerifier::registration_response("cred-1", b"pk", "chal", ORIGIN);
        let verified = MockVerifier::new()
            .verify_registration(&response, &expected("chal"))
            .unwrap();
        assert_eq!(verified.credential_id, "cred-1");
        assert_eq!(verified.public_key, b"pk");
        assert_eq!(verified.counter, 0);
    }

    #[test]
    fn test_registration_wrong_origin() {
        let response =
            MockVerifier::registration_response("cred-1", b"pk", "chal", "https://evil.example");
        let result = MockVerifier::new().verify_registration(&response, &expected("chal"));
        assert!(matches!(result, Err(VerificationFailure::Origin { .. })));
    }

    #[test]
    fn test_authentication_checks_key_and_counter() {
        let verifier = MockVerifier::new();
        let stored = StoredCredential {
            public_key: b"pk",
            counter: 2,
            user_handle: "handle",
        };

        let ok = MockVerifier::authentication_response("cred-1", b"pk", "c", ORIGIN, 3);
        assert_eq!(
            verifier
                .verify_authentication(&ok, &expected("c"), stored)
                .unwrap()
                .new_counter,
            3
        );

        let stale = MockVerifier::authentication_response("cred-1", b"pk", "c", ORIGIN, 2);
        assert!(matches!(
            verifier.verify_authentication(&stale, &expected("c"), stored),
            Err(VerificationFailure::Counter { .. })
        ));

        let wrong_key = MockVerifier::authentication_response("cred-1", b"other", "c", ORIGIN, 9);
        assert_eq!(
            verifier.verify_authentication(&wrong_key, &expected("c"), stored),
            Err(VerificationFailure::Signature)
        );
    }

    #[test]
    fn test_authentication_wrong_ceremony_type() {
        let registration = MockVerifier::registration_response("cred-1", b"pk", "c", ORIGIN);
        let mut assertion = MockVerifier::authentication_response("cred-1", b"pk", "c", ORIGIN, 1);
        assertion.response.client_data_json = registration.response.client_data_json;

        let stored = StoredCredential {
            public_key: b"pk",
            counter: 0,
            user_handle: "handle",
        };
        let result = MockVerifier::new().verify_authentication(&assertion, &expected("c"), stored);
        assert!(matches!(result, Err(VerificationFailure::ClientData(_))));
    }
}
