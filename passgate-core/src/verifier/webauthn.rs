use ciborium::value::{Integer, Value as CborValue};
use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};

use super::{
    check_counter, AssertionResponse, AttestationResponse, AuthenticatorData, CeremonyVerifier,
    ClientData, Expected, StoredCredential, VerificationFailure, VerifiedAssertion,
    VerifiedRegistration, CLIENT_DATA_CREATE, CLIENT_DATA_GET,
};
use crate::encoding::{base64url_decode, base64url_encode};
use crate::options::{COSE_ALG_ES256, COSE_ALG_RS256};

// COSE_Key map labels (RFC 9053)
const COSE_KTY: i64 = 1;
const COSE_ALG: i64 = 3;
const COSE_EC2_CRV: i64 = -1;
const COSE_EC2_X: i64 = -2;
const COSE_EC2_Y: i64 = -3;
const COSE_RSA_N: i64 = -1;
const COSE_RSA_E: i64 = -2;

const COSE_KTY_EC2: i64 = 2;
const COSE_KTY_RSA: i64 = 3;
const COSE_CRV_P256: i64 = 1;

/// Offset of the credential id length within authenticator data (after aaguid)
const CRED_ID_LEN_OFFSET: usize = 53;

/// Verifies ES256 and RS256 passkeys with `ring`.
///
/// Attestation statements are not checked against a trust store: the
/// registration options request `none` conveyance, so a `none` statement must
/// be empty and any other format is accepted with its statement ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebauthnVerifier;

impl WebauthnVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl CeremonyVerifier for WebauthnVerifier {
    fn verify_registration(
        &self,
        response: &AttestationResponse,
        expected: &Expected,
    ) -> Result<VerifiedRegistration, VerificationFailure> {
        let client_data = ClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CLIENT_DATA_CREATE, expected)?;

        let attestation = AttestationObject::from_base64(&response.response.attestation_object)?;
        attestation.check_statement()?;

        let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;
        auth_data.verify(expected)?;
        if !auth_data.has_attested_credential() {
            return Err(VerificationFailure::AuthenticatorData(
                "attested credential data missing".to_string(),
            ));
        }

        let (credential_id, cose_key) = parse_attested_credential(&attestation.auth_data)?;
        let claimed_id = base64url_decode(&response.id)
            .map_err(|e| VerificationFailure::Format(format!("credential id: {e}")))?;
        if claimed_id != credential_id {
            return Err(VerificationFailure::Format(
                "credential id does not match authenticator data".to_string(),
            ));
        }

        let key = CoseKey::from_cbor(&cose_key)?;
        let public_key = key.to_cbor()?;

        tracing::debug!(
            fmt = %attestation.fmt,
            alg = key.alg(),
            counter = auth_data.counter,
            "Attestation verified"
        );

        Ok(VerifiedRegistration {
            credential_id: base64url_encode(credential_id),
            public_key,
            counter: auth_data.counter,
        })
    }

    fn verify_authentication(
        &self,
        response: &AssertionResponse,
        expected: &Expected,
        credential: StoredCredential<'_>,
    ) -> Result<VerifiedAssertion, VerificationFailure> {
        let client_data = ClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CLIENT_DATA_GET, expected)?;

        let raw_auth_data = base64url_decode(&response.response.authenticator_data)
            .map_err(|e| VerificationFailure::Format(format!("authenticatorData: {e}")))?;
        let auth_data = AuthenticatorData::parse(&raw_auth_data)?;
        auth_data.verify(expected)?;

        if let Some(handle) = response
            .response
            .user_handle
            .as_deref()
            .filter(|h| !h.is_empty())
        {
            let received = base64url_decode(handle)
                .map_err(|e| VerificationFailure::Format(format!("userHandle: {e}")))?;
            let stored = base64url_decode(credential.user_handle)
                .map_err(|e| VerificationFailure::Format(format!("stored user handle: {e}")))?;
            if received != stored {
                return Err(VerificationFailure::ClientData(
                    "user handle does not match credential owner".to_string(),
                ));
            }
        }

        check_counter(credential.counter, auth_data.counter)?;

        let signature = base64url_decode(&response.response.signature)
            .map_err(|e| VerificationFailure::Format(format!("signature: {e}")))?;

        let mut signed_data = Vec::with_capacity(auth_data.raw.len() + 32);
        signed_data.extend_from_slice(auth_data.raw);
        signed_data.extend_from_slice(client_data.hash().as_ref());

        CoseKey::from_cbor(credential.public_key)?.verify(&signed_data, &signature)?;

        Ok(VerifiedAssertion {
            new_counter: auth_data.counter,
        })
    }
}

struct AttestationObject {
    fmt: String,
    auth_data: Vec<u8>,
    att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    fn from_base64(encoded: &str) -> Result<Self, VerificationFailure> {
        let bytes = base64url_decode(encoded)
            .map_err(|e| VerificationFailure::Format(format!("attestationObject: {e}")))?;
        let value: CborValue = ciborium::de::from_reader(bytes.as_slice())
            .map_err(|e| VerificationFailure::Format(format!("attestationObject CBOR: {e}")))?;

        let CborValue::Map(entries) = value else {
            return Err(VerificationFailure::Format(
                "attestationObject is not a map".to_string(),
            ));
        };

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;
        for (key, value) in entries {
            match (key.as_text(), value) {
                (Some("fmt"), CborValue::Text(f)) => fmt = Some(f),
                (Some("authData"), CborValue::Bytes(d)) => auth_data = Some(d),
                (Some("attStmt"), CborValue::Map(s)) => att_stmt = Some(s),
                _ => {}
            }
        }

        match (fmt, auth_data, att_stmt) {
            (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(Self {
                fmt,
                auth_data,
                att_stmt,
            }),
            _ => Err(VerificationFailure::Format(
                "attestationObject missing fmt, authData or attStmt".to_string(),
            )),
        }
    }

    fn check_statement(&self) -> Result<(), VerificationFailure> {
        match self.fmt.as_str() {
            "none" if self.att_stmt.is_empty() => Ok(()),
            "none" => Err(VerificationFailure::Format(
                "none attestation with non-empty attStmt".to_string(),
            )),
            other => {
                tracing::debug!(fmt = %other, "Ignoring attestation statement");
                Ok(())
            }
        }
    }
}

/// Split attested credential data into (credential id, COSE key bytes)
fn parse_attested_credential(auth_data: &[u8]) -> Result<(Vec<u8>, Vec<u8>), VerificationFailure> {
    let id_start = CRED_ID_LEN_OFFSET + 2;
    if auth_data.len() < id_start {
        return Err(VerificationFailure::AuthenticatorData(
            "attested credential data truncated".to_string(),
        ));
    }
    let id_len = u16::from_be_bytes([
        auth_data[CRED_ID_LEN_OFFSET],
        auth_data[CRED_ID_LEN_OFFSET + 1],
    ]) as usize;
    let key_start = id_start + id_len;
    if auth_data.len() <= key_start {
        return Err(VerificationFailure::AuthenticatorData(
            "credential public key missing".to_string(),
        ));
    }

    // The key may be followed by extension data; decode one CBOR item and
    // re-encode it so only the key is stored.
    let key: CborValue = ciborium::de::from_reader(&auth_data[key_start..])
        .map_err(|e| VerificationFailure::Format(format!("credential public key CBOR: {e}")))?;
    let mut cose_key = Vec::new();
    ciborium::ser::into_writer(&key, &mut cose_key)
        .map_err(|e| VerificationFailure::Format(format!("credential public key: {e}")))?;

    Ok((auth_data[id_start..key_start].to_vec(), cose_key))
}

enum CoseKey {
    Es256 { x: Vec<u8>, y: Vec<u8> },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
}

impl CoseKey {
    fn from_cbor(encoded: &[u8]) -> Result<Self, VerificationFailure> {
        let value: CborValue = ciborium::de::from_reader(encoded)
            .map_err(|e| VerificationFailure::Format(format!("COSE key CBOR: {e}")))?;
        let CborValue::Map(entries) = value else {
            return Err(VerificationFailure::UnsupportedKey(
                "COSE key is not a map".to_string(),
            ));
        };

        let int = |label: i64| {
            entries.iter().find_map(|(k, v)| match (k, v) {
                (CborValue::Integer(k), CborValue::Integer(v)) if *k == Integer::from(label) => {
                    i64::try_from(i128::from(*v)).ok()
                }
                _ => None,
            })
        };
        let bytes = |label: i64| {
            entries.iter().find_map(|(k, v)| match (k, v) {
                (CborValue::Integer(k), CborValue::Bytes(b)) if *k == Integer::from(label) => {
                    Some(b.clone())
                }
                _ => None,
            })
        };

        match (int(COSE_KTY), int(COSE_ALG)) {
            (Some(COSE_KTY_EC2), Some(COSE_ALG_ES256)) => {
                if int(COSE_EC2_CRV) != Some(COSE_CRV_P256) {
                    return Err(VerificationFailure::UnsupportedKey(
                        "EC2 key is not on P-256".to_string(),
                    ));
                }
                match (bytes(COSE_EC2_X), bytes(COSE_EC2_Y)) {
                    (Some(x), Some(y)) if x.len() == 32 && y.len() == 32 => {
                        Ok(Self::Es256 { x, y })
                    }
                    _ => Err(VerificationFailure::UnsupportedKey(
                        "missing or invalid EC2 coordinates".to_string(),
                    )),
                }
            }
            (Some(COSE_KTY_RSA), Some(COSE_ALG_RS256)) => {
                match (bytes(COSE_RSA_N), bytes(COSE_RSA_E)) {
                    (Some(n), Some(e)) => Ok(Self::Rs256 { n, e }),
                    _ => Err(VerificationFailure::UnsupportedKey(
                        "missing RSA modulus or exponent".to_string(),
                    )),
                }
            }
            (kty, alg) => Err(VerificationFailure::UnsupportedKey(format!(
                "kty {kty:?} alg {alg:?}"
            ))),
        }
    }

    fn to_cbor(&self) -> Result<Vec<u8>, VerificationFailure> {
        let entry = |label: i64, value: CborValue| (CborValue::Integer(label.into()), value);
        let map = match self {
            Self::Es256 { x, y } => vec![
                entry(COSE_KTY, CborValue::Integer(COSE_KTY_EC2.into())),
                entry(COSE_ALG, CborValue::Integer(COSE_ALG_ES256.into())),
                entry(COSE_EC2_CRV, CborValue::Integer(COSE_CRV_P256.into())),
                entry(COSE_EC2_X, CborValue::Bytes(x.clone())),
                entry(COSE_EC2_Y, CborValue::Bytes(y.clone())),
            ],
            Self::Rs256 { n, e } => vec![
                entry(COSE_KTY, CborValue::Integer(COSE_KTY_RSA.into())),
                entry(COSE_ALG, CborValue::Integer(COSE_ALG_RS256.into())),
                entry(COSE_RSA_N, CborValue::Bytes(n.clone())),
                entry(COSE_RSA_E, CborValue::Bytes(e.clone())),
            ],
        };
        let mut out = Vec::new();
        ciborium::ser::into_writer(&CborValue::Map(map), &mut out)
            .map_err(|e| VerificationFailure::Format(format!("COSE key encode: {e}")))?;
        Ok(out)
    }

    fn alg(&self) -> i64 {
        match self {
            Self::Es256 { .. } => COSE_ALG_ES256,
            Self::Rs256 { .. } => COSE_ALG_RS256,
        }
    }

    fn verify(&self, message: &[u8], sig: &[u8]) -> Result<(), VerificationFailure> {
        let result = match self {
            Self::Es256 { x, y } => {
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, &point)
                    .verify(message, sig)
            }
            Self::Rs256 { n, e } => RsaPublicKeyComponents {
                n: n.as_slice(),
                e: e.as_slice(),
            }
            .verify(&signature::RSA_PKCS1_2048_8192_SHA256, message, sig),
        };
        result.map_err(|_| VerificationFailure::Signature)
    }
}
