//! WebAuthn ceremony options sent to the browser
//!
//! These serialize to the JSON shape `navigator.credentials.create()` and
//! `navigator.credentials.get()` helpers expect, with binary fields already
//! base64url encoded.

use serde::{Deserialize, Serialize};

use crate::encoding::base64url_encode;
use crate::user::User;

/// Ceremony timeout advertised to the client, in milliseconds
pub const CEREMONY_TIMEOUT_MS: u64 = 60_000;

/// COSE algorithm identifier for ECDSA P-256 with SHA-256
pub const COSE_ALG_ES256: i64 = -7;
/// COSE algorithm identifier for RSASSA-PKCS1-v1_5 with SHA-256
pub const COSE_ALG_RS256: i64 = -257;

const PUBLIC_KEY_TYPE: &str = "public-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Base64url of the user's UUID bytes
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub kind: String,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CredentialDescriptor {
    fn public_key(id: String) -> Self {
        Self {
            id,
            kind: PUBLIC_KEY_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: String,
    pub authenticator_attachment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationExtensions {
    pub cred_props: bool,
}

/// Options for `navigator.credentials.create()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: u64,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
    pub extensions: CreationExtensions,
}

impl CreationOptions {
    /// Build registration options for `user`, excluding the credentials it
    /// already owns.
    pub fn for_user(
        challenge: String,
        rp: RelyingParty,
        user: &User,
        display_name: Option<&str>,
    ) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&user.username)
            .to_string();

        Self {
            challenge,
            rp,
            user: UserEntity {
                id: base64url_encode(user.id.as_bytes()),
                name: user.username.clone(),
                display_name,
            },
            pub_key_cred_params: [COSE_ALG_ES256, COSE_ALG_RS256]
                .into_iter()
                .map(|alg| PubKeyCredParam {
                    kind: PUBLIC_KEY_TYPE.to_string(),
                    alg,
                })
                .collect(),
            timeout: CEREMONY_TIMEOUT_MS,
            attestation: "none".to_string(),
            exclude_credentials: user
                .credential_ids()
                .into_iter()
                .map(CredentialDescriptor::public_key)
                .collect(),
            authenticator_selection: AuthenticatorSelection {
                resident_key: "required".to_string(),
                require_resident_key: true,
                user_verification: "required".to_string(),
                authenticator_attachment: "platform".to_string(),
            },
            extensions: CreationExtensions { cred_props: true },
        }
    }
}

/// Options for `navigator.credentials.get()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub challenge: String,
    pub rp_id: String,
    pub timeout: u64,
    pub user_verification: String,
    /// Omitted for users without credentials so the browser offers
    /// discoverable credentials instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
}

impl RequestOptions {
    pub fn for_user(challenge: String, rp_id: String, user: &User) -> Self {
        let allow_credentials = if user.credentials.is_empty() {
            None
        } else {
            Some(
                user.credential_ids()
                    .into_iter()
                    .map(CredentialDescriptor::public_key)
                    .collect(),
            )
        };

        Self {
            challenge,
            rp_id,
            timeout: CEREMONY_TIMEOUT_MS,
            user_verification: "required".to_string(),
            allow_credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Credential;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(credentials: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            credentials: credentials
                .iter()
                .map(|id| Credential {
                    id: id.to_string(),
                    public_key: vec![],
                    counter: 0,
                    created_at: Utc::now(),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn rp() -> RelyingParty {
        RelyingParty {
            name: "Passkey Demo".to_string(),
            id: "localhost".to_string(),
        }
    }

    #[test]
    fn test_creation_options_policy() {
        let u = user(&["cred-a"]);
        let options = CreationOptions::for_user("chal".into(), rp(), &u, None);
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["challenge"], "chal");
        assert_eq!(json["rp"]["id"], "localhost");
        assert_eq!(json["user"]["name"], "alice");
        assert_eq!(json["user"]["displayName"], "alice");
        assert_eq!(json["user"]["id"], base64url_encode(u.id.as_bytes()));
        assert_eq!(json["attestation"], "none");
        assert_eq!(json["timeout"], 60_000);
        assert_eq!(json["authenticatorSelection"]["residentKey"], "required");
        assert_eq!(json["authenticatorSelection"]["requireResidentKey"], true);
        assert_eq!(json["authenticatorSelection"]["userVerification"], "required");
        assert_eq!(
            json["authenticatorSelection"]["authenticatorAttachment"],
            "platform"
        );
        assert_eq!(json["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(json["pubKeyCredParams"][1]["alg"], -257);
        assert_eq!(json["pubKeyCredParams"][0]["type"], "public-key");
        assert_eq!(json["excludeCredentials"][0]["id"], "cred-a");
        assert_eq!(json["extensions"]["credProps"], true);
    }

    #[test]
    fn test_creation_options_display_name() {
        let u = user(&[]);
        let options = CreationOptions::for_user("c".into(), rp(), &u, Some("Alice A."));
        assert_eq!(options.user.display_name, "Alice A.");

        let blank = CreationOptions::for_user("c".into(), rp(), &u, Some("   "));
        assert_eq!(blank.user.display_name, "alice");
        assert!(blank.exclude_credentials.is_empty());
    }

    #[test]
    fn test_request_options_omit_allow_list_without_credentials() {
        let options = RequestOptions::for_user("c".into(), "localhost".into(), &user(&[]));
        let json = serde_json::to_value(&options).unwrap();

        assert!(json.get("allowCredentials").is_none());
        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["userVerification"], "required");
    }

    #[test]
    fn test_request_options_list_credentials() {
        let options =
            RequestOptions::for_user("c".into(), "localhost".into(), &user(&["a", "b"]));
        let allowed = options.allow_credentials.unwrap();
        assert_eq!(allowed.len(), 2);
        assert_eq!(allowed[1].id, "b");
        assert_eq!(allowed[0].kind, "public-key");
    }
}
