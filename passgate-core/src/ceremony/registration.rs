use super::require_username;
use crate::authority::Authority;
use crate::challenge::CeremonyKind;
use crate::error::{PassgateError, Result};
use crate::options::{CreationOptions, RelyingParty};
use crate::user::Credential;
use crate::verifier::AttestationResponse;

impl Authority {
    /// Start registering a passkey for `username`, creating the user if needed.
    ///
    /// Any challenge still pending for the username is replaced.
    pub fn begin_registration(
        &self,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<CreationOptions> {
        let username = require_username(username)?;
        let user = self.users.get_or_create(username, self.clock.now());
        let challenge = self.issue_challenge(username, CeremonyKind::Registration)?;

        tracing::info!(
            username = %username,
            existing_credentials = user.credentials.len(),
            "Registration started"
        );

        Ok(CreationOptions::for_user(
            challenge,
            RelyingParty {
                name: self.config.rp_name.clone(),
                id: self.config.rp_id.clone(),
            },
            &user,
            display_name,
        ))
    }

    /// Verify an attestation against the pending registration challenge and
    /// store the new credential.
    ///
    /// The challenge is consumed even when verification fails; a failed
    /// attestation leaves the user untouched.
    pub fn finish_registration(
        &self,
        username: &str,
        response: &AttestationResponse,
    ) -> Result<Credential> {
        let username = username.trim();
        let challenge = self.consume_challenge(username, CeremonyKind::Registration)?;

        let verified = self
            .verifier
            .verify_registration(response, &self.expected(challenge))
            .map_err(|failure| {
                tracing::warn!(username = %username, reason = %failure, "Attestation rejected");
                PassgateError::AttestationInvalid
            })?;

        let now = self.clock.now();
        let user = self.users.get_or_create(username, now);
        if user.credential(&verified.credential_id).is_some() {
            tracing::warn!(
                username = %username,
                credential_id = %verified.credential_id,
                "Credential already registered"
            );
            return Err(PassgateError::AttestationInvalid);
        }

        let credential = Credential {
            id: verified.credential_id,
            public_key: verified.public_key,
            counter: verified.counter,
            created_at: now,
        };
        if !self.users.append_credential(username, credential.clone()) {
            return Err(PassgateError::UserNotFound);
        }

        tracing::info!(
            username = %username,
            credential_id = %credential.id,
            "Registration completed"
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::authority::{Authority, AuthorityConfig};
    use crate::error::PassgateError;
    use crate::verifier::MockVerifier;

    const ORIGIN: &str = "http://localhost:3001";

    fn authority() -> Authority {
        Authority::new(AuthorityConfig::default(), Arc::new(MockVerifier::new()))
    }

    #[test]
    fn test_blank_username_rejected() {
        assert_eq!(
            authority().begin_registration(" ", None).unwrap_err(),
            PassgateError::MissingUsername
        );
    }

    #[test]
    fn test_register_appends_credential() {
        let authority = authority();
        let options = authority.begin_registration("erin", Some("Erin")).unwrap();
        assert_eq!(options.user.display_name, "Erin");

        let response =
            MockVerifier::registration_response("cred-1", b"key", &options.challenge, ORIGIN);
        let credential = authority.finish_registration("erin", &response).unwrap();
        assert_eq!(credential.id, "cred-1");

        let options = authority.begin_registration("erin", None).unwrap();
        assert_eq!(options.exclude_credentials.len(), 1);
        assert_eq!(options.exclude_credentials[0].id, "cred-1");
    }

    #[test]
    fn test_failed_attestation_consumes_challenge() {
        let authority = authority();
        let options = authority.begin_registration("erin", None).unwrap();
        let bad = MockVerifier::registration_response("cred-1", b"key", "wrong", ORIGIN);

        assert_eq!(
            authority.finish_registration("erin", &bad).unwrap_err(),
            PassgateError::AttestationInvalid
        );

        let good =
            MockVerifier::registration_response("cred-1", b"key", &options.challenge, ORIGIN);
        assert_eq!(
            authority.finish_registration("erin", &good).unwrap_err(),
            PassgateError::ChallengeMissing
        );
        assert_eq!(authority.user_profile("erin").unwrap().credentials_count, 0);
    }

    #[test]
    fn test_duplicate_credential_rejected() {
        let authority = authority();
        for expected in [None, Some(PassgateError::AttestationInvalid)] {
            let options = authority.begin_registration("erin", None).unwrap();
            let response =
                MockVerifier::registration_response("cred-1", b"key", &options.challenge, ORIGIN);
            assert_eq!(authority.finish_registration("erin", &response).err(), expected);
        }
        assert_eq!(authority.user_profile("erin").unwrap().credentials_count, 1);
    }

    #[test]
    fn test_authentication_challenge_does_not_finish_registration() {
        let authority = authority();
        let options = authority.begin_authentication("erin").unwrap();
        let response =
            MockVerifier::registration_response("cred-1", b"key", &options.challenge, ORIGIN);

        assert_eq!(
            authority.finish_registration("erin", &response).unwrap_err(),
            PassgateError::ChallengeMissing
        );
        // The mismatched challenge was consumed
        assert_eq!(authority.stats().pending_challenges, 0);
    }
}
