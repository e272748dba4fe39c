use super::require_username;
use crate::authority::Authority;
use crate::challenge::CeremonyKind;
use crate::encoding::base64url_encode;
use crate::error::{PassgateError, Result};
use crate::options::RequestOptions;
use crate::verifier::{AssertionResponse, StoredCredential, VerificationFailure};

impl Authority {
    /// Start authenticating `username`, creating the user if needed.
    ///
    /// Users without credentials get options without `allowCredentials`, so
    /// the browser can offer discoverable credentials.
    pub fn begin_authentication(&self, username: &str) -> Result<RequestOptions> {
        let username = require_username(username)?;
        let user = self.users.get_or_create(username, self.clock.now());
        let challenge = self.issue_challenge(username, CeremonyKind::Authentication)?;

        tracing::info!(
            username = %username,
            credentials = user.credentials.len(),
            "Authentication started"
        );

        Ok(RequestOptions::for_user(
            challenge,
            self.config.rp_id.clone(),
            &user,
        ))
    }

    /// Verify an assertion and mint a one-time authorization code.
    ///
    /// The credential is looked up by the assertion's `id`; an unknown
    /// credential fails without invoking the verifier. The counter check,
    /// verification and counter update run under the user's entry lock.
    pub fn finish_authentication(
        &self,
        username: &str,
        response: &AssertionResponse,
    ) -> Result<String> {
        let username = username.trim();
        let challenge = self.consume_challenge(username, CeremonyKind::Authentication)?;

        let user = self.users.get(username).ok_or_else(|| {
            tracing::warn!(username = %username, "Assertion for unknown user");
            PassgateError::AssertionInvalid
        })?;
        let user_handle = base64url_encode(user.id.as_bytes());
        let expected = self.expected(challenge);

        let outcome = self
            .users
            .with_credential_mut(username, &response.id, |credential| {
                let verified = self.verifier.verify_authentication(
                    response,
                    &expected,
                    StoredCredential {
                        public_key: &credential.public_key,
                        counter: credential.counter,
                        user_handle: &user_handle,
                    },
                )?;
                let previous = credential.counter;
                credential.counter = verified.new_counter;
                Ok::<_, VerificationFailure>((previous, verified.new_counter))
            });

        match outcome {
            None => {
                tracing::warn!(
                    username = %username,
                    credential_id = %response.id,
                    "Assertion for unknown credential"
                );
                Err(PassgateError::AssertionInvalid)
            }
            Some(Err(failure)) => {
                tracing::warn!(
                    username = %username,
                    credential_id = %response.id,
                    reason = %failure,
                    "Assertion rejected"
                );
                Err(PassgateError::AssertionInvalid)
            }
            Some(Ok((previous, counter))) => {
                tracing::info!(
                    username = %username,
                    credential_id = %response.id,
                    previous_counter = previous,
                    counter,
                    "Authentication completed"
                );
                self.codes.issue_code(username, self.clock.now())
            }
        }
    }
}
