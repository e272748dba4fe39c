//! Registration and authentication ceremonies
//!
//! Each ceremony is a begin/finish pair on [`Authority`]. `begin_*` issues a
//! fresh challenge for the username, replacing any pending one; `finish_*`
//! consumes that challenge before verifying, whatever the outcome.

mod authentication;
mod registration;

use crate::authority::Authority;
use crate::challenge::{CeremonyKind, PendingChallenge};
use crate::entropy::new_challenge;
use crate::error::{PassgateError, Result};
use crate::verifier::Expected;

/// Trimmed username, rejecting blank input
fn require_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(PassgateError::MissingUsername);
    }
    Ok(username)
}

impl Authority {
    /// Generate and record a challenge for `username`
    fn issue_challenge(&self, username: &str, kind: CeremonyKind) -> Result<String> {
        let challenge = new_challenge()?;
        self.challenges.put_challenge(
            username,
            PendingChallenge {
                challenge: challenge.clone(),
                kind,
                issued_at: self.clock.now(),
            },
        );
        Ok(challenge)
    }

    /// Consume the pending challenge, which must belong to `kind`
    fn consume_challenge(&self, username: &str, kind: CeremonyKind) -> Result<String> {
        let pending = self
            .challenges
            .take_challenge(username, self.clock.now())
            .ok_or_else(|| {
                tracing::warn!(username = %username, ceremony = ?kind, "No pending challenge");
                PassgateError::ChallengeMissing
            })?;

        if pending.kind != kind {
            tracing::warn!(
                username = %username,
                expected = ?kind,
                found = ?pending.kind,
                "Pending challenge belongs to the other ceremony"
            );
            return Err(PassgateError::ChallengeMissing);
        }
        Ok(pending.challenge)
    }

    fn expected(&self, challenge: String) -> Expected {
        Expected {
            challenge,
            origin: self.config.origin.clone(),
            rp_id: self.config.rp_id.clone(),
            require_user_verification: self.config.require_user_verification,
        }
    }
}
