//! The in-memory passkey authority
//!
//! [`Authority`] owns every table (users, pending challenges, authorization
//! codes) together with the verification primitive, the token service and
//! the clock. One instance backs one server; nothing is process-global.
//! The ceremony operations live in [`crate::ceremony`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::challenge::ChallengeStore;
use crate::clock::{Clock, SystemClock};
use crate::code::{CodeIssuer, DEFAULT_CODE_TTL_SECS};
use crate::error::{PassgateError, Result};
use crate::token::{TokenResponse, TokenService, DEFAULT_TOKEN_TTL_SECS};
use crate::user::UserDirectory;
use crate::verifier::CeremonyVerifier;

/// Default lifetime of a pending challenge (5 minutes)
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// Relying party and lifetime settings
#[derive(Clone)]
pub struct AuthorityConfig {
    /// Relying party id (effective domain), e.g. `localhost`
    pub rp_id: String,
    /// Human-readable relying party name
    pub rp_name: String,
    /// Origin the browser must report in client data
    pub origin: String,
    pub code_ttl: Duration,
    pub token_ttl: Duration,
    /// `None` keeps challenges until they are consumed or replaced
    pub challenge_ttl: Option<Duration>,
    /// HS256 signing key for access tokens
    pub token_secret: Vec<u8>,
    pub require_user_verification: bool,
}

impl Default for AuthorityConfig {
    /// Local development profile. The token secret is fixed, so production
    /// callers must always supply their own.
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Passkey Demo".to_string(),
            origin: "http://localhost:3001".to_string(),
            code_ttl: Duration::seconds(DEFAULT_CODE_TTL_SECS),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            challenge_ttl: Some(Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS)),
            token_secret: b"passgate-development-secret".to_vec(),
            require_user_verification: true,
        }
    }
}

impl std::fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("rp_id", &self.rp_id)
            .field("rp_name", &self.rp_name)
            .field("origin", &self.origin)
            .field("code_ttl", &self.code_ttl)
            .field("token_ttl", &self.token_ttl)
            .field("challenge_ttl", &self.challenge_ttl)
            .field("token_secret", &"<redacted>")
            .field("require_user_verification", &self.require_user_verification)
            .finish()
    }
}

/// Public view of a user, returned to token holders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub id: String,
    pub credentials_count: usize,
    pub registered_at: DateTime<Utc>,
}

/// Table sizes, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorityStats {
    pub users: usize,
    pub pending_challenges: usize,
    pub outstanding_codes: usize,
}

/// Entries dropped by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges: usize,
    pub codes: usize,
}

pub struct Authority {
    pub(crate) config: AuthorityConfig,
    pub(crate) users: UserDirectory,
    pub(crate) challenges: ChallengeStore,
    pub(crate) codes: CodeIssuer,
    pub(crate) tokens: TokenService,
    pub(crate) verifier: Arc<dyn CeremonyVerifier>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Authority {
    /// Create an authority on the system clock
    pub fn new(config: AuthorityConfig, verifier: Arc<dyn CeremonyVerifier>) -> Self {
        Self::with_clock(config, verifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AuthorityConfig,
        verifier: Arc<dyn CeremonyVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: UserDirectory::new(),
            challenges: ChallengeStore::with_ttl(config.challenge_ttl),
            codes: CodeIssuer::new(config.code_ttl),
            tokens: TokenService::new(&config.token_secret, config.token_ttl),
            verifier,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    /// Redeem a one-time code for an access token
    pub fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let now = self.clock.now();
        let username = self.codes.redeem_code(code, now)?;
        self.tokens.issue_token(&username, now)
    }

    /// Validate an access token, returning its subject
    pub fn verify_token(&self, token: &str) -> Result<String> {
        let claims = self.tokens.verify_token(token, self.clock.now())?;
        Ok(claims.sub)
    }

    /// Profile of the user `username`
    pub fn user_profile(&self, username: &str) -> Result<UserProfile> {
        let user = self.users.get(username).ok_or_else(|| {
            tracing::warn!(username = %username, "Token subject does not resolve to a user");
            PassgateError::UserNotFound
        })?;

        Ok(UserProfile {
            username: user.username,
            id: user.id.to_string(),
            credentials_count: user.credentials.len(),
            registered_at: user.created_at,
        })
    }

    /// Resolve the holder of `token`
    pub fn current_user(&self, token: &str) -> Result<UserProfile> {
        let username = self.verify_token(token)?;
        self.user_profile(&username)
    }

    /// Drop expired challenges and codes
    pub fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        SweepReport {
            challenges: self.challenges.sweep_expired(now),
            codes: self.codes.sweep_expired(now),
        }
    }

    pub fn stats(&self) -> AuthorityStats {
        AuthorityStats {
            users: self.users.len(),
            pending_challenges: self.challenges.len(),
            outstanding_codes: self.codes.len(),
        }
    }
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("config", &self.config)
            .field("users", &self.users)
            .field("challenges", &self.challenges)
            .field("codes", &self.codes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::verifier::MockVerifier;

    fn authority(clock: Arc<ManualClock>) -> Authority {
        Authority::with_clock(AuthorityConfig::default(), Arc::new(MockVerifier::new()), clock)
    }

    #[test]
    fn test_exchange_issues_token_for_code_owner() {
        let clock = Arc::new(ManualClock::starting_now());
        let authority = authority(clock.clone());
        let code = authority.codes.issue_code("carol", clock.now()).unwrap();

        let token = authority.exchange_code(&code).unwrap();
        assert_eq!(token.expires_in, 3600);
        assert_eq!(authority.verify_token(&token.access_token).unwrap(), "carol");
    }

    #[test]
    fn test_current_user_requires_known_subject() {
        let clock = Arc::new(ManualClock::starting_now());
        let authority = authority(clock.clone());
        let code = authority.codes.issue_code("ghost", clock.now()).unwrap();
        let token = authority.exchange_code(&code).unwrap();

        assert_eq!(
            authority.current_user(&token.access_token),
            Err(PassgateError::UserNotFound)
        );
    }

    #[test]
    fn test_sweep_and_stats() {
        let clock = Arc::new(ManualClock::starting_now());
        let authority = authority(clock.clone());
        authority.codes.issue_code("dave", clock.now()).unwrap();
        assert_eq!(authority.stats().outstanding_codes, 1);

        clock.advance(Duration::seconds(120));
        let report = authority.sweep_expired();
        assert_eq!(report.codes, 1);
        assert_eq!(authority.stats().outstanding_codes, 0);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", AuthorityConfig::default());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("passgate-development-secret"));
    }
}
