//! One-time authorization codes
//!
//! A code is minted after a successful authentication ceremony and redeemed
//! once for an access token. Redemption removes the code before looking at
//! its expiry, so a lapsed code is consumed as well.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::entropy::new_code;
use crate::error::{PassgateError, Result};

/// Default code lifetime (60 seconds)
pub const DEFAULT_CODE_TTL_SECS: i64 = 60;

/// Characters of a code that may appear in logs
const LOG_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Outstanding authorization codes
pub struct CodeIssuer {
    codes: DashMap<String, AuthorizationCode>,
    ttl: Duration,
}

impl Default for CodeIssuer {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CODE_TTL_SECS))
    }
}

impl CodeIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            codes: DashMap::new(),
            ttl,
        }
    }

    /// Mint a fresh code for `username`, valid until `now + ttl`
    pub fn issue_code(&self, username: &str, now: DateTime<Utc>) -> Result<String> {
        loop {
            let code = new_code()?;
            // 128 random bits make a collision practically impossible, but a
            // live code must never be overwritten.
            if let Entry::Vacant(slot) = self.codes.entry(code.clone()) {
                slot.insert(AuthorizationCode {
                    username: username.to_string(),
                    expires_at: now + self.ttl,
                });
                tracing::info!(
                    username = %username,
                    code_prefix = %log_prefix(&code),
                    "Issued authorization code"
                );
                return Ok(code);
            }
        }
    }

    /// Consume `code`, returning the username it was issued to
    pub fn redeem_code(&self, code: &str, now: DateTime<Utc>) -> Result<String> {
        let (_, entry) = self.codes.remove(code).ok_or_else(|| {
            tracing::warn!(code_prefix = %log_prefix(code), "Unknown authorization code");
            PassgateError::CodeNotFound
        })?;

        if now > entry.expires_at {
            tracing::warn!(
                username = %entry.username,
                code_prefix = %log_prefix(code),
                "Authorization code expired"
            );
            return Err(PassgateError::CodeExpired);
        }

        tracing::info!(
            username = %entry.username,
            code_prefix = %log_prefix(code),
            "Redeemed authorization code"
        );
        Ok(entry.username)
    }

    /// Drop lapsed codes, returning how many were removed
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, entry| now <= entry.expires_at);
        before.saturating_sub(self.codes.len())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl std::fmt::Debug for CodeIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIssuer")
            .field("codes", &self.codes.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn log_prefix(code: &str) -> &str {
    code.get(..LOG_PREFIX_LEN).unwrap_or(code)
}
