//! In-memory storage for pending ceremony challenges
//!
//! Holds at most one outstanding challenge per username. Issuing a new
//! challenge for a username replaces whatever was pending, and taking a
//! challenge removes it, so every challenge backs at most one verification
//! attempt.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Which ceremony a challenge was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

/// A challenge waiting for its ceremony response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    /// Base64url challenge exactly as sent in the ceremony options
    pub challenge: String,
    pub kind: CeremonyKind,
    pub issued_at: DateTime<Utc>,
}

/// Pending challenges keyed by username
#[derive(Default)]
pub struct ChallengeStore {
    pending: DashMap<String, PendingChallenge>,
    /// Entries older than this are treated as missing (`None` = never expire)
    ttl: Option<Duration>,
}

impl ChallengeStore {
    /// Create a store whose challenges never expire on their own
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that treats challenges older than `ttl` as missing
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Record a challenge, replacing any unconsumed one for the same username
    pub fn put_challenge(&self, username: &str, challenge: PendingChallenge) {
        if let Some(previous) = self.pending.insert(username.to_string(), challenge) {
            tracing::debug!(
                username = %username,
                kind = ?previous.kind,
                "Replaced unconsumed challenge"
            );
        }
    }

    /// Atomically remove and return the pending challenge for `username`
    ///
    /// An expired entry is still removed, but reported as missing.
    pub fn take_challenge(&self, username: &str, now: DateTime<Utc>) -> Option<PendingChallenge> {
        let (_, entry) = self.pending.remove(username)?;
        if self.is_expired(&entry, now) {
            tracing::debug!(username = %username, "Pending challenge expired");
            None
        } else {
            Some(entry)
        }
    }

    /// Remove expired challenges, returning how many were dropped
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let before = self.pending.len();
        self.pending.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.pending.len())
    }

    /// Number of outstanding challenges
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, entry: &PendingChallenge, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now > entry.issued_at + ttl,
            None => false,
        }
    }
}

impl std::fmt::Debug for ChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeStore")
            .field("pending", &self.pending.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
