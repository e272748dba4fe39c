//! Users and their passkey credentials
//!
//! Users are created lazily the first time a ceremony is requested for a
//! username and are never deleted. Credentials are only ever appended, and
//! the only field mutated after registration is the signature counter.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// A registered passkey
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Base64url of the authenticator's binary credential id
    pub id: String,
    /// COSE-encoded public key as returned by the authenticator
    #[serde(skip)]
    pub public_key: Vec<u8>,
    pub counter: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub credentials: Vec<Credential>,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn new(username: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            credentials: Vec::new(),
            created_at: now,
        }
    }

    /// Credential handles in registration order
    pub fn credential_ids(&self) -> Vec<String> {
        self.credentials.iter().map(|c| c.id.clone()).collect()
    }

    pub fn credential(&self, credential_id: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.id == credential_id)
    }
}

/// All known users keyed by username
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the user for `username`, creating it on first sight.
    ///
    /// Concurrent first requests for the same username agree on one user id.
    pub fn get_or_create(&self, username: &str, now: DateTime<Utc>) -> User {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let user = User::new(username, now);
                tracing::info!(username = %username, user_id = %user.id, "Created user");
                entry.insert(user).clone()
            }
        }
    }

    pub fn get(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|u| u.clone())
    }

    /// Append a credential, returning `false` if the user does not exist.
    pub fn append_credential(&self, username: &str, credential: Credential) -> bool {
        match self.users.get_mut(username) {
            Some(mut user) => {
                user.credentials.push(credential);
                true
            }
            None => false,
        }
    }

    /// Run `f` on one credential while holding the user's entry guard.
    ///
    /// Returns `None` when either the user or the credential is unknown, in
    /// which case `f` is not called. Anything `f` reads and writes on the
    /// credential is serialized against other ceremonies for the same user.
    pub fn with_credential_mut<T>(
        &self,
        username: &str,
        credential_id: &str,
        f: impl FnOnce(&mut Credential) -> T,
    ) -> Option<T> {
        let mut user = self.users.get_mut(username)?;
        let credential = user
            .credentials
            .iter_mut()
            .find(|c| c.id == credential_id)?;
        Some(f(credential))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("users", &self.users.len())
            .finish()
    }
}
