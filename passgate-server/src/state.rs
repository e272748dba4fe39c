//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use passgate_core::{Authority, AuthorityConfig, WebauthnVerifier};

/// Application state containing shared resources.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Users, pending challenges, codes and the token service
    pub authority: Arc<Authority>,
}

impl AppState {
    pub fn new(authority: Arc<Authority>) -> Self {
        Self { authority }
    }

    /// State backed by the real WebAuthn verifier
    pub fn with_webauthn(config: AuthorityConfig) -> Self {
        Self::new(Arc::new(Authority::new(
            config,
            Arc::new(WebauthnVerifier::new()),
        )))
    }
}
