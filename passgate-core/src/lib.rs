//! Passgate Core - in-memory passkey authority
//!
//! This crate holds the server-side state of WebAuthn (passkey) ceremonies and
//! the bridge from a successful authentication to a bearer token.
//!
//! # Flow
//!
//! 1. `begin_registration` / `begin_authentication` record a challenge per
//!    username and return options for the browser
//! 2. `finish_registration` stores the verified credential
//! 3. `finish_authentication` verifies an assertion, enforces the signature
//!    counter and mints a 60 second one-time code
//! 4. `exchange_code` trades the code for an HS256 access token
//! 5. `current_user` resolves the token holder's profile
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use passgate_core::{Authority, AuthorityConfig, MockVerifier};
//!
//! # fn example() -> passgate_core::Result<()> {
//! let authority = Authority::new(AuthorityConfig::default(), Arc::new(MockVerifier::new()));
//! let origin = authority.config().origin.clone();
//!
//! let options = authority.begin_registration("bob", None)?;
//! let attestation =
//!     MockVerifier::registration_response("cred-1", b"key", &options.challenge, &origin);
//! authority.finish_registration("bob", &attestation)?;
//!
//! let options = authority.begin_authentication("bob")?;
//! let assertion =
//!     MockVerifier::authentication_response("cred-1", b"key", &options.challenge, &origin, 1);
//! let code = authority.finish_authentication("bob", &assertion)?;
//!
//! let token = authority.exchange_code(&code)?;
//! assert_eq!(authority.current_user(&token.access_token)?.username, "bob");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod authority;
pub mod ceremony;
pub mod challenge;
pub mod clock;
pub mod code;
pub mod encoding;
pub mod entropy;
pub mod error;
pub mod options;
pub mod token;
pub mod user;
pub mod verifier;

// Re-export main types for convenience
pub use authority::{Authority, AuthorityConfig, AuthorityStats, SweepReport, UserProfile};
pub use challenge::CeremonyKind;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PassgateError, Result};
pub use options::{CreationOptions, RequestOptions};
pub use token::TokenResponse;
pub use user::{Credential, User};
pub use verifier::{
    AssertionResponse, AttestationResponse, CeremonyVerifier, MockVerifier, VerificationFailure,
    WebauthnVerifier,
};
