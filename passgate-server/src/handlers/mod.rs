//! HTTP request handlers

pub mod health;
pub mod token;
pub mod user;
pub mod webauthn;

pub use health::{health, not_found, HealthResponse};
pub use token::{exchange_code, TokenRequest};
pub use user::current_user;
pub use webauthn::{
    authentication_options, authentication_verify, registration_options, registration_verify,
    AuthenticationOptionsRequest, AuthenticationVerifyRequest, RegistrationOptionsRequest,
    RegistrationVerifyRequest, VerifyResponse,
};
