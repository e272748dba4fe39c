use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassgateError {
    #[error("username is required")]
    MissingUsername,

    #[error("no pending challenge for this ceremony")]
    ChallengeMissing,

    #[error("attestation could not be verified")]
    AttestationInvalid,

    #[error("assertion could not be verified")]
    AssertionInvalid,

    #[error("authorization code not found")]
    CodeNotFound,

    #[error("authorization code expired")]
    CodeExpired,

    #[error("access token is invalid")]
    TokenInvalid,

    #[error("access token expired")]
    TokenExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("entropy source failure: {0}")]
    Entropy(String),

    #[error("token signing failure: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, PassgateError>;
