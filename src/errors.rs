//! Orchestration error types
//!
//! [`ExternalServiceError`] covers every non-success outcome from the proving
//! service and the bundler, including network failures; it is the only error
//! kind meant to be shown to an end user as a message string. [`FlowError`]
//! is what an orchestration run terminates with.

use thiserror::Error;

use crate::webauthn::WebAuthnError;

/// Non-success response from the proving service or the bundler
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ExternalServiceError(pub String);

/// Terminal error of an orchestration run
#[derive(Debug, Error)]
pub enum FlowError {
    /// Store miss at authentication time; fatal, not retried
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// Proving service or bundler failure
    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    /// Credential-format parsing failure
    #[error(transparent)]
    WebAuthn(#[from] WebAuthnError),

    /// Platform credential prompt failed or was dismissed
    #[error("Platform authenticator error: {0}")]
    Platform(String),
}
