//! Platform authenticator boundary
//!
//! The browser or OS owns credential creation and assertion; this crate only
//! builds the options and consumes the responses. Hosts implement this trait
//! over whatever platform `WebAuthn` surface they have (e.g. a wasm binding
//! to `navigator.credentials`).

use async_trait::async_trait;

use crate::errors::FlowError;
use crate::webauthn::{
    AssertionOptions, AssertionResponse, CredentialCreationOptions, RegistrationResponse,
};

/// Platform `WebAuthn` credential API consumed by the orchestrator
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Prompt the user to create a new platform credential
    ///
    /// # Errors
    /// Returns `FlowError::Platform` if the prompt fails or is dismissed.
    async fn create_credential(
        &self,
        options: &CredentialCreationOptions,
    ) -> Result<RegistrationResponse, FlowError>;

    /// Prompt the user to sign a challenge with an existing credential
    ///
    /// # Errors
    /// Returns `FlowError::Platform` if the prompt fails or is dismissed.
    async fn get_assertion(
        &self,
        options: &AssertionOptions,
    ) -> Result<AssertionResponse, FlowError>;
}
