#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

//! Authorize account-abstraction transactions with platform passkeys.
//!
//! The crate parses raw `WebAuthn` authenticator output into proving-circuit
//! inputs, obtains a zero-knowledge signature proof from an external
//! service, and submits the resulting ERC-4337 user operation to a bundler.

/// Version of the zkpasskey crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bundler;
pub mod errors;
pub mod orchestrator;
pub mod prover;
pub mod settings;
pub mod store;
pub mod webauthn;

/// Re-export commonly used items
pub use bundler::{BundlerRpc, HttpBundlerClient, UserOperation, UserOperationReceipt};
pub use errors::{ExternalServiceError, FlowError};
pub use orchestrator::{
    Orchestrator, PlatformAuthenticator, RegistrationRequest, SigningOutcome, TransactionRequest,
    TransactionStage,
};
pub use prover::{HttpProverClient, ProofInputs, ProofService};
pub use settings::ZkPasskeySettings;
pub use store::{CredentialStore, MemoryCredentialStore, StoredCredential};
pub use webauthn::{AuthenticatorData, CoseKey, EcdsaSignature, WebAuthnError};
