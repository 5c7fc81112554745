//! `WebAuthn` credential-format pipeline
//!
//! This module turns raw platform authenticator output into the inputs the
//! proving circuit consumes: a COSE public key, a parsed authenticator-data
//! record, and a normalized (r, s) ECDSA signature. It implements the
//! relevant parts of the W3C `WebAuthn` specification directly.

pub mod attestation;
pub mod authenticator;
pub mod cose;
pub mod crypto;
mod errors;
pub mod signature;
mod types;

// Re-exports for public use
pub use authenticator::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use cose::CoseKey;
pub use errors::WebAuthnError;
pub use signature::EcdsaSignature;
pub use types::*;
