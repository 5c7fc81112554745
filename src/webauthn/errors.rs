//! `WebAuthn` parsing error types
//!
//! This module defines the error types surfaced by the credential-format
//! pipeline: CBOR/COSE decoding, authenticator-data parsing, and DER
//! signature normalization.

use thiserror::Error;

/// `WebAuthn` errors that can occur while decoding authenticator output
#[derive(Debug, Error)]
pub enum WebAuthnError {
    /// CBOR decode yielded nothing or not the expected shape
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Authenticator data buffer too short or inconsistent length fields
    #[error("Malformed authenticator data: {0}")]
    MalformedAuthenticatorData(String),

    /// Invalid DER-encoded ECDSA signature
    #[error("Signature decode error: {0}")]
    SignatureDecodeError(String),

    /// Base64/JSON transport encoding error
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Local assertion signature check failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}
