//! Assertion hashing and local signature verification
//!
//! The message a `WebAuthn` authenticator signs is
//! `authenticatorData || SHA-256(clientDataJSON)`; the proving circuit takes
//! the SHA-256 digest of that payload. Before paying for a proof, the
//! assertion signature is also checked locally against the credential's
//! public key.

use ring::signature;
use sha2::{Digest, Sha256};

use super::errors::WebAuthnError;

/// SHA-256 digest of the client data JSON
#[must_use]
pub fn client_data_hash(client_data_json: &[u8]) -> [u8; 32] {
    Sha256::digest(client_data_json).into()
}

/// The signed payload: `authenticatorData || SHA-256(clientDataJSON)`
#[must_use]
pub fn signing_payload(authenticator_data: &[u8], client_data_hash: &[u8; 32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(authenticator_data.len() + client_data_hash.len());
    payload.extend_from_slice(authenticator_data);
    payload.extend_from_slice(client_data_hash);
    payload
}

/// SHA-256 digest of the signed payload, the `msghash` circuit input
#[must_use]
pub fn message_hash(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}

/// Verify a P-256 assertion signature against the credential coordinates
///
/// Takes the x and y coordinates from the credential's COSE key and the
/// DER-encoded signature exactly as the authenticator produced it.
///
/// # Errors
/// Returns `WebAuthnError::VerificationFailed` if the signature does not
/// verify over the payload.
pub fn verify_assertion(
    x: &[u8],
    y: &[u8],
    payload: &[u8],
    der_signature: &[u8],
) -> Result<(), WebAuthnError> {
    // Uncompressed SEC1 encoded public key: 0x04 || x || y
    let mut public_key = Vec::with_capacity(1 + x.len() + y.len());
    public_key.push(0x04);
    public_key.extend_from_slice(x);
    public_key.extend_from_slice(y);

    let verification_key =
        signature::UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, &public_key);

    verification_key.verify(payload, der_signature).map_err(|_| {
        WebAuthnError::VerificationFailed("P-256 assertion signature is invalid".to_string())
    })
}
