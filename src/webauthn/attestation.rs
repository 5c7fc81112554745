//! Attestation object processing
//!
//! A registration ceremony returns a CBOR-encoded attestation object; the
//! authenticator data record lives under its `authData` key. The attestation
//! statement itself is not evaluated here.

use ciborium::value::Value;

use super::errors::WebAuthnError;

/// Extract the raw authenticator data from a CBOR attestation object
///
/// # Errors
/// Returns `WebAuthnError::DecodeError` if the buffer is not a CBOR map or
/// has no `authData` byte string.
pub fn extract_auth_data(attestation_object: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let attestation: Value = ciborium::de::from_reader(attestation_object)
        .map_err(|e| WebAuthnError::DecodeError(format!("Invalid CBOR attestation: {e}")))?;

    let Some(Some(auth_data)) = attestation.as_map().map(|map| {
        map.iter()
            .find(|(k, _)| k.as_text() == Some("authData"))
            .and_then(|(_, v)| v.as_bytes())
    }) else {
        return Err(WebAuthnError::DecodeError(
            "Missing authData in attestation".to_string(),
        ));
    };

    Ok(auth_data.clone())
}
