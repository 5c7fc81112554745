//! COSE public key decoding
//!
//! A COSE key is a CBOR map from small signed integer labels to values
//! (RFC 8152 §7). This module decodes the first CBOR item of a buffer into
//! a [`CoseKey`] and exposes typed accessors for the labels a P-256
//! `WebAuthn` credential uses. Re-encoding with [`CoseKey::to_bytes`]
//! reproduces the original bytes for canonically encoded input, which the
//! authenticator-data parser relies on to advance its cursor past the
//! embedded key.

use ciborium::value::{Integer, Value};

use super::errors::WebAuthnError;

/// COSE label for the key type (1 = OKP, 2 = EC2, 3 = RSA)
pub const LABEL_KTY: i64 = 1;
/// COSE label for the algorithm identifier (-7 = ES256)
pub const LABEL_ALG: i64 = 3;
/// COSE label for the elliptic curve (1 = P-256)
pub const LABEL_CRV: i64 = -1;
/// COSE label for the x coordinate
pub const LABEL_X: i64 = -2;
/// COSE label for the y coordinate
pub const LABEL_Y: i64 = -3;

/// A decoded COSE key map with typed per-label accessors
#[derive(Debug, Clone, PartialEq)]
pub struct CoseKey {
    entries: Vec<(Value, Value)>,
}

impl CoseKey {
    /// Decode the first CBOR item from `input` as a COSE key map
    ///
    /// Trailing bytes after the first item are ignored; the caller can use
    /// [`CoseKey::to_bytes`] to learn how many bytes the item occupied.
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the buffer is empty, is not
    /// valid CBOR, or its first item is not a map.
    pub fn decode_first(input: &[u8]) -> Result<Self, WebAuthnError> {
        if input.is_empty() {
            return Err(WebAuthnError::DecodeError(
                "CBOR input data was empty".to_string(),
            ));
        }

        let value: Value = ciborium::de::from_reader(input)
            .map_err(|e| WebAuthnError::DecodeError(format!("Invalid CBOR: {e}")))?;

        let Value::Map(entries) = value else {
            return Err(WebAuthnError::DecodeError(
                "COSE key is not a map".to_string(),
            ));
        };

        Ok(Self { entries })
    }

    /// Re-encode the key map back to CBOR bytes
    ///
    /// For canonically encoded input (deterministic map key ordering,
    /// minimal-length integers) the output is byte-identical to the slice
    /// the key was decoded from.
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WebAuthnError> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Value::Map(self.entries.clone()), &mut out)
            .map_err(|e| WebAuthnError::DecodeError(format!("CBOR re-encoding failed: {e}")))?;
        Ok(out)
    }

    /// Key type, label 1
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the label is absent or not an
    /// integer.
    pub fn key_type(&self) -> Result<i64, WebAuthnError> {
        self.integer(LABEL_KTY)
    }

    /// Algorithm identifier, label 3
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the label is absent or not an
    /// integer.
    pub fn algorithm(&self) -> Result<i64, WebAuthnError> {
        self.integer(LABEL_ALG)
    }

    /// Curve identifier, label -1
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the label is absent or not an
    /// integer.
    pub fn curve(&self) -> Result<i64, WebAuthnError> {
        self.integer(LABEL_CRV)
    }

    /// X coordinate, label -2, big-endian and sized to the curve
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the label is absent or not a
    /// byte string.
    pub fn x(&self) -> Result<&[u8], WebAuthnError> {
        self.bytes(LABEL_X)
    }

    /// Y coordinate, label -3, big-endian and sized to the curve
    ///
    /// # Errors
    /// Returns `WebAuthnError::DecodeError` if the label is absent or not a
    /// byte string.
    pub fn y(&self) -> Result<&[u8], WebAuthnError> {
        self.bytes(LABEL_Y)
    }

    fn lookup(&self, label: i64) -> Option<&Value> {
        let key = Value::Integer(Integer::from(label));
        self.entries
            .iter()
            .find(|(k, _)| k == &key)
            .map(|(_, v)| v)
    }

    fn integer(&self, label: i64) -> Result<i64, WebAuthnError> {
        match self.lookup(label) {
            Some(Value::Integer(i)) => i64::try_from(i128::from(*i)).map_err(|_| {
                WebAuthnError::DecodeError(format!("COSE label {label} out of integer range"))
            }),
            Some(_) => Err(WebAuthnError::DecodeError(format!(
                "COSE label {label} is not an integer"
            ))),
            None => Err(WebAuthnError::DecodeError(format!(
                "COSE label {label} is missing"
            ))),
        }
    }

    fn bytes(&self, label: i64) -> Result<&[u8], WebAuthnError> {
        match self.lookup(label) {
            Some(Value::Bytes(bytes)) => Ok(bytes.as_slice()),
            Some(_) => Err(WebAuthnError::DecodeError(format!(
                "COSE label {label} is not a byte string"
            ))),
            None => Err(WebAuthnError::DecodeError(format!(
                "COSE label {label} is missing"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(x: &[u8], y: &[u8]) -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-7).into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(x.to_vec())),
            (Value::Integer((-3).into()), Value::Bytes(y.to_vec())),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&map, &mut out).unwrap();
        out
    }

    #[test]
    fn decodes_p256_key_labels() {
        let x = [0xAAu8; 32];
        let y = [0xBBu8; 32];
        let encoded = sample_key(&x, &y);

        let key = CoseKey::decode_first(&encoded).unwrap();
        assert_eq!(key.key_type().unwrap(), 2);
        assert_eq!(key.algorithm().unwrap(), -7);
        assert_eq!(key.curve().unwrap(), 1);
        assert_eq!(key.x().unwrap(), &x);
        assert_eq!(key.y().unwrap(), &y);
    }

    #[test]
    fn reencoding_is_byte_identical() {
        let encoded = sample_key(&[0x11u8; 32], &[0x22u8; 32]);
        let key = CoseKey::decode_first(&encoded).unwrap();
        assert_eq!(key.to_bytes().unwrap(), encoded);
    }

    #[test]
    fn reencoding_ignores_trailing_bytes() {
        let encoded = sample_key(&[0x11u8; 32], &[0x22u8; 32]);
        let mut with_trailing = encoded.clone();
        with_trailing.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let key = CoseKey::decode_first(&with_trailing).unwrap();
        assert_eq!(key.to_bytes().unwrap(), encoded);
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        let err = CoseKey::decode_first(&[]).unwrap_err();
        assert!(matches!(err, WebAuthnError::DecodeError(msg) if msg.contains("empty")));
    }

    #[test]
    fn missing_label_is_reported() {
        let map = Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Integer(2.into()),
        )]);
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&map, &mut encoded).unwrap();

        let key = CoseKey::decode_first(&encoded).unwrap();
        let err = key.x().unwrap_err();
        assert!(matches!(err, WebAuthnError::DecodeError(msg) if msg.contains("-2")));
    }

    #[test]
    fn non_map_item_is_rejected() {
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&Value::Integer(7.into()), &mut encoded).unwrap();
        assert!(CoseKey::decode_first(&encoded).is_err());
    }
}
