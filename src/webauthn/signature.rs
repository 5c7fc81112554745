//! DER signature normalization
//!
//! A `WebAuthn` authenticator returns an ECDSA signature as a DER-encoded
//! ASN.1 SEQUENCE of two INTEGERs. ASN.1 integers are two's-complement, so a
//! value whose top bit is set carries one 0x00 sign-disambiguation byte.
//! The proving circuit consumes raw fixed-width scalars, so that pad must be
//! stripped before the values are left-padded to the coordinate width.

use super::errors::WebAuthnError;

/// Coordinate width of P-256 scalars in bytes
pub const COORDINATE_WIDTH: usize = 32;

const ASN1_SEQUENCE: u8 = 0x30;
const ASN1_INTEGER: u8 = 0x02;

/// An ECDSA signature with sign-pad-normalized big-endian `r` and `s`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaSignature {
    /// Normalized big-endian `r`, at most [`COORDINATE_WIDTH`] bytes
    pub r: Vec<u8>,
    /// Normalized big-endian `s`, at most [`COORDINATE_WIDTH`] bytes
    pub s: Vec<u8>,
}

impl EcdsaSignature {
    /// Parse a DER-encoded ECDSA signature and normalize both integers
    ///
    /// # Errors
    /// Returns `WebAuthnError::SignatureDecodeError` on malformed ASN.1 or
    /// when a normalized integer exceeds the coordinate width.
    pub fn from_der(der: &[u8]) -> Result<Self, WebAuthnError> {
        let mut pointer = 0;

        if der.len() < 2 || der[0] != ASN1_SEQUENCE {
            return Err(WebAuthnError::SignatureDecodeError(
                "Expected ASN.1 SEQUENCE".to_string(),
            ));
        }
        pointer += 1;

        let declared = read_length(der, &mut pointer)?;
        if pointer + declared != der.len() {
            return Err(WebAuthnError::SignatureDecodeError(format!(
                "SEQUENCE declares {declared} bytes but {} remain",
                der.len() - pointer
            )));
        }

        let r = strip_sign_pad(&read_integer(der, &mut pointer)?).to_vec();
        let s = strip_sign_pad(&read_integer(der, &mut pointer)?).to_vec();

        if pointer != der.len() {
            return Err(WebAuthnError::SignatureDecodeError(
                "Trailing bytes after second INTEGER".to_string(),
            ));
        }

        if r.len() > COORDINATE_WIDTH || s.len() > COORDINATE_WIDTH {
            return Err(WebAuthnError::SignatureDecodeError(format!(
                "Integer wider than {COORDINATE_WIDTH} bytes after normalization"
            )));
        }

        Ok(Self { r, s })
    }

    /// `r` left-padded to the coordinate width
    #[must_use]
    pub fn r_scalar(&self) -> [u8; COORDINATE_WIDTH] {
        left_pad(&self.r)
    }

    /// `s` left-padded to the coordinate width
    #[must_use]
    pub fn s_scalar(&self) -> [u8; COORDINATE_WIDTH] {
        left_pad(&self.s)
    }
}

/// Strip the ASN.1 sign-disambiguation byte when present
///
/// The pad is exactly one leading 0x00 whose following byte has its high bit
/// set; any other encoding is returned unchanged.
#[must_use]
pub fn strip_sign_pad(bytes: &[u8]) -> &[u8] {
    if bytes.len() >= 2 && bytes[0] == 0x00 && bytes[1] & 0x80 != 0 {
        &bytes[1..]
    } else {
        bytes
    }
}

fn left_pad(bytes: &[u8]) -> [u8; COORDINATE_WIDTH] {
    let mut out = [0u8; COORDINATE_WIDTH];
    out[COORDINATE_WIDTH - bytes.len()..].copy_from_slice(bytes);
    out
}

fn read_length(der: &[u8], pointer: &mut usize) -> Result<usize, WebAuthnError> {
    let Some(&first) = der.get(*pointer) else {
        return Err(WebAuthnError::SignatureDecodeError(
            "Truncated length field".to_string(),
        ));
    };
    *pointer += 1;

    // P-256 signatures are at most 72 bytes, so only short-form lengths occur.
    if first & 0x80 != 0 {
        return Err(WebAuthnError::SignatureDecodeError(
            "Long-form ASN.1 length not supported".to_string(),
        ));
    }

    Ok(usize::from(first))
}

fn read_integer(der: &[u8], pointer: &mut usize) -> Result<Vec<u8>, WebAuthnError> {
    if der.get(*pointer) != Some(&ASN1_INTEGER) {
        return Err(WebAuthnError::SignatureDecodeError(
            "Expected ASN.1 INTEGER".to_string(),
        ));
    }
    *pointer += 1;

    let len = read_length(der, pointer)?;
    if len == 0 {
        return Err(WebAuthnError::SignatureDecodeError(
            "Zero-length INTEGER".to_string(),
        ));
    }
    if *pointer + len > der.len() {
        return Err(WebAuthnError::SignatureDecodeError(format!(
            "INTEGER declares {len} bytes but {} remain",
            der.len() - *pointer
        )));
    }

    let value = der[*pointer..*pointer + len].to_vec();
    *pointer += len;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn der_signature(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        for int in [r, s] {
            body.push(ASN1_INTEGER);
            body.push(u8::try_from(int.len()).unwrap());
            body.extend_from_slice(int);
        }
        let mut der = vec![ASN1_SEQUENCE, u8::try_from(body.len()).unwrap()];
        der.extend_from_slice(&body);
        der
    }

    #[test]
    fn strips_one_sign_pad_from_each_integer() {
        let mut r = vec![0x00];
        r.extend_from_slice(&[0x80; 32]);
        let mut s = vec![0x00];
        s.extend_from_slice(&[0xFF; 32]);

        let sig = EcdsaSignature::from_der(&der_signature(&r, &s)).unwrap();
        assert_eq!(sig.r, vec![0x80; 32]);
        assert_eq!(sig.s, vec![0xFF; 32]);
        assert_eq!(sig.r.len(), COORDINATE_WIDTH);
        assert_eq!(sig.s.len(), COORDINATE_WIDTH);
    }

    #[test]
    fn unpadded_integers_pass_through_unchanged() {
        let r = vec![0x7F; 32];
        let s = vec![0x01; 32];

        let sig = EcdsaSignature::from_der(&der_signature(&r, &s)).unwrap();
        assert_eq!(sig.r, r);
        assert_eq!(sig.s, s);
    }

    #[test]
    fn strip_sign_pad_is_identity_without_pad() {
        let bytes = [0x7F, 0x80, 0x01];
        assert_eq!(strip_sign_pad(&bytes), &bytes);

        // A leading zero followed by a low byte is a genuine value byte.
        let low = [0x00, 0x12, 0x34];
        assert_eq!(strip_sign_pad(&low), &low);
    }

    #[test]
    fn short_integers_are_left_padded_to_scalar_width() {
        let r = vec![0x12, 0x34];
        let s = vec![0x56];

        let sig = EcdsaSignature::from_der(&der_signature(&r, &s)).unwrap();
        let mut expected_r = [0u8; COORDINATE_WIDTH];
        expected_r[30] = 0x12;
        expected_r[31] = 0x34;
        assert_eq!(sig.r_scalar(), expected_r);
        assert_eq!(sig.s_scalar()[31], 0x56);
    }

    #[test]
    fn rejects_missing_sequence_tag() {
        let err = EcdsaSignature::from_der(&[0x02, 0x01, 0x01]).unwrap_err();
        assert!(matches!(err, WebAuthnError::SignatureDecodeError(_)));
    }

    #[test]
    fn rejects_truncated_integer() {
        let mut der = der_signature(&[0x01; 32], &[0x02; 32]);
        der.truncate(der.len() - 4);
        // Fix up the outer length so the INTEGER check is what fails.
        der[1] -= 4;
        let err = EcdsaSignature::from_der(&der).unwrap_err();
        assert!(matches!(err, WebAuthnError::SignatureDecodeError(_)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut der = der_signature(&[0x01; 32], &[0x02; 32]);
        der[1] += 1;
        let err = EcdsaSignature::from_der(&der).unwrap_err();
        assert!(matches!(err, WebAuthnError::SignatureDecodeError(_)));
    }
}
