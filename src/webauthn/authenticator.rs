//! Authenticator data parsing
//!
//! Decodes the fixed-layout `WebAuthn` authenticator-data record: a 32-byte
//! RP ID hash, one flags byte, a 4-byte big-endian signature counter, and,
//! when the AT flag is set, the attested credential data whose trailing COSE
//! public key is a variable-length CBOR item.
//!
//! Flag bit positions: <https://www.w3.org/TR/webauthn-2/#flags>

use super::cose::CoseKey;
use super::errors::WebAuthnError;

/// Minimum length of an authenticator data record (rpIdHash + flags + counter)
const MIN_AUTH_DATA_LEN: usize = 37;

/// Decoded flags byte of an authenticator data record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags {
    /// UP, bit 0
    pub user_present: bool,
    /// UV, bit 2
    pub user_verified: bool,
    /// BE, bit 3
    pub backup_eligible: bool,
    /// BS, bit 4
    pub backup_state: bool,
    /// AT, bit 6
    pub attested_credential_data: bool,
    /// ED, bit 7
    pub extension_data: bool,
    /// The raw flags byte
    pub raw: u8,
}

impl From<u8> for AuthenticatorFlags {
    fn from(raw: u8) -> Self {
        Self {
            user_present: raw & 0x01 != 0,
            user_verified: raw & 0x04 != 0,
            backup_eligible: raw & 0x08 != 0,
            backup_state: raw & 0x10 != 0,
            attested_credential_data: raw & 0x40 != 0,
            extension_data: raw & 0x80 != 0,
            raw,
        }
    }
}

/// Attested credential data present on registration records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    /// Authenticator model identifier
    pub aaguid: [u8; 16],
    /// Credential identifier, length declared by a u16 big-endian prefix
    pub credential_id: Vec<u8>,
    /// The COSE public key, re-encoded to exactly the bytes it occupied
    pub credential_public_key: Vec<u8>,
}

/// A parsed authenticator data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the relying party ID
    pub rp_id_hash: [u8; 32],
    /// Decoded flags byte
    pub flags: AuthenticatorFlags,
    /// Signature counter, big-endian
    pub sign_count: u32,
    /// Present only when the AT flag is set
    pub attested_credential: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse a raw authenticator data buffer
    ///
    /// # Errors
    /// Returns `WebAuthnError::MalformedAuthenticatorData` if the buffer is
    /// shorter than 37 bytes (the message cites the actual length) or the
    /// attested credential data is truncated, and `WebAuthnError::DecodeError`
    /// if the embedded COSE key is not valid CBOR.
    pub fn parse(auth_data: &[u8]) -> Result<Self, WebAuthnError> {
        if auth_data.len() < MIN_AUTH_DATA_LEN {
            return Err(WebAuthnError::MalformedAuthenticatorData(format!(
                "Authenticator data was {} bytes, expected at least {MIN_AUTH_DATA_LEN} bytes",
                auth_data.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&auth_data[..32]);

        let flags = AuthenticatorFlags::from(auth_data[32]);

        let mut counter_bytes = [0u8; 4];
        counter_bytes.copy_from_slice(&auth_data[33..37]);
        let sign_count = u32::from_be_bytes(counter_bytes);

        let attested_credential = if flags.attested_credential_data {
            Some(Self::parse_attested_credential(&auth_data[MIN_AUTH_DATA_LEN..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }

    fn parse_attested_credential(buf: &[u8]) -> Result<AttestedCredentialData, WebAuthnError> {
        // AAGUID (16) + credential id length prefix (2)
        if buf.len() < 18 {
            return Err(WebAuthnError::MalformedAuthenticatorData(format!(
                "Attested credential data was {} bytes, expected at least 18 bytes",
                buf.len()
            )));
        }

        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&buf[..16]);

        let id_len = usize::from(u16::from_be_bytes([buf[16], buf[17]]));
        let mut pointer = 18;

        if buf.len() < pointer + id_len {
            return Err(WebAuthnError::MalformedAuthenticatorData(format!(
                "Credential ID declared {id_len} bytes but only {} remain",
                buf.len() - pointer
            )));
        }

        let credential_id = buf[pointer..pointer + id_len].to_vec();
        pointer += id_len;

        // Decode the next CBOR item, then re-encode it so the cursor advances
        // by exactly the bytes the key occupied in the original buffer.
        let key = CoseKey::decode_first(&buf[pointer..])?;
        let credential_public_key = key.to_bytes()?;

        Ok(AttestedCredentialData {
            aaguid,
            credential_id,
            credential_public_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::value::Value;

    fn sample_cose_key() -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-7).into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(vec![0x41; 32])),
            (Value::Integer((-3).into()), Value::Bytes(vec![0x42; 32])),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&map, &mut out).unwrap();
        out
    }

    fn sample_record(flags: u8, attested: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0x01; 32]); // rpIdHash
        buf.push(flags);
        buf.extend_from_slice(&42u32.to_be_bytes());
        if attested {
            buf.extend_from_slice(&[0xA0; 16]); // AAGUID
            let credential_id = [0xC1u8; 20];
            buf.extend_from_slice(&u16::try_from(credential_id.len()).unwrap().to_be_bytes());
            buf.extend_from_slice(&credential_id);
            buf.extend_from_slice(&sample_cose_key());
        }
        buf
    }

    #[test]
    fn short_buffer_reports_actual_length() {
        let err = AuthenticatorData::parse(&[0u8; 36]).unwrap_err();
        let WebAuthnError::MalformedAuthenticatorData(msg) = err else {
            panic!("unexpected error kind");
        };
        assert!(msg.contains("36 bytes, expected at least 37"));
    }

    #[test]
    fn parses_assertion_record_without_attested_data() {
        let record = sample_record(0b0000_0101, false);
        let parsed = AuthenticatorData::parse(&record).unwrap();

        assert_eq!(parsed.rp_id_hash, [0x01; 32]);
        assert!(parsed.flags.user_present);
        assert!(parsed.flags.user_verified);
        assert!(!parsed.flags.attested_credential_data);
        assert_eq!(parsed.sign_count, 42);
        assert!(parsed.attested_credential.is_none());
    }

    #[test]
    fn flag_bits_decode_by_position() {
        let flags = AuthenticatorFlags::from(0b1101_1101);
        assert!(flags.user_present);
        assert!(flags.user_verified);
        assert!(flags.backup_eligible);
        assert!(flags.backup_state);
        assert!(flags.attested_credential_data);
        assert!(flags.extension_data);
        assert_eq!(flags.raw, 0b1101_1101);
    }

    #[test]
    fn parses_attested_credential_and_consumes_whole_buffer() {
        let record = sample_record(0b0100_0101, true);
        let parsed = AuthenticatorData::parse(&record).unwrap();

        let attested = parsed.attested_credential.unwrap();
        assert_eq!(attested.aaguid, [0xA0; 16]);
        assert_eq!(attested.credential_id.len(), 20);
        assert_eq!(attested.credential_public_key, sample_cose_key());

        // For a single-item record the cursor lands exactly at the end of
        // the buffer: fixed header + AAGUID + length prefix + id + key.
        let consumed =
            37 + 16 + 2 + attested.credential_id.len() + attested.credential_public_key.len();
        assert_eq!(consumed, record.len());
    }

    #[test]
    fn truncated_credential_id_is_malformed() {
        let mut record = sample_record(0b0100_0001, true);
        record.truncate(37 + 16 + 2 + 5); // id declared 20 bytes, 5 remain
        let err = AuthenticatorData::parse(&record).unwrap_err();
        assert!(matches!(err, WebAuthnError::MalformedAuthenticatorData(_)));
    }

    #[test]
    fn missing_cose_key_is_a_decode_error() {
        let mut record = sample_record(0b0100_0001, true);
        record.truncate(37 + 16 + 2 + 20); // nothing left for the key
        let err = AuthenticatorData::parse(&record).unwrap_err();
        assert!(matches!(err, WebAuthnError::DecodeError(_)));
    }
}
