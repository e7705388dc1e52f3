//! Authenticator data parsing
//!
//! Binary layout:
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter (big endian)
//! - variable: attested credential data (only when the AT flag is set)
//!   - 16 bytes: AAGUID
//!   - 2 bytes: credential ID length (L)
//!   - L bytes: credential ID
//!   - variable: COSE public key
//! - variable: extensions (only when the ED flag is set)

use ciborium::value::Value;

use super::errors::WebAuthnError;

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_LEN: usize = 16;

/// Authenticator data flag bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    #[must_use]
    pub fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    #[must_use]
    pub fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    #[must_use]
    pub fn has_attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }
}

/// Credential data attached to authenticator data during registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    pub public_key_cose: Vec<u8>,
}

/// Parsed authenticator data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: Vec<u8>,
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse raw authenticator data bytes
    ///
    /// # Errors
    /// Returns `WebAuthnError::EncodingError` if the data is truncated or the embedded
    /// COSE key is not valid CBOR
    pub fn parse(bytes: &[u8]) -> Result<Self, WebAuthnError> {
        if bytes.len() < HEADER_LEN {
            return Err(WebAuthnError::EncodingError(
                "Auth data too short".to_string(),
            ));
        }

        let rp_id_hash = bytes[..RP_ID_HASH_LEN].to_vec();
        let flags = AuthenticatorFlags(bytes[RP_ID_HASH_LEN]);
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let attested_credential = if flags.has_attested_credential_data() {
            Some(Self::parse_attested_credential(&bytes[HEADER_LEN..])?)
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

    fn parse_attested_credential(bytes: &[u8]) -> Result<AttestedCredentialData, WebAuthnError> {
        if bytes.len() < AAGUID_LEN + 2 {
            return Err(WebAuthnError::EncodingError(
                "Auth data too short for credential ID length".to_string(),
            ));
        }

        let mut aaguid = [0u8; AAGUID_LEN];
        aaguid.copy_from_slice(&bytes[..AAGUID_LEN]);

        let id_len = usize::from(u16::from_be_bytes([bytes[AAGUID_LEN], bytes[AAGUID_LEN + 1]]));
        let id_start = AAGUID_LEN + 2;
        let key_start = id_start + id_len;
        if bytes.len() <= key_start {
            return Err(WebAuthnError::EncodingError(
                "Auth data too short for public key".to_string(),
            ));
        }

        // The COSE key is followed by optional extension data, so decode it to find its end
        let mut cursor = std::io::Cursor::new(&bytes[key_start..]);
        let _: Value = ciborium::de::from_reader(&mut cursor)
            .map_err(|_| WebAuthnError::EncodingError("Invalid COSE public key".to_string()))?;
        let key_len = usize::try_from(cursor.position())
            .map_err(|_| WebAuthnError::EncodingError("COSE key too large".to_string()))?;

        Ok(AttestedCredentialData {
            aaguid,
            credential_id: bytes[id_start..key_start].to_vec(),
            public_key_cose: bytes[key_start..key_start + key_len].to_vec(),
        })
    }

    /// Serialize back into the binary layout
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags.0);
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(attested) = &self.attested_credential {
            out.extend_from_slice(&attested.aaguid);
            let id_len = u16::try_from(attested.credential_id.len()).unwrap_or(u16::MAX);
            out.extend_from_slice(&id_len.to_be_bytes());
            out.extend_from_slice(&attested.credential_id[..usize::from(id_len)]);
            out.extend_from_slice(&attested.public_key_cose);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webauthn::{sec1_to_cose_key, sha256};

    fn sample_point() -> Vec<u8> {
        let mut point = vec![0x04];
        point.extend_from_slice(&[0x11; 32]);
        point.extend_from_slice(&[0x22; 32]);
        point
    }

    #[test]
    fn test_parse_assertion_data() {
        let mut bytes = sha256(b"localhost");
        bytes.push(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED);
        bytes.extend_from_slice(&7u32.to_be_bytes());

        let data = AuthenticatorData::parse(&bytes).unwrap();
        assert_eq!(data.rp_id_hash, sha256(b"localhost"));
        assert!(data.flags.user_present());
        assert!(data.flags.user_verified());
        assert_eq!(data.sign_count, 7);
        assert!(data.attested_credential.is_none());
    }

    #[test]
    fn test_parse_attested_credential_with_trailing_extensions() {
        let cose = sec1_to_cose_key(&sample_point()).unwrap();
        let data = AuthenticatorData {
            rp_id_hash: sha256(b"example.com"),
            flags: AuthenticatorFlags(
                AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
            sign_count: 0,
            attested_credential: Some(AttestedCredentialData {
                aaguid: [0u8; 16],
                credential_id: b"cred1".to_vec(),
                public_key_cose: cose.clone(),
            }),
        };
        let mut bytes = data.to_bytes();
        // Empty CBOR map standing in for extension output
        bytes.push(0xa0);

        let parsed = AuthenticatorData::parse(&bytes).unwrap();
        let attested = parsed.attested_credential.unwrap();
        assert_eq!(attested.credential_id, b"cred1");
        assert_eq!(attested.public_key_cose, cose);
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        assert!(AuthenticatorData::parse(&[0u8; 20]).is_err());

        let mut bytes = sha256(b"localhost");
        bytes.push(AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&[0x00, 0x05, 1, 2]);
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(WebAuthnError::EncodingError(_))
        ));
    }
}
