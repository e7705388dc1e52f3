//! CBOR processing for `WebAuthn`
//!
//! This module handles the CBOR (Concise Binary Object Representation)
//! processing needed for `WebAuthn` attestation objects and COSE keys.

use ciborium::de::from_reader;
use ciborium::ser::into_writer;
use ciborium::value::Value;

use super::errors::WebAuthnError;
use super::types::COSE_ALG_ES256;

// COSE key labels and values (RFC 9053)
const COSE_KTY: i64 = 1;
const COSE_ALG: i64 = 3;
const COSE_CRV: i64 = -1;
const COSE_X: i64 = -2;
const COSE_Y: i64 = -3;
const COSE_KTY_EC2: i64 = 2;
const COSE_CRV_P256: i64 = 1;

const P256_COORDINATE_LEN: usize = 32;

/// Decoded attestation object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    pub fmt: String,
    pub auth_data: Vec<u8>,
}

/// Decode an attestation object (`{fmt, attStmt, authData}`)
///
/// # Errors
/// Returns `WebAuthnError::EncodingError` if the CBOR is malformed or `authData` is missing
pub fn decode_attestation_object(bytes: &[u8]) -> Result<AttestationObject, WebAuthnError> {
    let attestation: Value = from_reader(bytes)
        .map_err(|_| WebAuthnError::EncodingError("Invalid CBOR attestation format".to_string()))?;

    let Some(map) = attestation.as_map() else {
        return Err(WebAuthnError::EncodingError(
            "Attestation object is not a map".to_string(),
        ));
    };

    let field = |name: &str| {
        map.iter()
            .find(|(k, _)| k.as_text() == Some(name))
            .map(|(_, v)| v)
    };

    let Some(auth_data) = field("authData").and_then(Value::as_bytes) else {
        return Err(WebAuthnError::EncodingError(
            "Missing authData in attestation".to_string(),
        ));
    };

    let fmt = field("fmt")
        .and_then(Value::as_text)
        .unwrap_or_default()
        .to_string();

    Ok(AttestationObject {
        fmt,
        auth_data: auth_data.clone(),
    })
}

/// Encode a "none" format attestation object around raw authenticator data
///
/// # Errors
/// Returns `WebAuthnError::EncodingError` if CBOR serialization fails
pub fn encode_none_attestation(auth_data: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let value = Value::Map(vec![
        (Value::Text("fmt".to_string()), Value::Text("none".to_string())),
        (Value::Text("attStmt".to_string()), Value::Map(Vec::new())),
        (Value::Text("authData".to_string()), Value::Bytes(auth_data.to_vec())),
    ]);
    encode(&value)
}

/// Convert a COSE EC2 P-256 key into an uncompressed SEC1 point
///
/// # Errors
/// Returns `WebAuthnError::NotSupported` for key types other than ES256 and
/// `WebAuthnError::EncodingError` for malformed keys
pub fn cose_key_to_sec1(cose: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    let key: Value = from_reader(cose)
        .map_err(|_| WebAuthnError::EncodingError("Invalid COSE public key".to_string()))?;
    let Some(map) = key.as_map() else {
        return Err(WebAuthnError::EncodingError(
            "COSE key is not a map".to_string(),
        ));
    };

    let label = |wanted: i64| {
        map.iter()
            .find(|(k, _)| {
                k.as_integer()
                    .is_some_and(|i| i128::from(i) == i128::from(wanted))
            })
            .map(|(_, v)| v)
    };
    let int_label = |wanted: i64| {
        label(wanted)
            .and_then(Value::as_integer)
            .map(i128::from)
    };

    if int_label(COSE_KTY) != Some(i128::from(COSE_KTY_EC2)) {
        return Err(WebAuthnError::NotSupported("COSE key type".to_string()));
    }
    if let Some(alg) = int_label(COSE_ALG) {
        if alg != i128::from(COSE_ALG_ES256) {
            return Err(WebAuthnError::NotSupported(format!("COSE algorithm {alg}")));
        }
    }
    if int_label(COSE_CRV) != Some(i128::from(COSE_CRV_P256)) {
        return Err(WebAuthnError::NotSupported("COSE curve".to_string()));
    }

    let coordinate = |wanted: i64, name: &str| -> Result<Vec<u8>, WebAuthnError> {
        match label(wanted).and_then(Value::as_bytes) {
            Some(bytes) if bytes.len() == P256_COORDINATE_LEN => Ok(bytes.clone()),
            _ => Err(WebAuthnError::EncodingError(format!(
                "Invalid COSE {name} coordinate"
            ))),
        }
    };

    let mut point = Vec::with_capacity(1 + 2 * P256_COORDINATE_LEN);
    point.push(0x04);
    point.extend(coordinate(COSE_X, "x")?);
    point.extend(coordinate(COSE_Y, "y")?);
    Ok(point)
}

/// Convert an uncompressed SEC1 P-256 point into a COSE EC2 key
///
/// # Errors
/// Returns `WebAuthnError::EncodingError` if the point is not uncompressed P-256
pub fn sec1_to_cose_key(point: &[u8]) -> Result<Vec<u8>, WebAuthnError> {
    if point.len() != 1 + 2 * P256_COORDINATE_LEN || point[0] != 0x04 {
        return Err(WebAuthnError::EncodingError(
            "Expected an uncompressed P-256 point".to_string(),
        ));
    }
    let (x, y) = point[1..].split_at(P256_COORDINATE_LEN);
    let value = Value::Map(vec![
        (Value::Integer(COSE_KTY.into()), Value::Integer(COSE_KTY_EC2.into())),
        (Value::Integer(COSE_ALG.into()), Value::Integer(COSE_ALG_ES256.into())),
        (Value::Integer(COSE_CRV.into()), Value::Integer(COSE_CRV_P256.into())),
        (Value::Integer(COSE_X.into()), Value::Bytes(x.to_vec())),
        (Value::Integer(COSE_Y.into()), Value::Bytes(y.to_vec())),
    ]);
    encode(&value)
}

fn encode(value: &Value) -> Result<Vec<u8>, WebAuthnError> {
    let mut out = Vec::new();
    into_writer(value, &mut out)
        .map_err(|e| WebAuthnError::EncodingError(format!("CBOR serialization failed: {e}")))?;
    Ok(out)
}
