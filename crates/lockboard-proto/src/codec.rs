//! CBOR encoding helpers.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::ProtocolError;

/// Encode a value as CBOR.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR value.
///
/// Never panics on hostile input; any decoding failure is a
/// `ProtocolError::Decode`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityState, Cursor};

    #[test]
    fn roundtrip_simple_value() {
        let bytes = to_cbor(&ActivityState::Locked).unwrap();
        let decoded: ActivityState = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, ActivityState::Locked);
    }

    #[test]
    fn garbage_is_decode_error() {
        let result: Result<Cursor, _> = from_cbor(&[0xFF, 0x00, 0x13]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn empty_input_is_decode_error() {
        let result: Result<ActivityState, _> = from_cbor(&[]);
        assert!(result.is_err());
    }
}
