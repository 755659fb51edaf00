//! The on-disk wire envelope: `{"leaf": 1, "key": <base64>, "data": <base64>}`.
//!
//! `leaf` is the format version. `key` is the AEAD blob of the data key
//! under the access key; `data` is the AEAD blob of the compressed payload
//! under the data key. The envelope itself is never compressed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const FORMAT_VERSION: u32 = 1;

pub struct Envelope {
    pub key: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    leaf: u32,
    key: String,
    data: String,
}

impl Envelope {
    pub fn new(key: Vec<u8>, data: Vec<u8>) -> Self {
        Self { key, data }
    }

    /// Encodes the envelope as the single JSON object written to disk.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let wire = WireEnvelope {
            leaf: FORMAT_VERSION,
            key: STANDARD.encode(&self.key),
            data: STANDARD.encode(&self.data),
        };
        serde_json::to_vec(&wire).map_err(|e| Error::Malformed(e.to_string()))
    }

    /// Parses `bytes` as the wire envelope, rejecting any `leaf` other than
    /// the currently supported format version.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let wire: WireEnvelope =
            serde_json::from_slice(bytes).map_err(|e| Error::Malformed(e.to_string()))?;

        if wire.leaf != FORMAT_VERSION {
            return Err(Error::VersionMismatch(wire.leaf));
        }

        let key = STANDARD
            .decode(wire.key)
            .map_err(|e| Error::Malformed(format!("key field is not valid base64: {e}")))?;
        let data = STANDARD
            .decode(wire.data)
            .map_err(|e| Error::Malformed(format!("data field is not valid base64: {e}")))?;

        Ok(Self { key, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let env = Envelope::new(vec![1, 2, 3], vec![4, 5, 6, 7]);
        let bytes = env.to_json().unwrap();
        let parsed = Envelope::from_json(&bytes).unwrap();
        assert_eq!(parsed.key, vec![1, 2, 3]);
        assert_eq!(parsed.data, vec![4, 5, 6, 7]);
    }

    #[test]
    fn accepts_whitespace_and_unknown_field_order() {
        let bytes = br#"{ "data" : "BAUG" , "leaf" : 1 , "key" : "AQID" }"#;
        let parsed = Envelope::from_json(bytes).unwrap();
        assert_eq!(parsed.key, vec![1, 2, 3]);
        assert_eq!(parsed.data, vec![4, 5, 6]);
    }

    #[test]
    fn rejects_future_version() {
        let bytes = br#"{"leaf":2,"key":"AQID","data":"AQID"}"#;
        let err = Envelope::from_json(bytes).unwrap_err();
        assert!(matches!(err, Error::VersionMismatch(2)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Envelope::from_json(b"not json").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn rejects_bad_base64() {
        let bytes = br#"{"leaf":1,"key":"not-base64!!","data":"AQID"}"#;
        let err = Envelope::from_json(bytes).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
