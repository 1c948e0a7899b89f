//! Fuzz target for hostile CBOR in stored and sealed wire types
//!
//! Every value the board service persists or a client decrypts is CBOR. A
//! corrupted database row or a malicious peer can hand the decoder anything.
//!
//! # Strategy
//!
//! - Deeply nested arrays and maps
//! - Length prefixes claiming far more bytes than present
//! - Raw arbitrary bytes against every wire type
//! - Well-formed CBOR of the wrong shape
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Claimed lengths never drive allocation beyond the input
//! - Anything that decodes re-encodes without error

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockboard_proto::{
    from_cbor, to_cbor, ActivityState, Channel, ContentBody, EncryptedContent, SealedScr, StoredContent,
};

#[derive(Debug, Arbitrary)]
enum CborAttack {
    /// Nesting that could exhaust the stack
    DeeplyNested { depth: u8, shape: Shape },
    /// Header claiming a huge definite length
    HugeLength { claimed_len_exponent: u8 },
    /// Unstructured bytes
    RandomBytes { bytes: Vec<u8> },
    /// A valid channel re-read as every other type
    TypeConfusion { kind: String, acl: String },
}

#[derive(Debug, Arbitrary)]
enum Shape {
    Array,
    Map,
    Bytes,
}

fuzz_target!(|attack: CborAttack| {
    match attack {
        CborAttack::DeeplyNested { depth, shape } => {
            decode_all(&nested(usize::from(depth % 64), &shape));
        },

        CborAttack::HugeLength { claimed_len_exponent } => {
            let exponent = u32::from(claimed_len_exponent % 33);
            let claimed = if exponent < 32 { 1u32 << exponent } else { u32::MAX };

            for major in [0x5A, 0x7A, 0x9A, 0xBA] {
                let mut bytes = vec![major];
                bytes.extend_from_slice(&claimed.to_be_bytes());
                bytes.extend(vec![0x01; (claimed as usize).min(8)]);
                decode_all(&bytes);
            }
        },

        CborAttack::RandomBytes { bytes } => decode_all(&bytes),

        CborAttack::TypeConfusion { kind, acl } => {
            let channel = Channel {
                channel_id: "0".repeat(32),
                channel_url: "board://channels/0".to_string(),
                acl_url: "acl://channels/0".to_string(),
                acl_url_link: acl,
                kms_resource_url: "kms://resources/0".to_string(),
                default_encryption_key_url: "kms://keys/0".to_string(),
                kind,
                state: ActivityState::Inactive,
                created_at: 0,
                image: None,
            };

            if let Ok(bytes) = to_cbor(&channel) {
                let decoded: Result<Channel, _> = from_cbor(&bytes);
                assert_eq!(decoded.ok().as_ref(), Some(&channel), "channel must round-trip");
                decode_all(&bytes);
            }
        },
    }
});

fn decode_all(bytes: &[u8]) {
    if let Ok(value) = from_cbor::<Channel>(bytes) {
        assert!(to_cbor(&value).is_ok());
    }
    if let Ok(value) = from_cbor::<StoredContent>(bytes) {
        assert!(to_cbor(&value).is_ok());
    }
    if let Ok(value) = from_cbor::<EncryptedContent>(bytes) {
        assert!(to_cbor(&value).is_ok());
    }
    if let Ok(value) = from_cbor::<ContentBody>(bytes) {
        assert!(to_cbor(&value).is_ok());
    }
    if let Ok(value) = from_cbor::<SealedScr>(bytes) {
        assert!(to_cbor(&value).is_ok());
    }
}

fn nested(depth: usize, shape: &Shape) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(depth * 3 + 2);

    for _ in 0..depth {
        match shape {
            Shape::Array | Shape::Bytes => bytes.push(0x81),
            Shape::Map => bytes.extend_from_slice(&[0xA1, 0x61, b'a']),
        }
    }

    match shape {
        Shape::Bytes => bytes.extend_from_slice(&[0x41, 0x00]),
        Shape::Array | Shape::Map => bytes.push(0x01),
    }

    bytes
}
