//! Fuzz target for sealed envelopes, sealed SCRs and blobs
//!
//! Clients open whatever the service and blob store return. Any byte of an
//! envelope may have been altered in storage or in transit.
//!
//! # Strategy
//!
//! - Seal a real record, then mutate version, key url, nonce or ciphertext
//! - Seal a real SCR, then mutate it
//! - Encrypt a real blob, then mutate ciphertext or tag
//!
//! # Invariants
//!
//! - Opening NEVER panics
//! - An unmodified envelope always opens to the original body
//! - A modified envelope never opens to a different body
//! - A modified blob is always reported as an integrity mismatch

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockboard_core::{codec::normalized_body, BoardError, ContentCodec, Environment};
use lockboard_proto::{KeyMaterial, NewContent};

const KEY_URL: &str = "kms://keys/fuzz";

/// Deterministic environment: every draw repeats the fuzzer-chosen byte.
#[derive(Clone, Copy)]
struct FixedEnv(u8);

impl Environment for FixedEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(self.0);
    }
}

#[derive(Debug, Arbitrary)]
struct EnvelopeScenario {
    material: [u8; 32],
    entropy: u8,
    kind: String,
    payload: String,
    tamper: Tamper,
}

#[derive(Debug, Arbitrary)]
enum Tamper {
    None,
    Version(u8),
    KeyUrl(String),
    Nonce { index: u8, value: u8 },
    Ciphertext { index: u16, value: u8 },
    Truncate { len: u16 },
    Scr { index: u16, value: u8 },
    Blob { bytes: Vec<u8>, index: u16, value: u8 },
    BlobTag { index: u8, value: u8 },
}

fuzz_target!(|scenario: EnvelopeScenario| {
    let codec = ContentCodec::new(FixedEnv(scenario.entropy));
    let material = KeyMaterial::from_bytes(scenario.material);
    let record = NewContent::new(scenario.kind, scenario.payload);
    let expected = normalized_body(&record);

    let Ok(mut envelope) = codec.encrypt_record(KEY_URL, &material, &record) else { return };
    let pristine = envelope.clone();

    match scenario.tamper {
        Tamper::None => {
            let opened = codec.decrypt_record(&material, &envelope);
            assert_eq!(opened.ok(), Some(expected), "unmodified envelope must open");
            return;
        },
        Tamper::Version(version) => envelope.version = version,
        Tamper::KeyUrl(url) => envelope.encryption_key_url = url,
        Tamper::Nonce { index, value } => {
            envelope.nonce[usize::from(index) % envelope.nonce.len()] = value;
        },
        Tamper::Ciphertext { index, value } => {
            if let Some(len) = std::num::NonZeroUsize::new(envelope.ciphertext.len()) {
                envelope.ciphertext[usize::from(index) % len.get()] = value;
            }
        },
        Tamper::Truncate { len } => envelope.ciphertext.truncate(usize::from(len)),
        Tamper::Scr { index, value } => {
            tamper_scr(&codec, &material, usize::from(index), value);
            return;
        },
        Tamper::Blob { bytes, index, value } => {
            tamper_blob(&codec, &bytes, Some((usize::from(index), value)), None);
            return;
        },
        Tamper::BlobTag { index, value } => {
            tamper_blob(&codec, b"snapshot", None, Some((usize::from(index), value)));
            return;
        },
    }

    match codec.decrypt_record(&material, &envelope) {
        Ok(body) => {
            assert_eq!(envelope, pristine, "modified envelope opened");
            assert_eq!(body, expected);
        },
        Err(BoardError::Malformed { .. }) => {},
        Err(other) => panic!("unexpected error: {other:?}"),
    }
});

fn tamper_scr(codec: &ContentCodec<FixedEnv>, material: &KeyMaterial, index: usize, value: u8) {
    let pending = codec.encrypt_blob(b"image");
    let scr = pending.into_scr("blob://fuzz");
    let Ok(mut sealed) = codec.seal_scr(KEY_URL, material, &scr) else { return };
    let original = sealed.ciphertext.clone();

    if let Some(len) = std::num::NonZeroUsize::new(sealed.ciphertext.len()) {
        sealed.ciphertext[index % len.get()] = value;
    }

    match codec.open_scr(KEY_URL, material, &sealed) {
        Ok(opened) => {
            assert_eq!(sealed.ciphertext, original, "modified SCR opened");
            assert_eq!(opened, scr);
        },
        Err(BoardError::Malformed { .. }) => {},
        Err(other) => panic!("unexpected error: {other:?}"),
    }
}

fn tamper_blob(
    codec: &ContentCodec<FixedEnv>,
    plaintext: &[u8],
    body_flip: Option<(usize, u8)>,
    tag_flip: Option<(usize, u8)>,
) {
    let pending = codec.encrypt_blob(plaintext);
    let mut ciphertext = pending.ciphertext.clone();
    let mut scr = pending.into_scr("blob://fuzz");

    if let Some((index, value)) = body_flip {
        if !ciphertext.is_empty() {
            let len = ciphertext.len();
            ciphertext[index % len] = value;
        }
    }
    if let Some((index, value)) = tag_flip {
        scr.tag[index % scr.tag.len()] = value;
    }

    match codec.decrypt_blob(&scr, &ciphertext) {
        Ok(bytes) => assert_eq!(bytes, plaintext, "blob opened to different bytes"),
        Err(BoardError::IntegrityMismatch { loc }) => assert_eq!(loc, "blob://fuzz"),
        Err(other) => panic!("unexpected error: {other:?}"),
    }
}
