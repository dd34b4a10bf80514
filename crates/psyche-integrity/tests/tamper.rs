//! Property tests for the device-bound codec.

use proptest::prelude::*;
use psyche_integrity::{DeviceFingerprint, DeviceProfile, SecureCodec};
use serde::{Deserialize, Serialize};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Saved {
    ids: Vec<u32>,
    label: String,
    score: u16,
}

fn saved() -> impl Strategy<Value = Saved> {
    (
        prop::collection::vec(0u32..60, 0..60),
        "[a-z ]{0,24}",
        0u16..1000,
    )
        .prop_map(|(ids, label, score)| Saved { ids, label, score })
}

fn device() -> DeviceProfile {
    DeviceProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
        language: "en-GB".into(),
        screen_width: 1920,
        logical_cores: 12,
    }
}

proptest! {
    #[test]
    fn roundtrip_on_origin_device(value in saved()) {
        let codec = SecureCodec::new("salt", device().fingerprint());
        let blob = codec.encode("psyche.session", &value).unwrap();
        prop_assert_eq!(codec.decode::<Saved>("psyche.session", &blob), Some(value));
    }

    #[test]
    fn single_character_tamper_never_decodes(
        value in saved(),
        index in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
    ) {
        let codec = SecureCodec::new("salt", device().fingerprint());
        let blob = codec.encode("psyche.session", &value).unwrap();

        let at = index.index(blob.len());
        let original = blob.as_bytes()[at];
        let mut choice = ALPHABET[replacement.index(ALPHABET.len())];
        if choice == original {
            choice = if original == b'A' { b'B' } else { b'A' };
        }

        let mut tampered = blob.into_bytes();
        tampered[at] = choice;
        let tampered = String::from_utf8(tampered).unwrap();
        prop_assert!(codec.decode::<Saved>("psyche.session", &tampered).is_none());
    }

    #[test]
    fn other_device_never_decodes(value in saved(), width in 0u32..4000) {
        prop_assume!(width != 1920);
        let blob = SecureCodec::new("salt", device().fingerprint())
            .encode("psyche.session", &value)
            .unwrap();

        let mut other = device();
        other.screen_width = width;
        let foreign = SecureCodec::new("salt", other.fingerprint());
        prop_assert!(foreign.decode::<Saved>("psyche.session", &blob).is_none());
    }
}

#[test]
fn fingerprint_string_binds_codec() {
    let a = SecureCodec::new("salt", DeviceFingerprint::new("0123456789ABCDEF"));
    let b = SecureCodec::new("salt", DeviceFingerprint::new("0123456789ABCDEE"));
    let blob = a.encode("k", &vec![1u8, 2, 3]).unwrap();
    assert_eq!(a.decode::<Vec<u8>>("k", &blob), Some(vec![1, 2, 3]));
    assert!(b.decode::<Vec<u8>>("k", &blob).is_none());
}
