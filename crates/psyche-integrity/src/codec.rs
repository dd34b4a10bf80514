//! Device-bound codec for persisted state.
//!
//! Encoding: `payload -> JSON -> {d, c: blake3(d)} -> cipher -> base64`.
//! Decoding walks the same path in reverse and rejects anything that fails a
//! step, including an envelope that is not byte-for-byte canonical.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::checksum::checksum;
use crate::error::CodecError;
use crate::fingerprint::DeviceFingerprint;

/// Key material bound to caller key, system salt and device.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    pub fn derive(caller_key: &str, system_salt: &str, fingerprint: &DeviceFingerprint) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(caller_key.as_bytes());
        hasher.update(system_salt.as_bytes());
        hasher.update(fingerprint.as_str().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// Reversible transform applied to the serialized envelope.
pub trait StateCipher: Send + Sync + fmt::Debug {
    fn seal(&self, key: &CipherKey, plaintext: &[u8]) -> Vec<u8>;

    fn open(&self, key: &CipherKey, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Repeating-key XOR. Keeps casual inspection out, nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct XorObfuscation;

impl XorObfuscation {
    fn apply(key: &CipherKey, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .zip(key.as_bytes().iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl StateCipher for XorObfuscation {
    fn seal(&self, key: &CipherKey, plaintext: &[u8]) -> Vec<u8> {
        Self::apply(key, plaintext)
    }

    fn open(&self, key: &CipherKey, ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(Self::apply(key, ciphertext))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    d: String,
    c: String,
}

/// Encodes and decodes state for one device.
#[derive(Debug, Clone)]
pub struct SecureCodec<C: StateCipher = XorObfuscation> {
    cipher: C,
    system_salt: String,
    fingerprint: DeviceFingerprint,
}

impl SecureCodec<XorObfuscation> {
    pub fn new(system_salt: impl Into<String>, fingerprint: DeviceFingerprint) -> Self {
        Self::with_cipher(XorObfuscation, system_salt, fingerprint)
    }
}

impl<C: StateCipher> SecureCodec<C> {
    pub fn with_cipher(
        cipher: C,
        system_salt: impl Into<String>,
        fingerprint: DeviceFingerprint,
    ) -> Self {
        Self {
            cipher,
            system_salt: system_salt.into(),
            fingerprint,
        }
    }

    pub fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    fn key(&self, caller_key: &str) -> CipherKey {
        CipherKey::derive(caller_key, &self.system_salt, &self.fingerprint)
    }

    pub fn encode<T: Serialize>(&self, caller_key: &str, value: &T) -> Result<String, CodecError> {
        let d = serde_json::to_string(value).map_err(CodecError::Serialize)?;
        let c = checksum(&d);
        let envelope = serde_json::to_vec(&Envelope { d, c }).map_err(CodecError::Serialize)?;
        let sealed = self.cipher.seal(&self.key(caller_key), &envelope);
        Ok(STANDARD.encode(sealed))
    }

    /// Decode with the failure reason.
    pub fn try_decode<T: DeserializeOwned>(
        &self,
        caller_key: &str,
        blob: &str,
    ) -> Result<T, CodecError> {
        let sealed = STANDARD.decode(blob)?;
        let opened = self.cipher.open(&self.key(caller_key), &sealed)?;
        let text = String::from_utf8(opened).map_err(|_| CodecError::Utf8)?;

        let envelope: Envelope = serde_json::from_str(&text).map_err(CodecError::Envelope)?;
        let canonical = serde_json::to_string(&envelope).map_err(CodecError::Serialize)?;
        if canonical != text || checksum(&envelope.d) != envelope.c {
            return Err(CodecError::ChecksumMismatch);
        }

        serde_json::from_str(&envelope.d).map_err(CodecError::Payload)
    }

    /// Decode, or `None` on any failure. Never yields tampered data.
    pub fn decode<T: DeserializeOwned>(&self, caller_key: &str, blob: &str) -> Option<T> {
        match self.try_decode(caller_key, blob) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Rejected persisted blob");
                None
            }
        }
    }

    /// Decode, or the caller's default.
    pub fn decode_or<T: DeserializeOwned>(&self, caller_key: &str, blob: &str, default: T) -> T {
        self.decode(caller_key, blob).unwrap_or(default)
    }
}
