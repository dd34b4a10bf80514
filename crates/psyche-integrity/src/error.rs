use thiserror::Error;

/// Why a blob failed to decode. Callers of `decode` only ever see `None`.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("payload could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("deciphered blob is not UTF-8")]
    Utf8,

    #[error("envelope is malformed: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("payload does not match the expected type: {0}")]
    Payload(#[source] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("license tier must be non-empty upper-case alphanumerics, got '{0}'")]
    InvalidTier(String),

    #[error("license prefix must be non-empty upper-case alphanumerics, got '{0}'")]
    InvalidPrefix(String),

    #[error("license duration overflows the calendar")]
    DurationOverflow,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage probe read back '{read:?}' instead of the written value")]
    ProbeMismatch { read: Option<String> },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("egress to '{host}' is not on the allow-list")]
    Blocked { host: String },

    #[error("transport failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("session is in lockdown: {reason}")]
    Locked { reason: String },
}
