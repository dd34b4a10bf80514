//! # psyche-integrity
//!
//! Protects what the assessment kernels produce and keeps checking that the
//! kernels still behave.
//!
//! ## Components
//!
//! - [`SecureCodec`]: device-bound encode/decode of persisted state. The
//!   payload is checksummed, wrapped, passed through a [`StateCipher`] and
//!   base64-encoded. Decoding never trusts a payload whose checksum does not
//!   match.
//! - [`LicenseAuthority`]: self-verifying `PREFIX-TIER-EXPIRY-HASH` keys.
//! - [`NetworkInterceptor`] / [`GuardedTransport`]: explicit egress allow-list
//!   around an injected network primitive.
//! - [`ScriptInventory`]: expected vs. loaded script sources.
//! - [`StateStore`]: storage backends and the storage smoke test.
//! - [`SensitiveVault`]: in-memory sensitive state with an all-or-nothing
//!   lockdown.
//! - [`IntegrityAuditor`] / [`spawn_heartbeat`]: periodic self-audit that
//!   escalates `healthy -> warning -> error -> lockdown`.
//!
//! The default cipher is [`XorObfuscation`]. It is obfuscation, not
//! cryptography; a deployment handling real data should put an authenticated
//! encryption primitive behind the same trait.

#![deny(unsafe_code)]

pub mod audit;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod heartbeat;
pub mod license;
pub mod network;
pub mod scripts;
pub mod storage;
pub mod vault;

pub use audit::{
    AuditCategory, AuditEvent, AuditReport, AuditStatus, CategoryScore, CheckStatus,
    DeterminismProbe, IntegrityAuditor, KernelFixtureProbe,
};
pub use checksum::{checksum, short_checksum};
pub use codec::{CipherKey, SecureCodec, StateCipher, XorObfuscation};
pub use error::{
    CodecError, LicenseError, StorageError, StorageResult, TransportError, VaultError,
};
pub use fingerprint::{DeviceFingerprint, DeviceProfile};
pub use heartbeat::{spawn_heartbeat, HeartbeatHandle, MIN_HEARTBEAT_PERIOD};
pub use license::{LicenseAuthority, LicenseStatus, LicenseTier, DEFAULT_LICENSE_PREFIX};
pub use network::{
    EgressDecision, EgressRecord, EgressRequest, EgressResponse, GuardedTransport, NetworkEvent,
    NetworkInterceptor, NetworkViolation, Transport, MAX_RETAINED_VIOLATIONS,
};
pub use scripts::ScriptInventory;
pub use storage::{smoke_test, FileStore, MemoryStore, StateStore, PROBE_KEY};
pub use vault::{LockdownRecord, LockdownTarget, SensitiveVault};
