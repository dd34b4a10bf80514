//! Self-audit across determinism, storage, network and scripts.
//!
//! Each run scores four categories and folds them into one
//! [`AuditStatus`]. A new egress violation since the previous run is
//! critical: the lockdown target is wiped and locked, and the auditor stays
//! in lockdown until the host re-initializes the target and calls
//! [`IntegrityAuditor::reset`].

use chrono::{DateTime, Utc};
use psyche_scoring::{DeterminismDrift, ScoringKernel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::network::NetworkInterceptor;
use crate::scripts::ScriptInventory;
use crate::storage::{smoke_test, StateStore};
use crate::vault::LockdownTarget;

/// Score deducted per unexpected script source.
const SCRIPT_PENALTY: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Determinism,
    Storage,
    Network,
    Scripts,
}

/// Per-category outcome, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
    Critical,
}

/// Overall status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Healthy,
    Warning,
    Error,
    Lockdown,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Lockdown => "lockdown",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CheckStatus> for AuditStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Pass => Self::Healthy,
            CheckStatus::Warning => Self::Warning,
            CheckStatus::Error => Self::Error,
            CheckStatus::Critical => Self::Lockdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: AuditCategory,
    pub status: CheckStatus,
    /// 0..=100
    pub score: u8,
    pub findings: Vec<String>,
}

impl CategoryScore {
    fn pass(category: AuditCategory) -> Self {
        Self {
            category,
            status: CheckStatus::Pass,
            score: 100,
            findings: Vec::new(),
        }
    }

    fn with(category: AuditCategory, status: CheckStatus, score: u8, finding: String) -> Self {
        Self {
            category,
            status,
            score,
            findings: vec![finding],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: Uuid,
    /// 1 for the first run of this auditor.
    pub sequence: u64,
    pub status: AuditStatus,
    pub categories: Vec<CategoryScore>,
    pub generated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn category(&self, category: AuditCategory) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Events emitted by the auditor.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    StatusChanged {
        old_status: AuditStatus,
        new_status: AuditStatus,
    },

    LockdownEngaged {
        reason: String,
        hosts: Vec<String>,
    },
}

/// Re-runs a known computation and reports drift.
pub trait DeterminismProbe: Send + Sync {
    fn verify(&self) -> Result<(), DeterminismDrift>;
}

/// Probe backed by the scoring kernel's fixture self-test.
#[derive(Debug, Clone)]
pub struct KernelFixtureProbe {
    kernel: ScoringKernel,
}

impl KernelFixtureProbe {
    pub fn new(kernel: ScoringKernel) -> Self {
        Self { kernel }
    }
}

impl Default for KernelFixtureProbe {
    fn default() -> Self {
        Self::new(ScoringKernel::standard())
    }
}

impl DeterminismProbe for KernelFixtureProbe {
    fn verify(&self) -> Result<(), DeterminismDrift> {
        self.kernel.self_test().map(|_| ())
    }
}

#[derive(Debug)]
struct AuditorState {
    status: AuditStatus,
    /// Violations already turned into a lockdown decision.
    violations_seen: usize,
    sequence: u64,
    last_report: Option<AuditReport>,
}

/// Periodic integrity auditor.
pub struct IntegrityAuditor {
    /// Determinism check.
    probe: Box<dyn DeterminismProbe>,

    /// Store exercised by the storage smoke test.
    store: Arc<dyn StateStore>,

    /// Egress record.
    network: Arc<NetworkInterceptor>,

    /// Script inventory.
    scripts: Arc<ScriptInventory>,

    /// Wiped and locked on a critical finding.
    target: Arc<dyn LockdownTarget>,

    /// Mutable audit state. Held for the whole run so runs never interleave.
    state: Mutex<AuditorState>,

    /// Event broadcaster.
    event_tx: broadcast::Sender<AuditEvent>,
}

impl IntegrityAuditor {
    pub fn new(
        store: Arc<dyn StateStore>,
        network: Arc<NetworkInterceptor>,
        scripts: Arc<ScriptInventory>,
        target: Arc<dyn LockdownTarget>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            probe: Box::new(KernelFixtureProbe::default()),
            store,
            network,
            scripts,
            target,
            state: Mutex::new(AuditorState {
                status: AuditStatus::Healthy,
                violations_seen: 0,
                sequence: 0,
                last_report: None,
            }),
            event_tx,
        }
    }

    pub fn with_probe(mut self, probe: impl DeterminismProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.event_tx.subscribe()
    }

    pub fn status(&self) -> AuditStatus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    pub fn last_report(&self) -> Option<AuditReport> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_report
            .clone()
    }

    pub fn runs(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sequence
    }

    /// Run all checks once and escalate.
    #[instrument(skip(self))]
    pub fn run_audit(&self) -> AuditReport {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let (total, recent) = self.network.violations_since(state.violations_seen);
        let fresh: Vec<String> = recent.into_iter().map(|v| v.host).collect();
        let network = self.check_network(&fresh, total);
        state.violations_seen = total;

        let categories = vec![
            self.check_determinism(),
            self.check_storage(),
            network,
            self.check_scripts(),
        ];

        let worst = categories
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass);
        let mut status = AuditStatus::from(worst);

        if !fresh.is_empty() {
            let reason = format!("unauthorized egress to {}", fresh.join(", "));
            if self.target.engage_lockdown(&reason) {
                error!(hosts = ?fresh, "Lockdown engaged");
                let _ = self.event_tx.send(AuditEvent::LockdownEngaged {
                    reason,
                    hosts: fresh,
                });
            }
        }
        if self.target.is_locked() {
            status = AuditStatus::Lockdown;
        }

        if status != state.status {
            match status {
                AuditStatus::Healthy => info!(old = %state.status, "Integrity restored"),
                _ => warn!(old = %state.status, new = %status, "Integrity status changed"),
            }
            let _ = self.event_tx.send(AuditEvent::StatusChanged {
                old_status: state.status,
                new_status: status,
            });
            state.status = status;
        }

        state.sequence += 1;
        let report = AuditReport {
            id: Uuid::new_v4(),
            sequence: state.sequence,
            status,
            categories,
            generated_at: Utc::now(),
        };
        state.last_report = Some(report.clone());
        report
    }

    /// Leave lockdown after the host re-initialized the target.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if self.target.is_locked() {
            warn!("Reset requested while target is still locked");
            return;
        }
        state.violations_seen = self.network.violation_count();
        if state.status != AuditStatus::Healthy {
            let _ = self.event_tx.send(AuditEvent::StatusChanged {
                old_status: state.status,
                new_status: AuditStatus::Healthy,
            });
            state.status = AuditStatus::Healthy;
        }
        info!("Auditor reset");
    }

    fn check_determinism(&self) -> CategoryScore {
        match self.probe.verify() {
            Ok(()) => CategoryScore::pass(AuditCategory::Determinism),
            Err(drift) => CategoryScore::with(
                AuditCategory::Determinism,
                CheckStatus::Error,
                0,
                drift.to_string(),
            ),
        }
    }

    fn check_storage(&self) -> CategoryScore {
        match smoke_test(self.store.as_ref()) {
            Ok(()) => CategoryScore::pass(AuditCategory::Storage),
            Err(e) => CategoryScore::with(
                AuditCategory::Storage,
                CheckStatus::Warning,
                50,
                format!("{} store failed smoke test: {e}", self.store.name()),
            ),
        }
    }

    fn check_network(&self, fresh_hosts: &[String], total: usize) -> CategoryScore {
        if !fresh_hosts.is_empty() {
            return CategoryScore::with(
                AuditCategory::Network,
                CheckStatus::Critical,
                0,
                format!("unauthorized egress to {}", fresh_hosts.join(", ")),
            );
        }
        let mut score = CategoryScore::pass(AuditCategory::Network);
        if total > 0 {
            score
                .findings
                .push(format!("{total} earlier violation(s) already handled"));
        }
        score
    }

    fn check_scripts(&self) -> CategoryScore {
        let unexpected = self.scripts.unexpected();
        if unexpected.is_empty() {
            return CategoryScore::pass(AuditCategory::Scripts);
        }
        let penalty = u8::try_from(unexpected.len())
            .unwrap_or(u8::MAX)
            .saturating_mul(SCRIPT_PENALTY);
        CategoryScore {
            category: AuditCategory::Scripts,
            status: CheckStatus::Warning,
            score: 100u8.saturating_sub(penalty),
            findings: unexpected
                .into_iter()
                .map(|s| format!("unexpected script source {s}"))
                .collect(),
        }
    }
}

impl fmt::Debug for IntegrityAuditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityAuditor")
            .field("store", &self.store.name())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::vault::SensitiveVault;

    struct DriftingProbe;

    impl DeterminismProbe for DriftingProbe {
        fn verify(&self) -> Result<(), DeterminismDrift> {
            Err(DeterminismDrift {
                expected: 48.0,
                observed: 52.0,
            })
        }
    }

    struct Fixture {
        auditor: IntegrityAuditor,
        network: Arc<NetworkInterceptor>,
        scripts: Arc<ScriptInventory>,
        vault: Arc<SensitiveVault<Vec<u32>>>,
    }

    fn fixture() -> Fixture {
        let network = Arc::new(NetworkInterceptor::new(["api.psyche.example"]));
        let scripts = Arc::new(ScriptInventory::new(["app.js"]));
        let vault = Arc::new(SensitiveVault::new(vec![1, 2, 3]));
        let auditor = IntegrityAuditor::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&network),
            Arc::clone(&scripts),
            vault.clone(),
        );
        Fixture {
            auditor,
            network,
            scripts,
            vault,
        }
    }

    #[test]
    fn clean_run_is_healthy() {
        let f = fixture();
        let report = f.auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Healthy);
        assert_eq!(report.sequence, 1);
        assert_eq!(report.categories.len(), 4);
        assert!(report.categories.iter().all(|c| c.score == 100));
    }

    #[test]
    fn unexpected_script_warns() {
        let f = fixture();
        f.scripts.register_loaded("injected.js");
        let report = f.auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Warning);
        assert_eq!(report.category(AuditCategory::Scripts).unwrap().score, 75);
        assert!(!f.vault.is_locked());
    }

    #[test]
    fn drift_is_an_error() {
        let f = fixture();
        let auditor = f.auditor.with_probe(DriftingProbe);
        let report = auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Error);
        assert_eq!(
            report.category(AuditCategory::Determinism).unwrap().status,
            CheckStatus::Error
        );
    }

    #[test]
    fn egress_violation_locks_down_and_stays() {
        let f = fixture();
        let mut events = f.auditor.subscribe();
        f.auditor.run_audit();

        f.network.observe("https://evil.example.net/collect");
        let report = f.auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Lockdown);
        assert!(f.vault.is_locked());
        assert!(f.vault.read(|d| d.len()).is_err());

        match events.try_recv() {
            Ok(AuditEvent::LockdownEngaged { hosts, .. }) => {
                assert_eq!(hosts, vec!["evil.example.net".to_string()])
            }
            other => panic!("expected lockdown event, got {other:?}"),
        }
        assert!(matches!(
            events.try_recv(),
            Ok(AuditEvent::StatusChanged {
                new_status: AuditStatus::Lockdown,
                ..
            })
        ));

        // No new violations, still locked.
        let report = f.auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Lockdown);
        assert_eq!(
            report.category(AuditCategory::Network).unwrap().status,
            CheckStatus::Pass
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn reset_after_reinitialization() {
        let f = fixture();
        f.network.observe("https://evil.example.net/collect");
        f.auditor.run_audit();

        f.auditor.reset();
        assert_eq!(f.auditor.status(), AuditStatus::Lockdown);

        f.vault.reinitialize();
        f.auditor.reset();
        assert_eq!(f.auditor.status(), AuditStatus::Healthy);
        assert_eq!(f.auditor.run_audit().status, AuditStatus::Healthy);

        f.network.observe("https://evil.example.net/again");
        assert_eq!(f.auditor.run_audit().status, AuditStatus::Lockdown);
    }

    #[test]
    fn burst_beyond_retained_log_still_locks_down() {
        let f = fixture();
        f.auditor.run_audit();
        for i in 0..crate::network::MAX_RETAINED_VIOLATIONS + 5 {
            f.network.observe(&format!("https://h{i}.example.net/"));
        }
        let report = f.auditor.run_audit();
        assert_eq!(report.status, AuditStatus::Lockdown);
        let network = report.category(AuditCategory::Network).unwrap();
        assert_eq!(network.status, CheckStatus::Critical);

        f.vault.reinitialize();
        f.auditor.reset();
        assert_eq!(f.auditor.run_audit().status, AuditStatus::Healthy);
    }
}
