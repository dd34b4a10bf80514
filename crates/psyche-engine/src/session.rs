//! Assessment session facade.

use chrono::{DateTime, Utc};
use psyche_adaptive::AdaptiveController;
use psyche_integrity::{
    spawn_heartbeat, AuditReport, DeviceProfile, FileStore, HeartbeatHandle, IntegrityAuditor,
    MemoryStore, NetworkInterceptor, ScriptInventory, SensitiveVault, StateStore,
};
use psyche_scoring::ScoringKernel;
use psyche_types::{
    AdaptiveState, AxisState, DomainLayout, NodeId, PatternFlags, ResponseEvent, ResponseHistory,
    TypesResult,
};
use psyche_validity::ValidityDetector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, StorageBackend};
use crate::error::{EngineError, EngineResult};
use crate::persistence::{LoadOutcome, SecureStorage, SESSION_KEY};

/// Sensitive state of one session. Lives only inside the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_id: Uuid,
    pub history: ResponseHistory,
    pub started_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            history: ResponseHistory::new(),
            started_at: Utc::now(),
        }
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub responses: usize,
    pub axes: AxisState,
    pub adaptive: AdaptiveState,
    pub flags: PatternFlags,
}

/// One assessment session with its integrity guard.
pub struct AssessmentEngine {
    kernel: ScoringKernel,
    controller: AdaptiveController,
    validity: ValidityDetector,
    storage: Arc<SecureStorage>,
    vault: Arc<SensitiveVault<SessionData>>,
    network: Arc<NetworkInterceptor>,
    scripts: Arc<ScriptInventory>,
    auditor: Arc<IntegrityAuditor>,
    heartbeat_interval: Duration,
}

impl AssessmentEngine {
    pub fn new(config: &EngineConfig, storage: SecureStorage) -> Self {
        let layout = DomainLayout::standard();
        let validity = config.assessment.validity_detector(&layout);
        let controller = config.assessment.controller(layout);

        let storage = Arc::new(storage);
        let vault = Arc::new(SensitiveVault::new(SessionData::new()));
        let network = Arc::new(NetworkInterceptor::new(&config.integrity.allowed_hosts));
        let scripts = Arc::new(ScriptInventory::new(
            config.integrity.expected_scripts.iter().cloned(),
        ));
        let auditor = Arc::new(IntegrityAuditor::new(
            storage.primary_store(),
            Arc::clone(&network),
            Arc::clone(&scripts),
            vault.clone(),
        ));

        Self {
            kernel: ScoringKernel::standard(),
            controller,
            validity,
            storage,
            vault,
            network,
            scripts,
            auditor,
            heartbeat_interval: Duration::from_secs(config.integrity.heartbeat_interval_secs.max(1)),
        }
    }

    /// Engine with storage and device binding taken from `config` and the host.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let store: Arc<dyn StateStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => match FileStore::open(&config.storage.path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(path = %config.storage.path.display(), error = %e, "File storage unavailable, using memory");
                    Arc::new(MemoryStore::new())
                }
            },
        };
        let fingerprint = DeviceProfile::detect().fingerprint();
        let storage = SecureStorage::new(store, config.integrity.system_salt.clone(), fingerprint);
        Ok(Self::new(config, storage))
    }

    pub fn layout(&self) -> &DomainLayout {
        self.controller.layout()
    }

    pub fn storage(&self) -> &SecureStorage {
        &self.storage
    }

    pub fn network(&self) -> &Arc<NetworkInterceptor> {
        &self.network
    }

    pub fn scripts(&self) -> &Arc<ScriptInventory> {
        &self.scripts
    }

    pub fn auditor(&self) -> &Arc<IntegrityAuditor> {
        &self.auditor
    }

    pub fn is_locked(&self) -> bool {
        self.vault.is_locked()
    }

    pub fn session_id(&self) -> EngineResult<Uuid> {
        Ok(self.vault.read(|s| s.session_id)?)
    }

    pub fn history(&self) -> EngineResult<Vec<ResponseEvent>> {
        Ok(self.vault.read(|s| s.history.events().to_vec())?)
    }

    /// Append a response and return the updated adaptive state.
    #[instrument(skip(self, event), fields(node_id = %event.node_id))]
    pub fn record_response(&self, event: ResponseEvent) -> EngineResult<AdaptiveState> {
        let state = self.vault.write(|s| -> TypesResult<AdaptiveState> {
            s.history.push(event)?;
            Ok(self.controller.evaluate(s.history.events(), None))
        })??;

        debug!(
            clarity = state.clarity,
            next = ?state.suggested_next_node_id,
            complete = state.is_complete,
            "Response recorded"
        );
        Ok(state)
    }

    pub fn axis_state(&self) -> EngineResult<AxisState> {
        Ok(self.vault.read(|s| self.kernel.score(s.history.events()))?)
    }

    pub fn adaptive_state(&self, excluded: Option<NodeId>) -> EngineResult<AdaptiveState> {
        Ok(self
            .vault
            .read(|s| self.controller.evaluate(s.history.events(), excluded))?)
    }

    pub fn validity(&self) -> EngineResult<PatternFlags> {
        Ok(self.vault.read(|s| self.validity.analyze(s.history.events()))?)
    }

    pub fn snapshot(&self) -> EngineResult<SessionSnapshot> {
        Ok(self.vault.read(|s| {
            let events = s.history.events();
            SessionSnapshot {
                session_id: s.session_id,
                started_at: s.started_at,
                responses: events.len(),
                axes: self.kernel.score(events),
                adaptive: self.controller.evaluate(events, None),
                flags: self.validity.analyze(events),
            }
        })?)
    }

    /// Supersede the current session with a fresh one.
    pub fn reset(&self) -> EngineResult<Uuid> {
        let fresh = SessionData::new();
        let id = fresh.session_id;
        let previous = self.vault.replace(fresh)?;
        info!(previous = %previous.session_id, session = %id, "Session reset");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn save(&self) -> EngineResult<()> {
        let data = self.vault.read(SessionData::clone)?;
        self.storage.save(SESSION_KEY, &data)
    }

    /// Restore the persisted session, or start fresh when there is none or it
    /// cannot be trusted.
    #[instrument(skip(self))]
    pub fn restore(&self) -> EngineResult<LoadOutcome<Uuid>> {
        if let Some(record) = self.vault.lockdown_record() {
            return Err(EngineError::Lockdown {
                reason: record.reason,
            });
        }

        let outcome = match self.storage.load::<SessionData>(SESSION_KEY)? {
            LoadOutcome::Loaded(data) => {
                let id = data.session_id;
                info!(session = %id, responses = data.history.len(), "Session restored");
                self.vault.replace(data)?;
                LoadOutcome::Loaded(id)
            }
            LoadOutcome::Missing => {
                self.vault.replace(SessionData::new())?;
                LoadOutcome::Missing
            }
            LoadOutcome::Corrupted => {
                warn!("Discarding unreadable session state");
                self.storage.remove(SESSION_KEY)?;
                self.vault.replace(SessionData::new())?;
                LoadOutcome::Corrupted
            }
        };
        Ok(outcome)
    }

    /// Run one integrity audit now.
    pub fn run_audit(&self) -> AuditReport {
        self.auditor.run_audit()
    }

    /// Start the periodic audit. Requires a Tokio runtime.
    pub fn start_heartbeat(&self) -> HeartbeatHandle {
        spawn_heartbeat(Arc::clone(&self.auditor), self.heartbeat_interval)
    }

    /// Leave lockdown with a fresh session.
    pub fn reinitialize(&self) {
        self.vault.reinitialize();
        self.auditor.reset();
        info!("Engine reinitialized after lockdown");
    }
}

impl std::fmt::Debug for AssessmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentEngine")
            .field("storage", &self.storage)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
