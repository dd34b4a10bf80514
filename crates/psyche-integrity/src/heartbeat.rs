//! Background audit loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::audit::IntegrityAuditor;

/// Shortest accepted period; anything below is raised to it.
pub const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(100);

/// Owns the heartbeat task. Dropping the handle stops it.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `auditor.run_audit()` immediately and then every `period`.
///
/// Must be called from within a Tokio runtime. Periods shorter than
/// [`MIN_HEARTBEAT_PERIOD`], zero included, are raised to it.
pub fn spawn_heartbeat(auditor: Arc<IntegrityAuditor>, period: Duration) -> HeartbeatHandle {
    let period = period.max(MIN_HEARTBEAT_PERIOD);
    info!(period_ms = period.as_millis() as u64, "Starting integrity heartbeat");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = auditor.run_audit();
            debug!(sequence = report.sequence, status = %report.status, "Heartbeat audit");
        }
    });

    HeartbeatHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditStatus;
    use crate::network::NetworkInterceptor;
    use crate::scripts::ScriptInventory;
    use crate::storage::MemoryStore;
    use crate::vault::SensitiveVault;

    fn auditor() -> (Arc<IntegrityAuditor>, Arc<NetworkInterceptor>) {
        let network = Arc::new(NetworkInterceptor::new(Vec::<String>::new()));
        let auditor = IntegrityAuditor::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&network),
            Arc::new(ScriptInventory::default()),
            Arc::new(SensitiveVault::new(String::from("session"))),
        );
        (Arc::new(auditor), network)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_schedule_and_stops_on_drop() {
        let (auditor, _) = auditor();
        let handle = spawn_heartbeat(Arc::clone(&auditor), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(31)).await;
        let runs = auditor.runs();
        assert!(runs >= 3, "expected at least 3 runs, got {runs}");
        assert!(handle.is_running());

        handle.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(auditor.runs(), runs);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_engages_lockdown() {
        let (auditor, network) = auditor();
        let _handle = spawn_heartbeat(Arc::clone(&auditor), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(auditor.status(), AuditStatus::Healthy);

        network.observe("https://anywhere.example.com/");
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(auditor.status(), AuditStatus::Lockdown);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_raised_to_minimum() {
        let (auditor, _) = auditor();
        let handle = spawn_heartbeat(Arc::clone(&auditor), Duration::ZERO);

        tokio::time::sleep(MIN_HEARTBEAT_PERIOD * 5 + Duration::from_millis(10)).await;
        assert!(handle.is_running());
        let runs = auditor.runs();
        assert!((5..=7).contains(&runs), "unexpected run count {runs}");
    }
}
