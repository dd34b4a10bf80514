//! Egress allow-list.
//!
//! The engine itself never reaches the network. Anything that does goes
//! through a [`Transport`]; wrapping it in [`GuardedTransport`] records every
//! attempt with the [`NetworkInterceptor`] and refuses hosts outside the
//! allow-list. Recorded violations are what the auditor turns into lockdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::TransportError;

/// Violations kept for inspection; older ones only count toward the total.
pub const MAX_RETAINED_VIOLATIONS: usize = 256;

/// Outcome of checking one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressDecision {
    Allowed,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRecord {
    /// `None` for relative URLs; the scheme (`file:`) for host-less ones.
    pub host: Option<String>,
    pub url: String,
    pub decision: EgressDecision,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkViolation {
    pub host: String,
    pub url: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ViolationLog {
    total: usize,
    recent: VecDeque<NetworkViolation>,
}

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    EgressObserved(EgressRecord),
    ViolationDetected(NetworkViolation),
}

/// Records egress attempts and judges them against the allow-list.
#[derive(Debug)]
pub struct NetworkInterceptor {
    allowed_hosts: Vec<String>,
    observed: AtomicU64,
    violations: RwLock<ViolationLog>,
    event_tx: broadcast::Sender<NetworkEvent>,
}

impl NetworkInterceptor {
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            observed: AtomicU64::new(0),
            violations: RwLock::new(ViolationLog::default()),
            event_tx,
        }
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.event_tx.subscribe()
    }

    /// Exact match or a subdomain of an allowed host.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Record one attempted request and decide whether it may proceed.
    pub fn observe(&self, url: &str) -> EgressDecision {
        self.observed.fetch_add(1, Ordering::Relaxed);
        let observed_at = Utc::now();

        let (host, decision) = match url::Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => {
                    let host = host.to_ascii_lowercase();
                    let decision = if self.is_allowed_host(&host) {
                        EgressDecision::Allowed
                    } else {
                        EgressDecision::Blocked
                    };
                    (Some(host), decision)
                }
                // file:, data: and friends never reach an allowed host.
                None => (Some(format!("{}:", parsed.scheme())), EgressDecision::Blocked),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => (None, EgressDecision::Allowed),
            Err(_) => (Some(url.to_string()), EgressDecision::Blocked),
        };

        let record = EgressRecord {
            host: host.clone(),
            url: url.to_string(),
            decision,
            observed_at,
        };
        debug!(url, ?decision, "Egress observed");
        let _ = self.event_tx.send(NetworkEvent::EgressObserved(record));

        if decision == EgressDecision::Blocked {
            let violation = NetworkViolation {
                host: host.unwrap_or_default(),
                url: url.to_string(),
                observed_at,
            };
            warn!(host = %violation.host, "Unauthorized egress attempt");
            {
                let mut log = self.violations.write().unwrap_or_else(PoisonError::into_inner);
                log.total += 1;
                if log.recent.len() == MAX_RETAINED_VIOLATIONS {
                    log.recent.pop_front();
                }
                log.recent.push_back(violation.clone());
            }
            let _ = self.event_tx.send(NetworkEvent::ViolationDetected(violation));
        }

        decision
    }

    /// The most recent violations, oldest first.
    pub fn violations(&self) -> Vec<NetworkViolation> {
        self.violations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .recent
            .iter()
            .cloned()
            .collect()
    }

    /// Violations recorded since the process started, including evicted ones.
    pub fn violation_count(&self) -> usize {
        self.violations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Total count and the retained violations recorded after the first
    /// `seen` ones.
    pub fn violations_since(&self, seen: usize) -> (usize, Vec<NetworkViolation>) {
        let log = self.violations.read().unwrap_or_else(PoisonError::into_inner);
        let fresh = log.total.saturating_sub(seen).min(log.recent.len());
        let skip = log.recent.len() - fresh;
        (log.total, log.recent.iter().skip(skip).cloned().collect())
    }

    pub fn observed_count(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressRequest {
    pub method: String,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

impl EgressRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Injected network primitive.
pub trait Transport: Send + Sync {
    fn send(&self, request: &EgressRequest) -> Result<EgressResponse, TransportError>;
}

/// Transport that consults the interceptor before every request.
pub struct GuardedTransport<T> {
    inner: T,
    interceptor: Arc<NetworkInterceptor>,
}

impl<T: Transport> GuardedTransport<T> {
    pub fn new(inner: T, interceptor: Arc<NetworkInterceptor>) -> Self {
        Self { inner, interceptor }
    }

    pub fn interceptor(&self) -> &Arc<NetworkInterceptor> {
        &self.interceptor
    }
}

impl<T: Transport> Transport for GuardedTransport<T> {
    fn send(&self, request: &EgressRequest) -> Result<EgressResponse, TransportError> {
        match self.interceptor.observe(&request.url) {
            EgressDecision::Allowed => self.inner.send(request),
            EgressDecision::Blocked => Err(TransportError::Blocked {
                host: url::Url::parse(&request.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| request.url.clone()),
            }),
        }
    }
}
