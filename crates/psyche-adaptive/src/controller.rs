//! Next-item selection and session clarity.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use psyche_contradiction::ContradictionDetector;
use psyche_types::{
    AdaptiveState, Contradiction, Domain, DomainLayout, DomainSlot, NodeId, ResponseEvent,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selection and clarity constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Ids `[0, calibration_items)` are asked first.
    pub calibration_items: u32,
    /// Minimum answered items per domain before targeting starts.
    pub domain_floor: usize,
    /// Responses needed for a complete session.
    pub min_required: usize,
    /// Clarity gained per response.
    pub clarity_per_response: f64,
    /// Clarity lost per contradiction.
    pub contradiction_penalty: f64,
    /// Reported confidence. Held constant.
    pub confidence_score: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            calibration_items: 3,
            domain_floor: 3,
            min_required: 40,
            clarity_per_response: 2.0,
            contradiction_penalty: 1.5,
            confidence_score: 100.0,
        }
    }
}

/// Phase that produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    Calibration,
    DomainFloor,
    TensionTargeting,
    Sequential,
}

impl fmt::Display for SelectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPhase::Calibration => write!(f, "calibration"),
            SelectionPhase::DomainFloor => write!(f, "domain_floor"),
            SelectionPhase::TensionTargeting => write!(f, "tension_targeting"),
            SelectionPhase::Sequential => write!(f, "sequential"),
        }
    }
}

/// Chosen item and the phase that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub node_id: NodeId,
    pub phase: SelectionPhase,
}

/// Adaptive item selection over a fixed domain layout.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    layout: DomainLayout,
    config: AdaptiveConfig,
    detector: ContradictionDetector,
}

impl AdaptiveController {
    pub fn new(layout: DomainLayout, config: AdaptiveConfig, detector: ContradictionDetector) -> Self {
        Self {
            layout,
            config,
            detector,
        }
    }

    pub fn standard() -> Self {
        Self::new(
            DomainLayout::standard(),
            AdaptiveConfig::default(),
            ContradictionDetector::default(),
        )
    }

    pub fn layout(&self) -> &DomainLayout {
        &self.layout
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Next item to present, or `None` once every item is answered.
    pub fn select_next_item(
        &self,
        history: &[ResponseEvent],
        contradictions: &[Contradiction],
        excluded: Option<NodeId>,
    ) -> Option<NodeId> {
        self.select(history, contradictions, excluded)
            .map(|s| s.node_id)
    }

    /// Like [`select_next_item`](Self::select_next_item), also reporting the phase.
    pub fn select(
        &self,
        history: &[ResponseEvent],
        contradictions: &[Contradiction],
        excluded: Option<NodeId>,
    ) -> Option<Selection> {
        let completed = self.completed_ids(history, excluded);
        let selection = self
            .calibration(&completed)
            .or_else(|| self.domain_floor(&completed))
            .or_else(|| self.tension_target(&completed, contradictions))
            .or_else(|| self.sequential(&completed));

        match &selection {
            Some(s) => debug!(node_id = %s.node_id, phase = %s.phase, "Selected next item"),
            None => debug!(answered = completed.len(), "No items remaining"),
        }

        selection
    }

    /// `count * 2.0 - contradictions * 1.5`, clamped to `[0, 100]`.
    pub fn clarity(&self, response_count: usize, contradiction_count: usize) -> f64 {
        let raw = response_count as f64 * self.config.clarity_per_response
            - contradiction_count as f64 * self.config.contradiction_penalty;
        raw.clamp(0.0, 100.0)
    }

    /// Full adaptive state for a history, detecting contradictions with the
    /// history's own latency baseline.
    pub fn evaluate(&self, history: &[ResponseEvent], excluded: Option<NodeId>) -> AdaptiveState {
        let contradictions = self.detector.analyze_with_baseline(history);
        self.evaluate_with(history, contradictions, excluded)
    }

    /// Adaptive state from precomputed contradictions.
    pub fn evaluate_with(
        &self,
        history: &[ResponseEvent],
        contradictions: Vec<Contradiction>,
        excluded: Option<NodeId>,
    ) -> AdaptiveState {
        let count = history.len();
        let next = self.select_next_item(history, &contradictions, excluded);
        let clarity = self.clarity(count, contradictions.len());

        let is_complete = (clarity >= 100.0 && count >= self.config.min_required)
            || next.is_none()
            || count >= self.layout.total() as usize;

        AdaptiveState {
            clarity,
            contradictions,
            is_complete,
            suggested_next_node_id: next,
            confidence_score: self.config.confidence_score,
        }
    }

    fn completed_ids(&self, history: &[ResponseEvent], excluded: Option<NodeId>) -> BTreeSet<u32> {
        history
            .iter()
            .map(|e| e.node_id)
            .chain(excluded)
            .filter(|id| self.layout.contains(*id))
            .map(NodeId::get)
            .collect()
    }

    fn calibration(&self, completed: &BTreeSet<u32>) -> Option<Selection> {
        let end = self.config.calibration_items.min(self.layout.total());
        first_open(0..end, completed).map(|id| Selection {
            node_id: NodeId(id),
            phase: SelectionPhase::Calibration,
        })
    }

    fn domain_floor(&self, completed: &BTreeSet<u32>) -> Option<Selection> {
        self.layout.entries().iter().find_map(|slot| {
            let sampled = completed.range(slot.range()).count();
            if sampled >= self.config.domain_floor {
                return None;
            }
            first_open(slot.range(), completed).map(|id| Selection {
                node_id: NodeId(id),
                phase: SelectionPhase::DomainFloor,
            })
        })
    }

    fn tension_target(
        &self,
        completed: &BTreeSet<u32>,
        contradictions: &[Contradiction],
    ) -> Option<Selection> {
        let mut tension: HashMap<Domain, usize> = HashMap::new();
        for c in contradictions {
            if let Some(domain) = self.layout.domain_of(c.node_id) {
                *tension.entry(domain).or_insert(0) += 1;
            }
        }

        // Stable sort keeps layout order among equal counts.
        let mut ranked: Vec<&DomainSlot> = self
            .layout
            .entries()
            .iter()
            .filter(|slot| tension.contains_key(&slot.domain))
            .collect();
        ranked.sort_by(|a, b| tension[&b.domain].cmp(&tension[&a.domain]));

        ranked.into_iter().find_map(|slot| {
            first_open(slot.range(), completed).map(|id| Selection {
                node_id: NodeId(id),
                phase: SelectionPhase::TensionTargeting,
            })
        })
    }

    fn sequential(&self, completed: &BTreeSet<u32>) -> Option<Selection> {
        first_open(0..self.layout.total(), completed).map(|id| Selection {
            node_id: NodeId(id),
            phase: SelectionPhase::Sequential,
        })
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::standard()
    }
}

fn first_open(mut ids: std::ops::Range<u32>, completed: &BTreeSet<u32>) -> Option<u32> {
    ids.find(|id| !completed.contains(id))
}
