//! # psyche-contradiction
//!
//! Flags responses whose timing or somatic report disagrees with the valence
//! of the chosen option.
//!
//! - **latency_mask**: a self-affirming option taken far slower than the
//!   session baseline
//! - **somatic_clash**: a self-affirming option reported with tension or fear
//!
//! Calibration items are never analysed. Detection is a pure function of the
//! history; an empty history yields no contradictions.

#![deny(unsafe_code)]

use psyche_types::{Contradiction, ContradictionType, ResponseEvent};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Thresholds and severities for contradiction detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionConfig {
    /// Items with an id below this are calibration and skipped.
    pub calibration_items: u32,
    /// Responses averaged for the latency baseline.
    pub baseline_window: usize,
    /// Baseline used before any response exists (ms).
    pub default_baseline_ms: f64,
    /// Latency above `baseline * factor` counts as masked.
    pub latency_factor: f64,
    pub latency_mask_severity: f64,
    pub somatic_clash_severity: f64,
}

impl Default for ContradictionConfig {
    fn default() -> Self {
        Self {
            calibration_items: 3,
            baseline_window: 5,
            default_baseline_ms: 2000.0,
            latency_factor: 2.8,
            latency_mask_severity: 0.85,
            somatic_clash_severity: 0.95,
        }
    }
}

/// Contradiction detector over an immutable history.
#[derive(Debug, Clone, Default)]
pub struct ContradictionDetector {
    config: ContradictionConfig,
}

impl ContradictionDetector {
    pub fn new(config: ContradictionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContradictionConfig {
        &self.config
    }

    /// Mean latency of the first responses, or the default when empty.
    pub fn baseline_latency(&self, history: &[ResponseEvent]) -> f64 {
        let window: Vec<u64> = history
            .iter()
            .take(self.config.baseline_window)
            .map(|e| e.latency_ms)
            .collect();

        if window.is_empty() {
            return self.config.default_baseline_ms;
        }

        window.iter().map(|&l| l as f64).sum::<f64>() / window.len() as f64
    }

    /// Detect contradictions against an explicit baseline.
    pub fn analyze(&self, history: &[ResponseEvent], baseline_ms: f64) -> Vec<Contradiction> {
        let threshold = baseline_ms * self.config.latency_factor;
        let mut found = Vec::new();

        for event in history {
            if event.node_id.get() < self.config.calibration_items {
                continue;
            }
            if !event.belief_key.is_positive() {
                continue;
            }

            if event.latency_ms as f64 > threshold {
                trace!(node_id = %event.node_id, latency_ms = event.latency_ms, threshold, "Latency mask");
                found.push(Contradiction {
                    kind: ContradictionType::LatencyMask,
                    node_id: event.node_id,
                    belief_key: event.belief_key,
                    severity: self.config.latency_mask_severity,
                    description: format!(
                        "Chose '{}' after {}ms, more than {:.1}x the {:.0}ms baseline",
                        event.belief_key, event.latency_ms, self.config.latency_factor, baseline_ms
                    ),
                });
            }

            if event.sensation.is_distress_marker() {
                trace!(node_id = %event.node_id, sensation = %event.sensation, "Somatic clash");
                found.push(Contradiction {
                    kind: ContradictionType::SomaticClash,
                    node_id: event.node_id,
                    belief_key: event.belief_key,
                    severity: self.config.somatic_clash_severity,
                    description: format!(
                        "Chose '{}' while reporting sensation {}",
                        event.belief_key, event.sensation
                    ),
                });
            }
        }

        found
    }

    /// Detect contradictions against the history's own baseline.
    pub fn analyze_with_baseline(&self, history: &[ResponseEvent]) -> Vec<Contradiction> {
        let baseline = self.baseline_latency(history);
        self.analyze(history, baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyche_types::{BeliefKey, ChoicePosition, Domain, NodeId, Sensation};

    fn event(id: u32, key: BeliefKey, latency_ms: u64, sensation: Sensation) -> ResponseEvent {
        ResponseEvent::new(
            id,
            Domain::Agency,
            key,
            latency_ms,
            sensation,
            ChoicePosition::new(1).unwrap(),
        )
    }

    #[test]
    fn baseline_defaults_when_empty() {
        let detector = ContradictionDetector::default();
        assert_eq!(detector.baseline_latency(&[]), 2000.0);
    }

    #[test]
    fn baseline_uses_first_five() {
        let detector = ContradictionDetector::default();
        let history: Vec<_> = (0..8)
            .map(|i| event(i, BeliefKey::Default, 1000 * (u64::from(i) + 1), Sensation::S0))
            .collect();
        // (1000 + 2000 + 3000 + 4000 + 5000) / 5
        assert_eq!(detector.baseline_latency(&history), 3000.0);
    }

    #[test]
    fn calibration_items_are_skipped() {
        let detector = ContradictionDetector::default();
        let history = vec![event(2, BeliefKey::SelfWorth, 99_000, Sensation::S4)];
        assert!(detector.analyze(&history, 1000.0).is_empty());
    }

    #[test]
    fn slow_positive_choice_is_latency_mask() {
        let detector = ContradictionDetector::default();
        let history = vec![event(5, BeliefKey::InnerSafety, 2900, Sensation::S2)];
        let found = detector.analyze(&history, 1000.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ContradictionType::LatencyMask);
        assert_eq!(found[0].severity, 0.85);
        assert_eq!(found[0].node_id, NodeId(5));
    }

    #[test]
    fn below_threshold_is_not_masked() {
        let detector = ContradictionDetector::default();
        let history = vec![event(5, BeliefKey::InnerSafety, 2750, Sensation::S0)];
        assert!(detector.analyze(&history, 1000.0).is_empty());
    }

    #[test]
    fn distress_on_positive_choice_is_somatic_clash() {
        let detector = ContradictionDetector::default();
        let history = vec![
            event(3, BeliefKey::SelfTrust, 900, Sensation::S1),
            event(4, BeliefKey::SelfTrust, 900, Sensation::S3),
            event(6, BeliefKey::Hypervigilance, 900, Sensation::S4),
        ];
        let found = detector.analyze(&history, 1000.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ContradictionType::SomaticClash);
        assert_eq!(found[0].severity, 0.95);
    }

    #[test]
    fn one_event_can_raise_both() {
        let detector = ContradictionDetector::default();
        let history = vec![event(10, BeliefKey::SelfWorth, 10_000, Sensation::S4)];
        let kinds: Vec<_> = detector
            .analyze(&history, 1000.0)
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ContradictionType::LatencyMask, ContradictionType::SomaticClash]
        );
    }

    #[test]
    fn limiting_beliefs_never_contradict() {
        let detector = ContradictionDetector::default();
        let history: Vec<_> = (3..20)
            .map(|i| event(i, BeliefKey::ScarcityMindset, 50_000, Sensation::S4))
            .collect();
        assert!(detector.analyze_with_baseline(&history).is_empty());
    }
}
