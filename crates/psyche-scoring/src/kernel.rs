//! Scoring kernel and determinism fixture.

use psyche_types::{
    AxisState, BeliefKey, ChoicePosition, Domain, NodeId, ResponseEvent, Sensation, AXIS_MAX,
    AXIS_MIN,
};
use thiserror::Error;
use tracing::{debug, error};

use crate::weights::WeightTable;

const CENTER: f64 = 50.0;
const SPREAD: f64 = 12.0;
const LOGIT_LIMIT: f64 = 5.0;
const STEP: f64 = 0.15;

/// Rounded Foundation value the fixture history must produce.
pub const FIXTURE_FOUNDATION: f64 = 48.0;

/// Move a trait axis by `delta` along the sigmoid.
///
/// The value is mapped into a logit-like domain clamped to `[-5, 5]`, shifted
/// by `delta * 0.15`, and mapped back through the logistic curve.
pub fn update_axis(value: f64, delta: f64) -> f64 {
    let x = ((value - CENTER) / SPREAD).clamp(-LOGIT_LIMIT, LOGIT_LIMIT);
    let shifted = x + delta * STEP;
    let next = 100.0 / (1.0 + (-shifted).exp());
    next.clamp(AXIS_MIN, AXIS_MAX)
}

/// Linear, clamped accumulation for entropy.
pub fn update_entropy(entropy: f64, delta: f64) -> f64 {
    (entropy + delta).clamp(AXIS_MIN, AXIS_MAX)
}

/// Fixture reported as drifted by [`ScoringKernel::self_test`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("determinism drift: expected foundation {expected}, observed {observed}")]
pub struct DeterminismDrift {
    pub expected: f64,
    pub observed: f64,
}

/// One-item history used by the self-test.
pub fn fixture_history() -> Vec<ResponseEvent> {
    vec![ResponseEvent::new(
        NodeId(0),
        Domain::Foundation,
        BeliefKey::ScarcityMindset,
        2000,
        Sensation::S0,
        ChoicePosition::new(0).unwrap_or(ChoicePosition::SKIP),
    )]
}

/// Reduces a history to an [`AxisState`] using a weight table.
#[derive(Debug, Clone, Default)]
pub struct ScoringKernel {
    weights: WeightTable,
}

impl ScoringKernel {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    pub fn standard() -> Self {
        Self::new(WeightTable::standard())
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Apply one response to a state.
    pub fn apply(&self, state: AxisState, event: &ResponseEvent) -> AxisState {
        let w = self.weights.lookup(event.belief_key);
        AxisState {
            foundation: update_axis(state.foundation, w.f),
            agency: update_axis(state.agency, w.a),
            resource: update_axis(state.resource, w.r),
            entropy: update_entropy(state.entropy, w.e),
        }
    }

    /// Fold the full ordered history from the initial state.
    pub fn score(&self, history: &[ResponseEvent]) -> AxisState {
        history
            .iter()
            .fold(AxisState::initial(), |state, event| self.apply(state, event))
    }

    /// Replay the fixture and compare against [`FIXTURE_FOUNDATION`].
    ///
    /// Two evaluations must also agree bit for bit.
    pub fn self_test(&self) -> Result<AxisState, DeterminismDrift> {
        let fixture = fixture_history();
        let first = self.score(&fixture);
        let second = self.score(&fixture);

        if !first.bit_identical(&second) {
            error!(
                first = first.foundation,
                second = second.foundation,
                "Kernel produced different results for identical input"
            );
            return Err(DeterminismDrift {
                expected: first.foundation,
                observed: second.foundation,
            });
        }

        if first.foundation.round() != FIXTURE_FOUNDATION {
            error!(
                expected = FIXTURE_FOUNDATION,
                observed = first.foundation,
                "Kernel fixture drifted"
            );
            return Err(DeterminismDrift {
                expected: FIXTURE_FOUNDATION,
                observed: first.foundation,
            });
        }

        debug!(foundation = first.foundation, "Kernel fixture verified");
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightVector;

    #[test]
    fn fixture_reduces_to_documented_value() {
        let kernel = ScoringKernel::standard();
        let state = kernel.score(&fixture_history());
        assert_eq!(state.foundation.round(), 48.0);
        assert!((state.foundation - 48.126).abs() < 0.01);
        assert!(kernel.self_test().is_ok());
    }

    #[test]
    fn neutral_delta_at_center_is_fixed_point() {
        assert!((update_axis(50.0, 0.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn delta_sign_sets_direction_from_center() {
        assert!(update_axis(50.0, 1.0) > 50.0);
        assert!(update_axis(50.0, -1.0) < 50.0);
        let up = update_axis(50.0, 1.0) - 50.0;
        let down = 50.0 - update_axis(50.0, -1.0);
        assert!((up - down).abs() < 1e-9);
    }

    #[test]
    fn axis_never_leaves_bounds() {
        let mut v = 50.0;
        for _ in 0..500 {
            v = update_axis(v, 10.0);
        }
        assert_eq!(v, AXIS_MAX);
        for _ in 0..500 {
            v = update_axis(v, -10.0);
        }
        assert_eq!(v, AXIS_MIN);
    }

    #[test]
    fn entropy_is_linear_and_clamped() {
        assert_eq!(update_entropy(20.0, 1.5), 21.5);
        assert_eq!(update_entropy(94.0, 2.0), AXIS_MAX);
        assert_eq!(update_entropy(6.0, -3.0), AXIS_MIN);
    }

    #[test]
    fn empty_history_is_initial_state() {
        assert_eq!(ScoringKernel::standard().score(&[]), AxisState::initial());
    }

    #[test]
    fn altered_weights_are_reported_as_drift() {
        let mut weights = WeightTable::standard();
        weights.set(
            BeliefKey::ScarcityMindset,
            WeightVector::new(-3.0, 0.0, 0.0, 0.0),
        );
        let drift = ScoringKernel::new(weights).self_test().unwrap_err();
        assert_eq!(drift.expected, FIXTURE_FOUNDATION);
        assert!(drift.observed < 45.0);
    }
}
