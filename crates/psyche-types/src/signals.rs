//! Signals derived from a history: contradictions, adaptive state, pattern flags.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::response::{BeliefKey, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    /// Unusually slow answer to a self-affirming option.
    LatencyMask,
    /// Distress marker reported alongside a self-affirming option.
    SomaticClash,
}

impl fmt::Display for ContradictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContradictionType::LatencyMask => write!(f, "latency_mask"),
            ContradictionType::SomaticClash => write!(f, "somatic_clash"),
        }
    }
}

/// Mismatch between a declared choice and its timing or somatic signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    #[serde(rename = "type")]
    pub kind: ContradictionType,
    pub node_id: NodeId,
    pub belief_key: BeliefKey,
    /// In `(0, 1]`.
    pub severity: f64,
    pub description: String,
}

/// What to present next and how settled the session is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveState {
    pub clarity: f64,
    pub contradictions: Vec<Contradiction>,
    pub is_complete: bool,
    pub suggested_next_node_id: Option<NodeId>,
    pub confidence_score: f64,
}

/// Anti-gaming flags for a finished or nearly finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFlags {
    pub is_monotonic: bool,
    pub is_high_skip_rate: bool,
    pub is_flatline: bool,
    pub is_robotic_timing: bool,
    pub is_somatic_monotony: bool,
    pub is_early_termination: bool,
    pub dominant_position: Option<i8>,
}

impl PatternFlags {
    /// Any engagement flag raised. Early termination alone does not count.
    pub fn is_suspect(&self) -> bool {
        self.is_monotonic
            || self.is_high_skip_rate
            || self.is_flatline
            || self.is_robotic_timing
            || self.is_somatic_monotony
    }

    /// Names of the raised flags, in declaration order.
    pub fn reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.is_monotonic {
            reasons.push("monotonic");
        }
        if self.is_high_skip_rate {
            reasons.push("high_skip_rate");
        }
        if self.is_flatline {
            reasons.push("flatline");
        }
        if self.is_robotic_timing {
            reasons.push("robotic_timing");
        }
        if self.is_somatic_monotony {
            reasons.push("somatic_monotony");
        }
        if self.is_early_termination {
            reasons.push("early_termination");
        }
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_termination_alone_is_not_suspect() {
        let flags = PatternFlags {
            is_early_termination: true,
            ..Default::default()
        };
        assert!(!flags.is_suspect());
        assert_eq!(flags.reasons(), vec!["early_termination"]);
    }

    #[test]
    fn contradiction_uses_type_field_on_the_wire() {
        let c = Contradiction {
            kind: ContradictionType::SomaticClash,
            node_id: NodeId(5),
            belief_key: BeliefKey::SelfWorth,
            severity: 0.95,
            description: "tension reported".into(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "somatic_clash");
        assert_eq!(json["nodeId"], 5);
        assert_eq!(json["beliefKey"], "self_worth");
    }
}
