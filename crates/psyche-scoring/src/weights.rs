//! Weight table keyed by belief.

use psyche_types::BeliefKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signed per-axis deltas contributed by one response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub f: f64,
    pub a: f64,
    pub r: f64,
    pub e: f64,
}

impl WeightVector {
    pub const fn new(f: f64, a: f64, r: f64, e: f64) -> Self {
        Self { f, a, r, e }
    }

    pub const NEUTRAL: WeightVector = WeightVector::new(0.0, 0.0, 0.0, 0.0);
}

const STANDARD_WEIGHTS: [(BeliefKey, WeightVector); 14] = [
    (BeliefKey::ScarcityMindset, WeightVector::new(-0.5, -0.2, -1.0, 1.0)),
    (BeliefKey::AbundanceMindset, WeightVector::new(0.4, 0.3, 1.0, -0.5)),
    (BeliefKey::SelfWorth, WeightVector::new(1.0, 0.4, 0.2, -0.5)),
    (BeliefKey::InnerSafety, WeightVector::new(1.2, 0.2, 0.3, -1.0)),
    (BeliefKey::SelfTrust, WeightVector::new(0.5, 1.0, 0.2, -0.5)),
    (BeliefKey::GrowthOrientation, WeightVector::new(0.2, 0.8, 0.5, 0.0)),
    (BeliefKey::SecureConnection, WeightVector::new(0.8, 0.2, 0.4, -0.5)),
    (BeliefKey::Hypervigilance, WeightVector::new(-1.0, -0.3, -0.2, 2.0)),
    (BeliefKey::LearnedHelplessness, WeightVector::new(-0.4, -1.2, -0.5, 1.5)),
    (BeliefKey::PeoplePleasing, WeightVector::new(-0.6, -0.8, 0.0, 1.0)),
    (BeliefKey::Perfectionism, WeightVector::new(-0.3, 0.4, -0.3, 1.5)),
    (BeliefKey::AbandonmentFear, WeightVector::new(-1.0, -0.4, -0.2, 2.0)),
    (BeliefKey::ImpostorFeeling, WeightVector::new(-0.7, -0.5, -0.4, 1.0)),
    (BeliefKey::ControlNeed, WeightVector::new(-0.4, 0.6, -0.2, 1.0)),
];

/// Skips move nothing but entropy.
const DEFAULT_WEIGHT: WeightVector = WeightVector::new(0.0, 0.0, 0.0, 0.5);

/// Lookup table from belief to weight vector, with a fallback for anything
/// not present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: HashMap<BeliefKey, WeightVector>,
    default: WeightVector,
}

impl WeightTable {
    /// Table with only a fallback vector.
    pub fn with_default(default: WeightVector) -> Self {
        Self {
            weights: HashMap::new(),
            default,
        }
    }

    pub fn standard() -> Self {
        let mut table = Self::with_default(DEFAULT_WEIGHT);
        for (key, vector) in STANDARD_WEIGHTS {
            table.weights.insert(key, vector);
        }
        table
    }

    /// Replace or add the vector for a key. Setting `Default` replaces the fallback.
    pub fn set(&mut self, key: BeliefKey, vector: WeightVector) {
        if key.is_default() {
            self.default = vector;
        } else {
            self.weights.insert(key, vector);
        }
    }

    /// Weight for a key, falling back to the default vector.
    pub fn lookup(&self, key: BeliefKey) -> WeightVector {
        self.weights.get(&key).copied().unwrap_or(self.default)
    }

    /// Weight for a raw string key; unknown strings degrade to the default.
    pub fn lookup_str(&self, key: &str) -> WeightVector {
        self.lookup(BeliefKey::parse(key))
    }

    pub fn default_vector(&self) -> WeightVector {
        self.default
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::standard()
    }
}
