//! Four-axis trait state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of every axis.
pub const AXIS_MIN: f64 = 5.0;
/// Upper bound of every axis.
pub const AXIS_MAX: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Foundation,
    Agency,
    Resource,
    Entropy,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Foundation => "foundation",
            Axis::Agency => "agency",
            Axis::Resource => "resource",
            Axis::Entropy => "entropy",
        };
        f.write_str(name)
    }
}

/// Bounded trait state derived from a response history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    pub foundation: f64,
    pub agency: f64,
    pub resource: f64,
    pub entropy: f64,
}

impl AxisState {
    pub const INITIAL_TRAIT: f64 = 50.0;
    pub const INITIAL_ENTROPY: f64 = 20.0;

    /// State before any response has been scored.
    pub fn initial() -> Self {
        Self {
            foundation: Self::INITIAL_TRAIT,
            agency: Self::INITIAL_TRAIT,
            resource: Self::INITIAL_TRAIT,
            entropy: Self::INITIAL_ENTROPY,
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Foundation => self.foundation,
            Axis::Agency => self.agency,
            Axis::Resource => self.resource,
            Axis::Entropy => self.entropy,
        }
    }

    /// Whole-number view for display.
    pub fn rounded(&self) -> Self {
        Self {
            foundation: self.foundation.round(),
            agency: self.agency.round(),
            resource: self.resource.round(),
            entropy: self.entropy.round(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        [self.foundation, self.agency, self.resource, self.entropy]
            .iter()
            .all(|v| (AXIS_MIN..=AXIS_MAX).contains(v))
    }

    /// Bitwise equality, stricter than `==` for NaN and signed zero.
    pub fn bit_identical(&self, other: &Self) -> bool {
        self.foundation.to_bits() == other.foundation.to_bits()
            && self.agency.to_bits() == other.agency.to_bits()
            && self.resource.to_bits() == other.resource.to_bits()
            && self.entropy.to_bits() == other.entropy.to_bits()
    }
}

impl Default for AxisState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_bounded() {
        let state = AxisState::initial();
        assert!(state.is_bounded());
        assert_eq!(state.get(Axis::Entropy), 20.0);
    }

    #[test]
    fn rounding_is_per_axis() {
        let state = AxisState {
            foundation: 48.126,
            agency: 50.5,
            resource: 61.49,
            entropy: 5.0,
        };
        let r = state.rounded();
        assert_eq!(r.foundation, 48.0);
        assert_eq!(r.agency, 51.0);
        assert_eq!(r.resource, 61.0);
    }
}
