//! # psyche-scoring
//!
//! Pure scoring kernel: response history in, bounded [`AxisState`] out.
//!
//! Foundation, Agency and Resource move along a sigmoid so that a single
//! answer near either extreme has diminishing effect. Entropy accumulates
//! linearly. Both are clamped to `[5, 95]`.
//!
//! The kernel carries a one-item fixture with a known result. The integrity
//! audit replays it on every heartbeat; a mismatch is reported as
//! [`DeterminismDrift`].

#![deny(unsafe_code)]

pub mod kernel;
pub mod weights;

pub use kernel::{
    fixture_history, update_axis, update_entropy, DeterminismDrift, ScoringKernel,
    FIXTURE_FOUNDATION,
};
pub use weights::{WeightTable, WeightVector};

pub use psyche_types::AxisState;
