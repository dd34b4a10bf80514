//! # psyche-adaptive
//!
//! Decides which item to present next and how settled the session is.
//!
//! Selection walks four phases on every call and returns from the first that
//! yields an item:
//!
//! 1. **Calibration** - the first few ids, in order
//! 2. **Domain floor** - every domain gets a minimum sample
//! 3. **Tension targeting** - probe the domain with the most contradictions
//! 4. **Sequential** - lowest remaining id
//!
//! The item currently on screen is passed as `excluded` and treated as
//! answered, so it is never suggested again.

#![deny(unsafe_code)]

pub mod controller;

pub use controller::{AdaptiveConfig, AdaptiveController, Selection, SelectionPhase};
