//! Psyche Types - Core types for the adaptive assessment engine
//!
//! Every other crate in the workspace speaks in terms of these types. They
//! carry no behaviour beyond validation and lookup; scoring, detection and
//! selection live in their own crates.
//!
//! ## Key Concepts
//!
//! - **ResponseEvent**: one answered item, with latency and somatic report
//! - **ResponseHistory**: append-only, ordered record of a session
//! - **DomainLayout**: immutable partition of the item id space into domains
//! - **AxisState**: bounded four-axis trait state derived from a history
//! - **Contradiction / AdaptiveState / PatternFlags**: derived signals

#![deny(unsafe_code)]

pub mod axis;
pub mod error;
pub mod history;
pub mod layout;
pub mod response;
pub mod signals;

pub use axis::{Axis, AxisState, AXIS_MAX, AXIS_MIN};
pub use error::{TypesError, TypesResult};
pub use history::ResponseHistory;
pub use layout::{DomainLayout, DomainSlot, ITEMS_PER_DOMAIN, TOTAL_NODES};
pub use response::{BeliefKey, ChoicePosition, Domain, NodeId, ResponseEvent, Sensation};
pub use signals::{AdaptiveState, Contradiction, ContradictionType, PatternFlags};
