//! CLI command implementations

pub mod assess;
pub mod audit;
pub mod license;
