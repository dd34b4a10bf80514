use thiserror::Error;

use crate::response::{Domain, NodeId};

/// Errors raised while constructing or extending the data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("choice position {0} is outside {{-1, 0, 1, 2}}")]
    InvalidChoicePosition(i64),

    #[error("unknown sensation marker: {0}")]
    UnknownSensation(String),

    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    #[error("node {0} already answered in this session")]
    DuplicateNode(NodeId),

    #[error("domain {0} appears more than once in layout")]
    DuplicateDomain(Domain),

    #[error("domain {0} has no items")]
    EmptyDomain(Domain),
}

pub type TypesResult<T> = Result<T, TypesError>;
