//! Append-only response history.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{TypesError, TypesResult};
use crate::response::{NodeId, ResponseEvent};

/// Ordered record of a single session.
///
/// Events can only be appended, and each item may be answered once. A session
/// reset replaces the history with a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ResponseEvent>", into = "Vec<ResponseEvent>")]
pub struct ResponseHistory {
    events: Vec<ResponseEvent>,
    answered: HashSet<NodeId>,
}

impl ResponseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from events, rejecting duplicate items.
    pub fn from_events(events: impl IntoIterator<Item = ResponseEvent>) -> TypesResult<Self> {
        let mut history = Self::new();
        for event in events {
            history.push(event)?;
        }
        Ok(history)
    }

    /// Append an answered item.
    pub fn push(&mut self, event: ResponseEvent) -> TypesResult<()> {
        if !self.answered.insert(event.node_id) {
            return Err(TypesError::DuplicateNode(event.node_id));
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[ResponseEvent] {
        &self.events
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.answered.contains(&node_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&ResponseEvent> {
        self.events.last()
    }
}

impl AsRef<[ResponseEvent]> for ResponseHistory {
    fn as_ref(&self) -> &[ResponseEvent] {
        &self.events
    }
}

// Deserialization keeps the first occurrence of a repeated item so that a
// persisted blob never produces a history violating the uniqueness rule.
impl From<Vec<ResponseEvent>> for ResponseHistory {
    fn from(events: Vec<ResponseEvent>) -> Self {
        let mut history = Self::new();
        for event in events {
            let _ = history.push(event);
        }
        history
    }
}

impl From<ResponseHistory> for Vec<ResponseEvent> {
    fn from(history: ResponseHistory) -> Self {
        history.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{BeliefKey, ChoicePosition, Domain, Sensation};

    fn event(id: u32) -> ResponseEvent {
        ResponseEvent::new(
            id,
            Domain::Foundation,
            BeliefKey::SelfWorth,
            1500,
            Sensation::S0,
            ChoicePosition::new(0).unwrap(),
        )
    }

    #[test]
    fn push_preserves_order() {
        let mut history = ResponseHistory::new();
        history.push(event(4)).unwrap();
        history.push(event(1)).unwrap();
        let ids: Vec<u32> = history.events().iter().map(|e| e.node_id.get()).collect();
        assert_eq!(ids, vec![4, 1]);
        assert!(history.contains(NodeId(4)));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut history = ResponseHistory::new();
        history.push(event(7)).unwrap();
        assert_eq!(
            history.push(event(7)),
            Err(TypesError::DuplicateNode(NodeId(7)))
        );
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn serializes_as_plain_array() {
        let history = ResponseHistory::from_events(vec![event(0), event(1)]).unwrap();
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        let back: ResponseHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
