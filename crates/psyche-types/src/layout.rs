//! Partition of the item id space into domains.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{TypesError, TypesResult};
use crate::response::{Domain, NodeId};

/// Items per domain in the standard layout.
pub const ITEMS_PER_DOMAIN: u32 = 12;

/// Total items in the standard layout.
pub const TOTAL_NODES: u32 = ITEMS_PER_DOMAIN * Domain::ALL.len() as u32;

/// One contiguous block of ids belonging to a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSlot {
    pub domain: Domain,
    pub count: u32,
    pub start_id: u32,
}

impl DomainSlot {
    pub fn range(&self) -> Range<u32> {
        self.start_id..self.start_id + self.count
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.range().contains(&node_id.get())
    }
}

/// Ordered, immutable partition of `0..total` into domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLayout {
    slots: Vec<DomainSlot>,
    total: u32,
}

impl DomainLayout {
    /// Build a layout from `(domain, count)` pairs; start ids are assigned in order.
    pub fn new(domains: &[(Domain, u32)]) -> TypesResult<Self> {
        let mut slots = Vec::with_capacity(domains.len());
        let mut next_start = 0u32;

        for &(domain, count) in domains {
            if count == 0 {
                return Err(TypesError::EmptyDomain(domain));
            }
            if slots.iter().any(|s: &DomainSlot| s.domain == domain) {
                return Err(TypesError::DuplicateDomain(domain));
            }
            slots.push(DomainSlot {
                domain,
                count,
                start_id: next_start,
            });
            next_start += count;
        }

        Ok(Self {
            slots,
            total: next_start,
        })
    }

    /// Twelve items for each of the five domains, in [`Domain::ALL`] order.
    pub fn standard() -> Self {
        let mut slots = Vec::with_capacity(Domain::ALL.len());
        for (index, domain) in Domain::ALL.iter().enumerate() {
            slots.push(DomainSlot {
                domain: *domain,
                count: ITEMS_PER_DOMAIN,
                start_id: index as u32 * ITEMS_PER_DOMAIN,
            });
        }
        Self {
            slots,
            total: TOTAL_NODES,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn entries(&self) -> &[DomainSlot] {
        &self.slots
    }

    pub fn slot(&self, domain: Domain) -> Option<&DomainSlot> {
        self.slots.iter().find(|s| s.domain == domain)
    }

    pub fn range(&self, domain: Domain) -> Option<Range<u32>> {
        self.slot(domain).map(DomainSlot::range)
    }

    /// Domain owning an item, `None` if the id lies outside the layout.
    pub fn domain_of(&self, node_id: NodeId) -> Option<Domain> {
        self.slots
            .iter()
            .find(|s| s.contains(node_id))
            .map(|s| s.domain)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        node_id.get() < self.total
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.total).map(NodeId)
    }
}

impl Default for DomainLayout {
    fn default() -> Self {
        Self::standard()
    }
}
