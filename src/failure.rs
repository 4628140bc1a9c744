//! Failure entities: standalone link failures and disaster episodes.

use uuid::Uuid;

use crate::topology::{LinkId, NodeId};

pub type FailureId = u64;

/// Correlates every event and service disruption that belongs to one
/// disaster episode (one zone activation), independent of retries across
/// seeds: generated fresh per activation, not derived from the zone id.
pub type DisasterId = Uuid;

/// Identifies one scheduled disaster arrival/departure pair in the
/// engine's pending-failure table. Distinct from `DisasterId`: several
/// `DisasterEventId`s (one per fired tier) can share the same `DisasterId`
/// when they belong to the same zone activation.
pub type DisasterEventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisasterTier {
    Epicenter,
    T73,
    T15,
    T5,
}

/// A standalone, non-disaster link failure: one randomly chosen link,
/// exponential inter-arrival and duration, independent of the disaster
/// schedule.
#[derive(Debug, Clone)]
pub struct LinkFailure {
    pub id: FailureId,
    pub link: LinkId,
    pub arrival_time: f64,
    pub duration: f64,
}

/// One tier's firing within a disaster episode: which links and nodes it
/// took down, and whether it actually fired (a Bernoulli trial that failed
/// still advances the schedule but carries no links/nodes).
#[derive(Debug, Clone)]
pub struct DisasterFailure {
    pub id: DisasterId,
    pub zone_id: std::sync::Arc<str>,
    pub tier: DisasterTier,
    pub links: Vec<LinkId>,
    pub nodes: Vec<NodeId>,
    pub arrival_time: f64,
    pub duration: f64,
}

impl DisasterFailure {
    pub fn fired(&self) -> bool {
        !self.links.is_empty() || !self.nodes.is_empty()
    }
}
