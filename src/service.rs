//! Provisioned service entity: a unit-capacity reservation over a path from
//! a source node to a datacenter, held from arrival until departure,
//! rejection, or a failure seals it.

use crate::event::EventId;
use crate::failure::DisasterId;
use crate::topology::{NodeId, Path};

pub type ServiceId = u64;

/// A service's traffic class: its scheduling priority plus the cost figures
/// the statistics aggregator needs when a service of this class is dropped.
/// `priority` is the primary restoration-ordering key (lower value first);
/// the remaining fields are opaque costs this crate never interprets beyond
/// averaging them over disrupted services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityClass {
    pub priority: u8,
    pub loss_cost: f64,
    pub expected_loss_cost: f64,
    pub max_degradation: f64,
    pub max_delay: f64,
}

impl PriorityClass {
    /// The three traffic classes the arrival process draws from: ~70% class
    /// 3, ~20% class 2, ~10% class 1. Cost figures scale with priority since
    /// a class-1 (highest priority) drop is the most expensive to lose.
    pub fn for_priority(priority: u8) -> Self {
        let (loss_cost, expected_loss_cost, max_degradation, max_delay) = match priority {
            1 => (10.0, 10.0, 0.05, 0.05),
            2 => (5.0, 5.0, 0.1, 0.1),
            _ => (1.0, 1.0, 0.2, 0.2),
        };
        Self {
            priority,
            loss_cost,
            expected_loss_cost,
            max_degradation,
            max_delay,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub source: NodeId,
    pub arrival_time: f64,
    pub holding_time: f64,
    pub computing_units: u32,
    pub network_units: u32,
    pub priority_class: PriorityClass,

    /// The path currently reserving capacity for this service. Updated in
    /// place on relocation/restoration; `path.destination()` is always this
    /// service's current datacenter.
    pub path: Path,
    /// Event id of this service's scheduled departure, so a restoration
    /// policy relocating it can cancel the old departure before scheduling
    /// a new one at `arrival_time + holding_time` on the new route.
    pub departure_event: EventId,

    pub provisioned: bool,
    pub failed: bool,
    /// Set the first time this service is disrupted by any failure; a
    /// second disruption while this is already true is a re-disruption.
    pub failed_before: bool,
    pub relocated: bool,
    /// `risk(route)` as of the last (re-)provisioning.
    pub expected_risk: f64,
    /// The disaster episode that last disrupted this service, used as the
    /// re-disruption correlation key.
    pub service_disaster_id: Option<DisasterId>,

    /// Set once the service leaves the system (departed or sealed).
    pub service_time: Option<f64>,
    /// `service_time / holding_time`, set alongside `service_time`.
    pub availability: Option<f64>,
}

impl Service {
    pub fn destination(&self) -> &NodeId {
        self.path.destination()
    }

    /// `holding_time - (now - arrival_time)`: how much of this service's
    /// holding time is still owed as of `now`.
    pub fn remaining_time(&self, now: f64) -> f64 {
        self.holding_time - (now - self.arrival_time)
    }

    /// Marks this service as having left the system at `now`, recording
    /// `service_time` and `availability`.
    pub fn seal(&mut self, now: f64) {
        let service_time = now - self.arrival_time;
        self.service_time = Some(service_time);
        self.availability = Some(service_time / self.holding_time);
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Service {}
impl std::hash::Hash for Service {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Path;
    use smallvec::smallvec;

    fn stub_service(id: ServiceId) -> Service {
        Service {
            id,
            source: std::sync::Arc::from("A"),
            arrival_time: 0.0,
            holding_time: 10.0,
            computing_units: 1,
            network_units: 1,
            priority_class: PriorityClass::for_priority(3),
            path: Path {
                nodes: smallvec![std::sync::Arc::from("A"), std::sync::Arc::from("D1")],
                links: smallvec![0],
            },
            departure_event: 0,
            provisioned: true,
            failed: false,
            failed_before: false,
            relocated: false,
            expected_risk: 0.0,
            service_disaster_id: None,
            service_time: None,
            availability: None,
        }
    }

    #[test]
    fn services_compare_by_id_only() {
        let mut a = stub_service(1);
        let b = stub_service(1);
        a.failed = true;
        assert_eq!(a, b);
        let c = stub_service(2);
        assert_ne!(a, c);
    }

    #[test]
    fn sealing_computes_availability() {
        let mut s = stub_service(1);
        s.arrival_time = 5.0;
        s.holding_time = 20.0;
        s.seal(15.0);
        assert_eq!(s.service_time, Some(10.0));
        assert_eq!(s.availability, Some(0.5));
    }
}
