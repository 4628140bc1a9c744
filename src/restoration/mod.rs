//! Pluggable restoration policies: what happens to a service whose path
//! runs through a link that just went down.
//!
//! Shaped after a failover manager that inspects health state and returns an
//! action, rather than mutating anything itself: a policy only *decides*
//! whether and where to re-route a disrupted service (`RestoreOutcome`).
//! Applying that decision — reserving capacity, flipping the service's
//! flags, scheduling its new departure — is centralized in `apply_outcome`
//! below so every policy re-provisions identically instead of duplicating
//! that bookkeeping per variant.

mod none;
mod path_restoration;
mod path_restoration_relocation;
mod risk_aware;

pub use none::DoNotRestore;
pub use path_restoration::PathRestoration;
pub use path_restoration_relocation::PathRestorationWithRelocation;
pub use risk_aware::RiskAwareRestoration;

use std::fmt::Debug;

use crate::error::{Result, SimError};
use crate::ledger::Ledger;
use crate::rng::EpisodeRng;
use crate::routing::RoutingPolicy;
use crate::service::Service;
use crate::topology::{Path, PathIndex, Topology};

/// Read-only engine state a restoration policy needs to decide where (if
/// anywhere) a disrupted service goes. No policy mutates the ledger or
/// schedules events directly — see `apply_outcome`.
pub struct RestoreOps<'a> {
    pub topology: &'a Topology,
    pub path_index: &'a PathIndex,
    pub ledger: &'a Ledger,
    pub routing_policy: &'a dyn RoutingPolicy,
    pub rng: &'a mut EpisodeRng,
    pub now: f64,
}

#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    /// The service should resume on `path`; `relocated` is true iff `path`
    /// leads to a different datacenter than the service's prior route.
    Restored { path: Path, relocated: bool },
    /// No viable alternative was found; the caller must seal the service.
    NotRestored,
}

pub trait RestorationPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn restore(&self, service: &Service, ops: RestoreOps<'_>) -> RestoreOutcome;
}

/// Applies a `RestoreOutcome` to `service`: reserves capacity on the new
/// route (or seals the service). Remaining time carries over on
/// restoration, it is not reset to the full holding time. Returns the new
/// departure time on success so the caller can schedule the event (this
/// module owns no `EventQueue`).
pub fn apply_outcome(
    service: &mut Service,
    outcome: RestoreOutcome,
    ledger: &mut Ledger,
    now: f64,
) -> Result<Option<f64>> {
    match outcome {
        RestoreOutcome::Restored { path, relocated } => {
            ledger.provision(&path, service.network_units, service.computing_units, now)?;
            service.expected_risk = ledger.path_risk(&path);
            service.path = path;
            service.provisioned = true;
            service.failed = false;
            if relocated {
                service.relocated = true;
            }
            let remaining = service.remaining_time(now);
            Ok(Some(now + remaining))
        }
        RestoreOutcome::NotRestored => {
            service.seal(now);
            Ok(None)
        }
    }
}

/// Viable alternate paths to the service's current datacenter, excluding its
/// current (now impaired) path, in the path index's stable order.
fn same_dc_alternatives<'a>(
    service: &Service,
    ops: &RestoreOps<'a>,
) -> Vec<&'a Path> {
    ops.path_index
        .paths(&service.source, service.destination())
        .iter()
        .filter(|p| p.links != service.path.links)
        .filter(|p| ops.ledger.path_viable(p, service.network_units, service.computing_units))
        .collect()
}

pub fn by_name(name: &str) -> std::result::Result<Box<dyn RestorationPolicy>, SimError> {
    match name {
        "DNR" => Ok(Box::new(DoNotRestore)),
        "PR" => Ok(Box::new(PathRestoration)),
        "PRwR" => Ok(Box::new(PathRestorationWithRelocation)),
        "PRPA" => Ok(Box::new(RiskAwareRestoration::default())),
        other => Err(SimError::Configuration(format!(
            "unknown restoration policy {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_name_is_a_configuration_error() {
        let err = by_name("not-a-policy").unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }
}
