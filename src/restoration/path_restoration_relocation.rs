use super::{same_dc_alternatives, RestorationPolicy, RestoreOps, RestoreOutcome};
use crate::routing::RouteContext;
use crate::service::Service;

/// Path-Restoration-with-Relocation: try same-DC restoration first; on
/// failure, ask the active routing policy to pick any viable
/// (datacenter, path), marking the service relocated if it lands on a
/// different datacenter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRestorationWithRelocation;

impl RestorationPolicy for PathRestorationWithRelocation {
    fn name(&self) -> &'static str {
        "PRwR"
    }

    fn restore(&self, service: &Service, ops: RestoreOps<'_>) -> RestoreOutcome {
        let alternatives = same_dc_alternatives(service, &ops);
        if let Some(path) = alternatives.into_iter().min_by_key(|p| p.hop_count()) {
            return RestoreOutcome::Restored {
                path: path.clone(),
                relocated: false,
            };
        }

        let original_dc = service.destination().clone();
        let datacenters = ops.topology.datacenters().to_vec();
        let decision = ops.routing_policy.route(RouteContext {
            source: &service.source,
            network_units: service.network_units,
            computing_units: service.computing_units,
            datacenters: &datacenters,
            path_index: ops.path_index,
            ledger: ops.ledger,
            rng: ops.rng,
        });

        match decision {
            Some(decision) => {
                let relocated = *decision.path.destination() != original_dc;
                RestoreOutcome::Restored {
                    path: decision.path,
                    relocated,
                }
            }
            None => RestoreOutcome::NotRestored,
        }
    }
}
