use super::{RouteContext, RouteDecision, RoutingPolicy};

/// Random Available Datacenter: the datacenter list is permuted uniformly
/// through the episode RNG, then the first datacenter in that permuted
/// order that has at least one viable path wins; within it the shortest
/// viable path is chosen.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAvailableDc;

impl RoutingPolicy for RandomAvailableDc {
    fn name(&self) -> &'static str {
        "RADC"
    }

    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision> {
        let mut order: Vec<&crate::topology::NodeId> = ctx.datacenters.iter().collect();
        ctx.rng.shuffle("routing.radc.dc_order", &mut order);

        for dc in order {
            let shortest = ctx
                .path_index
                .paths(ctx.source, dc)
                .iter()
                .filter(|p| ctx.ledger.path_viable(p, ctx.network_units, ctx.computing_units))
                .min_by_key(|p| p.hop_count());
            if let Some(path) = shortest {
                return Some(RouteDecision { path: path.clone() });
            }
        }
        None
    }
}
