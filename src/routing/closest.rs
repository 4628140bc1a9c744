use super::{viable_paths, RouteContext, RouteDecision, RoutingPolicy};

/// Closest Available Datacenter: among every viable path to any
/// datacenter, pick the one with the fewest hops. Ties keep the first one
/// found, which is the path index's stable (datacenter, ascending hop
/// count) order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestAvailableDc;

impl RoutingPolicy for ClosestAvailableDc {
    fn name(&self) -> &'static str {
        "CADC"
    }

    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision> {
        let candidates = viable_paths(&ctx);
        candidates
            .into_iter()
            .min_by_key(|p| p.hop_count())
            .cloned()
            .map(|path| RouteDecision { path })
    }
}
