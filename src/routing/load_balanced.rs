use super::{viable_paths, RouteContext, RouteDecision, RoutingPolicy};

/// Full Load Balancing: among every viable path, minimize
/// `(max_link_usage_on_path / resource_units_per_link) * (dc_used / dc_total)`
/// — this spreads load across both the network and the datacenters instead
/// of favoring proximity. Ties favor fewer hops.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullLoadBalancing;

impl RoutingPolicy for FullLoadBalancing {
    fn name(&self) -> &'static str {
        "FLB"
    }

    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision> {
        let candidates = viable_paths(&ctx);
        let mut best: Option<(&crate::topology::Path, f64)> = None;
        for path in candidates {
            let link_usage = path
                .links
                .iter()
                .map(|&l| {
                    let total = ctx.ledger.total_units(l) as f64;
                    if total <= 0.0 {
                        0.0
                    } else {
                        (total - ctx.ledger.available_units(l) as f64) / total
                    }
                })
                .fold(0.0_f64, f64::max);
            let dest = path.destination();
            let dc_total = ctx.ledger.node_total_units(dest) as f64;
            let dc_load = if dc_total <= 0.0 {
                0.0
            } else {
                (dc_total - ctx.ledger.node_available_units(dest) as f64) / dc_total
            };
            let load = link_usage * dc_load;
            match &best {
                None => best = Some((path, load)),
                Some((b, best_load)) => {
                    if load < *best_load || (load == *best_load && path.hop_count() < b.hop_count())
                    {
                        best = Some((path, load));
                    }
                }
            }
        }
        best.map(|(path, _)| RouteDecision { path: path.clone() })
    }
}
