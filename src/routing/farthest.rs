use super::{viable_paths, RouteContext, RouteDecision, RoutingPolicy};

/// Farthest Available Datacenter: among every viable path, pick the one
/// with the most hops. Ties keep the first one found (`Iterator::max_by_key`
/// would keep the *last* tie, so the comparison is done by hand).
#[derive(Debug, Clone, Copy, Default)]
pub struct FarthestAvailableDc;

impl RoutingPolicy for FarthestAvailableDc {
    fn name(&self) -> &'static str {
        "FADC"
    }

    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision> {
        let candidates = viable_paths(&ctx);
        let mut best: Option<&crate::topology::Path> = None;
        for path in candidates {
            match best {
                None => best = Some(path),
                Some(b) if path.hop_count() > b.hop_count() => best = Some(path),
                _ => {}
            }
        }
        best.cloned().map(|path| RouteDecision { path })
    }
}
