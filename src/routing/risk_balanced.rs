use super::{viable_paths, RouteContext, RouteDecision, RoutingPolicy};

/// Risk-Balanced: among every viable (DC, path) pair, minimize
/// `f(p) = alpha * h_norm(p) + (1 - alpha) * p_max(p)` where `h_norm` is the
/// path's hop count normalized by the longest viable path's hop count and
/// `p_max` is the path's highest armed link failure probability — the same
/// objective Risk-Aware restoration scores candidates with, applied here to
/// admission instead of recovery. Ties resolve by DC iteration order then
/// path index: first-found wins.
#[derive(Debug, Clone, Copy)]
pub struct RiskBalanced {
    pub alpha: f64,
}

impl Default for RiskBalanced {
    fn default() -> Self {
        Self { alpha: 0.5 }
    }
}

impl RoutingPolicy for RiskBalanced {
    fn name(&self) -> &'static str {
        "RiskBalanced"
    }

    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision> {
        let candidates = viable_paths(&ctx);
        let max_hops = candidates.iter().map(|p| p.hop_count()).max().unwrap_or(1).max(1) as f64;

        let mut best: Option<(&crate::topology::Path, f64)> = None;
        for path in candidates {
            let h_norm = path.hop_count() as f64 / max_hops;
            let p_max = ctx.ledger.path_max_failure_probability(path);
            let f = self.alpha * h_norm + (1.0 - self.alpha) * p_max;
            match &best {
                None => best = Some((path, f)),
                Some((_, best_f)) if f < *best_f => best = Some((path, f)),
                Some(_) => {}
            }
        }
        best.map(|(path, _)| RouteDecision { path: path.clone() })
    }
}
