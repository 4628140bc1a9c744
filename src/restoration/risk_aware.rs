use super::{RestorationPolicy, RestoreOps, RestoreOutcome};
use crate::service::Service;
use crate::topology::Path;

/// Risk-Aware (balanced) restoration: evaluates every viable (datacenter,
/// path) candidate — same DC included — with
/// `f(p) = alpha * h_norm(p) + (1 - alpha) * p_max(p)` and restores to
/// whichever minimizes `f`. Ties favor DC iteration order, then path index
/// order.
#[derive(Debug, Clone, Copy)]
pub struct RiskAwareRestoration {
    pub alpha: f64,
}

impl Default for RiskAwareRestoration {
    fn default() -> Self {
        Self { alpha: 0.5 }
    }
}

impl RestorationPolicy for RiskAwareRestoration {
    fn name(&self) -> &'static str {
        "PRPA"
    }

    fn restore(&self, service: &Service, ops: RestoreOps<'_>) -> RestoreOutcome {
        let original_dc = service.destination().clone();

        let mut candidates: Vec<(&Path, bool)> = Vec::new();
        for dc in ops.topology.datacenters() {
            for path in ops.path_index.paths(&service.source, dc) {
                if *dc == original_dc && path.links == service.path.links {
                    continue; // the impaired route itself is never a candidate
                }
                if ops
                    .ledger
                    .path_viable(path, service.network_units, service.computing_units)
                {
                    candidates.push((path, *dc != original_dc));
                }
            }
        }

        let max_hops = candidates
            .iter()
            .map(|(p, _)| p.hop_count())
            .max()
            .unwrap_or(1)
            .max(1) as f64;

        let mut best: Option<(&Path, bool, f64)> = None;
        for (path, relocated) in candidates {
            let h_norm = path.hop_count() as f64 / max_hops;
            let p_max = ops.ledger.path_max_failure_probability(path);
            let f = self.alpha * h_norm + (1.0 - self.alpha) * p_max;
            match &best {
                None => best = Some((path, relocated, f)),
                Some((_, _, best_f)) if f < *best_f => best = Some((path, relocated, f)),
                _ => {}
            }
        }

        match best {
            Some((path, relocated, _)) => RestoreOutcome::Restored {
                path: path.clone(),
                relocated,
            },
            None => RestoreOutcome::NotRestored,
        }
    }
}
