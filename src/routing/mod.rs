//! Pluggable routing (admission) policies.
//!
//! Modeled on the trait-object load-balancing policy pattern: a small
//! `Debug + Send + Sync` trait, one struct per strategy, each holding only
//! its own configuration — never a reference back into the engine. All
//! engine state a policy needs (the path index, the ledger, the RNG) is
//! passed in through `RouteContext` at call time.

mod closest;
mod farthest;
mod load_balanced;
mod random;
mod risk_balanced;

pub use closest::ClosestAvailableDc;
pub use farthest::FarthestAvailableDc;
pub use load_balanced::FullLoadBalancing;
pub use random::RandomAvailableDc;
pub use risk_balanced::RiskBalanced;

use std::fmt::Debug;

use crate::error::SimError;
use crate::ledger::Ledger;
use crate::rng::EpisodeRng;
use crate::topology::{NodeId, Path, PathIndex};

pub struct RouteContext<'a> {
    pub source: &'a NodeId,
    pub network_units: u32,
    pub computing_units: u32,
    pub datacenters: &'a [NodeId],
    pub path_index: &'a PathIndex,
    pub ledger: &'a Ledger,
    pub rng: &'a mut EpisodeRng,
}

#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub path: Path,
}

pub trait RoutingPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when no datacenter has a path with enough spare
    /// capacity for `ctx.units` — an ordinary blocked-request outcome, not
    /// an error.
    fn route(&self, ctx: RouteContext<'_>) -> Option<RouteDecision>;
}

/// Every precomputed path from `source` to any datacenter that currently has
/// at least `units` spare capacity on its bottleneck link, in the stable
/// order the path index returns them (grouped by datacenter, ascending hop
/// count within each datacenter).
fn viable_paths<'a>(ctx: &RouteContext<'a>) -> Vec<&'a Path> {
    ctx.datacenters
        .iter()
        .flat_map(|dc| ctx.path_index.paths(ctx.source, dc))
        .filter(|path| ctx.ledger.path_viable(path, ctx.network_units, ctx.computing_units))
        .collect()
}

pub fn by_name(name: &str, k_paths: usize) -> Result<Box<dyn RoutingPolicy>, SimError> {
    let _ = k_paths;
    match name {
        "CADC" => Ok(Box::new(ClosestAvailableDc)),
        "FADC" => Ok(Box::new(FarthestAvailableDc)),
        "FLB" => Ok(Box::new(FullLoadBalancing)),
        "RADC" => Ok(Box::new(RandomAvailableDc)),
        "RiskBalanced" => Ok(Box::new(RiskBalanced::default())),
        other => Err(SimError::Configuration(format!(
            "unknown routing policy {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_name_is_a_configuration_error() {
        let err = by_name("not-a-policy", 3).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }
}
