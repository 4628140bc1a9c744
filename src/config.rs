//! Validated, fully-resolved engine configuration. `Cli` is the raw operator
//! surface; `EngineConfig` is what `Environment` actually runs with, one
//! instance per (policy, load) cell — `EngineConfig::validate` is where a
//! `SimError::Configuration` is raised.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{Result, SimError};

#[derive(Debug, Clone)]
pub enum DcPlacement {
    /// Top `n` nodes by degree.
    TopDegree(usize),
    /// A fixed, explicit list of node ids.
    Fixed(Vec<String>),
}

impl DcPlacement {
    pub fn parse(raw: &str, num_dcs: usize) -> Result<Self> {
        if let Some(rest) = raw.strip_prefix("fixed:") {
            let names: Vec<String> = rest.split(',').map(|s| s.trim().to_string()).collect();
            if names.is_empty() || names.iter().any(|n| n.is_empty()) {
                return Err(SimError::Configuration(format!(
                    "invalid fixed DC placement list: {raw}"
                )));
            }
            return Ok(DcPlacement::Fixed(names));
        }
        if raw == "top-degree" {
            return Ok(DcPlacement::TopDegree(num_dcs));
        }
        Err(SimError::Configuration(format!(
            "unknown dc_placement mode: {raw} (expected \"top-degree\" or \"fixed:A,B,C\")"
        )))
    }
}

/// The fully-resolved, validated configuration for one simulation run
/// (shared across every (policy, load, seed) cell; only `load` and the
/// policy selection vary per cell — see `EngineConfig::for_load`).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub topology_file: PathBuf,
    pub num_arrivals: u64,
    pub k_paths: usize,
    pub dc_placement: DcPlacement,
    pub threads: usize,
    pub loads: Vec<u32>,
    pub base_seed: u64,
    pub num_seeds: u32,
    pub output_folder: PathBuf,
    pub track_stats_every: u64,
    pub disaster_occurrences: u32,
    pub mean_failure_duration: f64,
    pub mean_failure_inter_arrival_time: f64,
    pub mean_service_holding_time: f64,
    pub resource_units_per_link: u32,
    pub routing_policies: Vec<String>,
    pub restoration_policies: Vec<String>,
}

impl EngineConfig {
    pub fn validate(cli: &Cli) -> Result<Self> {
        if cli.k_paths == 0 {
            return Err(SimError::Configuration("k_paths must be >= 1".into()));
        }
        if cli.num_dcs == 0 {
            return Err(SimError::Configuration("num_dcs must be >= 1".into()));
        }
        if cli.load_step == 0 {
            return Err(SimError::Configuration("load_step must be >= 1".into()));
        }
        if cli.min_load > cli.max_load {
            return Err(SimError::Configuration(
                "min_load must be <= max_load".into(),
            ));
        }
        if cli.num_seeds == 0 {
            return Err(SimError::Configuration("num_seeds must be >= 1".into()));
        }
        if !(cli.mean_service_holding_time > 0.0) {
            return Err(SimError::Configuration(
                "mean_service_holding_time must be > 0".into(),
            ));
        }
        if !(cli.mean_failure_inter_arrival_time > 0.0) {
            return Err(SimError::Configuration(
                "mean_failure_inter_arrival_time must be > 0".into(),
            ));
        }
        if !(cli.mean_failure_duration > 0.0) {
            return Err(SimError::Configuration(
                "mean_failure_duration must be > 0".into(),
            ));
        }
        if cli.routing_policies.is_empty() {
            return Err(SimError::Configuration(
                "at least one routing policy must be selected".into(),
            ));
        }
        if cli.restoration_policies.is_empty() {
            return Err(SimError::Configuration(
                "at least one restoration policy must be selected".into(),
            ));
        }
        for name in &cli.routing_policies {
            crate::routing::by_name(name, cli.k_paths)?;
        }
        for name in &cli.restoration_policies {
            crate::restoration::by_name(name)?;
        }

        let dc_placement = DcPlacement::parse(&cli.dc_placement, cli.num_dcs)?;

        let loads: Vec<u32> = (cli.min_load..=cli.max_load)
            .step_by(cli.load_step as usize)
            .collect();

        Ok(Self {
            topology_file: cli.topology_file.clone(),
            num_arrivals: cli.num_arrivals,
            k_paths: cli.k_paths,
            dc_placement,
            threads: cli.threads.max(1),
            loads,
            base_seed: cli.seed,
            num_seeds: cli.num_seeds,
            output_folder: cli.output_folder.clone(),
            track_stats_every: cli.track_stats_every.max(1),
            disaster_occurrences: cli.disaster_occurrences,
            mean_failure_duration: cli.mean_failure_duration,
            mean_failure_inter_arrival_time: cli.mean_failure_inter_arrival_time,
            mean_service_holding_time: cli.mean_service_holding_time,
            resource_units_per_link: cli.resource_units_per_link,
            routing_policies: cli.routing_policies.clone(),
            restoration_policies: cli.restoration_policies.clone(),
        })
    }

    /// `mean_service_inter_arrival_time = mean_service_holding_time / load`;
    /// `load` is an Erlang value so this is only meaningful for `load > 0`.
    /// A `load` of 0 yields an infinite inter-arrival time, i.e. no
    /// arrivals are ever processed.
    pub fn mean_service_inter_arrival_time(&self, load: u32) -> f64 {
        if load == 0 {
            f64::INFINITY
        } else {
            self.mean_service_holding_time / load as f64
        }
    }

    pub fn seed_for(&self, seed_index: u32) -> u64 {
        self.base_seed + seed_index as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            topology_file: PathBuf::from("topo.xml"),
            num_arrivals: 1000,
            k_paths: 3,
            num_dcs: 2,
            dc_placement: "top-degree".into(),
            threads: 1,
            min_load: 100,
            max_load: 200,
            load_step: 50,
            seed: 1,
            num_seeds: 2,
            output_folder: PathBuf::from("out"),
            track_stats_every: 100,
            disaster_occurrences: 1,
            mean_failure_duration: 10.0,
            mean_failure_inter_arrival_time: 20.0,
            mean_service_holding_time: 30.0,
            resource_units_per_link: 10,
            routing_policies: vec!["CADC".into()],
            restoration_policies: vec!["PR".into()],
        }
    }

    #[test]
    fn rejects_unknown_routing_policy() {
        let mut cli = base_cli();
        cli.routing_policies = vec!["NOPE".into()];
        let err = EngineConfig::validate(&cli).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_k_paths() {
        let mut cli = base_cli();
        cli.k_paths = 0;
        let err = EngineConfig::validate(&cli).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn builds_expected_load_sweep() {
        let cfg = EngineConfig::validate(&base_cli()).unwrap();
        assert_eq!(cfg.loads, vec![100, 150, 200]);
    }

    #[test]
    fn seed_derivation_is_explicit_per_seed_index() {
        let cfg = EngineConfig::validate(&base_cli()).unwrap();
        assert_eq!(cfg.seed_for(0), 1);
        assert_eq!(cfg.seed_for(1), 2);
    }
}
