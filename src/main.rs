//! Binary entry point: parses the CLI surface, validates it into an
//! `EngineConfig`, loads the topology once, and fans out across every
//! (routing policy, restoration policy, load, seed) cell using a `rayon`
//! thread pool sized from `--threads`. Each cell owns its own `Environment`,
//! RNG, and disaster-zone schedule; the only shared mutable object is the
//! append-only results map, staged in a `DashMap` for atomic per-cell
//! inserts and flattened into the final nested map before serialization.

use std::fs;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use anycast_cascade_sim::cli::Cli;
use anycast_cascade_sim::config::EngineConfig;
use anycast_cascade_sim::disaster::{self, DisasterZone};
use anycast_cascade_sim::engine::{Environment, SeedRecord};
use anycast_cascade_sim::error::{Result, SimError};
use anycast_cascade_sim::output::{self, ResultsMap, RunMetadata};
use anycast_cascade_sim::restoration::RestorationPolicy;
use anycast_cascade_sim::routing::RoutingPolicy;
use anycast_cascade_sim::topology::Topology;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// One (routing, restoration, load, seed) cell awaiting execution.
struct Cell<'a> {
    routing_name: &'a str,
    restoration_name: &'a str,
    load: u32,
    seed: u64,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::validate(&cli)?;
    let started_at = Utc::now();

    let xml = fs::read_to_string(&config.topology_file)?;
    let mut topology = Topology::from_xml_str(&xml)?;
    topology.apply_dc_placement(&config.dc_placement)?;
    let path_index = topology.build_path_index(config.k_paths);
    let zones = disaster::load_zones(&xml, &topology)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .expect("global thread pool is configured exactly once");

    let cells: Vec<Cell> = config
        .routing_policies
        .iter()
        .flat_map(|routing_name| {
            config.restoration_policies.iter().flat_map(move |restoration_name| {
                config.loads.iter().flat_map(move |&load| {
                    (0..config.num_seeds).map(move |seed_index| Cell {
                        routing_name,
                        restoration_name,
                        load,
                        seed: config.seed_for(seed_index),
                    })
                })
            })
        })
        .collect();

    tracing::info!(cells = cells.len(), "starting run");

    // Append-only staging map: each cell's insert must be atomic since
    // cells run concurrently. Flattened into `ResultsMap` once every cell
    // is done.
    let staged: DashMap<(String, String, u32), Vec<SeedRecord>> = DashMap::new();

    let outcome: Result<()> = cells
        .par_iter()
        .try_for_each(|cell| -> Result<()> {
            let routing_policy: Box<dyn RoutingPolicy> =
                anycast_cascade_sim::routing::by_name(cell.routing_name, config.k_paths)?;
            let restoration_policy: Box<dyn RestorationPolicy> =
                anycast_cascade_sim::restoration::by_name(cell.restoration_name)?;
            let zones_for_cell: Vec<DisasterZone> = zones.clone();

            let env = Environment::new(
                &topology,
                &path_index,
                &config,
                cell.load,
                cell.seed,
                routing_policy.as_ref(),
                restoration_policy.as_ref(),
                zones_for_cell,
            );

            // An invariant violation aborts only this cell's episode; it must
            // never take down sibling cells running concurrently under
            // rayon (spec §7, SPEC_FULL A.1). Every other error kind
            // (configuration, I/O, XML) indicates the whole run is
            // unsound and is propagated out of the fan-out as before.
            match env.run() {
                Ok(record) => {
                    staged
                        .entry((
                            cell.routing_name.to_string(),
                            cell.restoration_name.to_string(),
                            cell.load,
                        ))
                        .or_default()
                        .push(record);
                }
                Err(SimError::Invariant(msg)) => {
                    tracing::error!(
                        target: "invariant",
                        routing = cell.routing_name,
                        restoration = cell.restoration_name,
                        load = cell.load,
                        seed = cell.seed,
                        "{msg}"
                    );
                }
                Err(other) => return Err(other),
            }
            Ok(())
        });
    outcome?;

    let mut results: ResultsMap = ResultsMap::new();
    for entry in staged.into_iter() {
        let ((routing, restoration, load), records) = entry;
        for record in records {
            output::insert_record(&mut results, &routing, &restoration, load, record);
        }
    }

    let finished_at = Utc::now();
    let metadata = RunMetadata::new(started_at, finished_at, cli);
    output::write_run(&config.output_folder, &config, metadata, results)?;

    tracing::info!(output = %config.output_folder.display(), "run complete");
    Ok(())
}
