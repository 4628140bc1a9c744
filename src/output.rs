//! Per-run output directory: a metadata file, a copy of the topology input,
//! and a `serde_json`-serialized results blob. Plotting and pickled
//! checkpoints are an external collaborator's job — this module only
//! produces the data they would consume.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::Cli;
use crate::config::EngineConfig;
use crate::engine::SeedRecord;
use crate::error::Result;

/// Timestamps and the CLI invocation that produced a run, echoed verbatim
/// into the results blob.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wall_clock_seconds: f64,
    pub cli_args: Cli,
}

impl RunMetadata {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, cli_args: Cli) -> Self {
        Self {
            wall_clock_seconds: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
            started_at,
            finished_at,
            cli_args,
        }
    }
}

/// `routing -> restoration -> load -> per-seed records`. Built by appending
/// one `SeedRecord` per completed (routing, restoration, load, seed) cell.
pub type ResultsMap = HashMap<String, HashMap<String, HashMap<u32, Vec<SeedRecord>>>>;

/// The full serialized run: arguments echo, nested results, and the policy
/// / load lists an external plotting collaborator would iterate over.
#[derive(Debug, Serialize)]
pub struct ResultsBlob {
    pub metadata: RunMetadata,
    pub routing_policies: Vec<String>,
    pub restoration_policies: Vec<String>,
    pub loads: Vec<u32>,
    pub results: ResultsMap,
}

/// Inserts one seed's record into the nested map, creating intermediate
/// levels on first touch. Mirrors a `dict.setdefault` chain; callers
/// synchronize concurrent access externally (see `main.rs`'s `DashMap`
/// staging structure — this function itself assumes single-threaded use).
pub fn insert_record(
    results: &mut ResultsMap,
    routing: &str,
    restoration: &str,
    load: u32,
    record: SeedRecord,
) {
    results
        .entry(routing.to_string())
        .or_default()
        .entry(restoration.to_string())
        .or_default()
        .entry(load)
        .or_default()
        .push(record);
}

/// Writes the full per-run output directory: creates `output_folder`, copies
/// the topology descriptor alongside the results, and serializes
/// `results.json`. Returns a `SimError::Io` if the directory cannot be
/// created or the topology file cannot be copied, and a `SimError::Json` if
/// serialization fails.
pub fn write_run(
    output_folder: &Path,
    config: &EngineConfig,
    metadata: RunMetadata,
    results: ResultsMap,
) -> Result<()> {
    fs::create_dir_all(output_folder)?;

    let topology_dest = output_folder.join(
        config
            .topology_file
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("topology.xml")),
    );
    fs::copy(&config.topology_file, &topology_dest)?;

    let blob = ResultsBlob {
        metadata,
        routing_policies: config.routing_policies.clone(),
        restoration_policies: config.restoration_policies.clone(),
        loads: config.loads.clone(),
        results,
    };

    let results_path = output_folder.join("results.json");
    let file = fs::File::create(&results_path)?;
    serde_json::to_writer_pretty(file, &blob)?;
    Ok(())
}
