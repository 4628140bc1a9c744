//! Command-line surface: exactly the options an operator needs to point a
//! run at a topology file, size its arrival/k-paths/DC knobs, pick a load
//! sweep, and fan the run out across seeds and threads.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug, Clone, Serialize)]
#[command(name = "anycast-cascade-sim")]
#[command(about = "Discrete-event simulator of a datacenter-interconnect network under disaster-induced cascading failures")]
#[command(version)]
pub struct Cli {
    /// Network topology descriptor (XML) to simulate over.
    #[arg(short = 'f', long)]
    pub topology_file: PathBuf,

    /// Number of service arrivals to process per (policy, load, seed) cell.
    #[arg(short = 'a', long, default_value_t = 10_000)]
    pub num_arrivals: u64,

    /// Number of shortest paths precomputed per (source, datacenter) pair.
    #[arg(short = 'k', long, default_value_t = 3)]
    pub k_paths: usize,

    /// Number of datacenters to place.
    #[arg(short = 'd', long, default_value_t = 5)]
    pub num_dcs: usize,

    /// Datacenter placement mode: `top-degree` or an explicit
    /// comma-separated node id list (`fixed:A,B,C`).
    #[arg(long, default_value = "top-degree")]
    pub dc_placement: String,

    /// OS thread count for the (routing x restoration x load x seed) cell
    /// fan-out.
    #[arg(short = 't', long, default_value_t = 1)]
    pub threads: usize,

    /// Minimum offered load, in Erlangs.
    #[arg(long, default_value_t = 600)]
    pub min_load: u32,

    /// Maximum offered load, in Erlangs (inclusive).
    #[arg(long, default_value_t = 840)]
    pub max_load: u32,

    /// Step between successive load points, in Erlangs.
    #[arg(long, default_value_t = 40)]
    pub load_step: u32,

    /// Base seed; episode `i` of a cell uses `seed + i`.
    #[arg(short = 's', long, default_value_t = 42)]
    pub seed: u64,

    /// Number of independent seeded episodes run per (policy, load) cell.
    #[arg(long = "num_seeds", default_value_t = 1)]
    pub num_seeds: u32,

    /// Directory progress snapshots and the final results blob are written
    /// under.
    #[arg(short = 'o', long, default_value = "results")]
    pub output_folder: PathBuf,

    /// Take a progress snapshot every this many processed arrivals.
    #[arg(long, default_value_t = 1_000)]
    pub track_stats_every: u64,

    /// Number of disaster zones to activate per episode.
    #[arg(short = 'z', long = "disaster_occurrences", default_value_t = 1)]
    pub disaster_occurrences: u32,

    /// Mean disaster/link-failure duration, in seconds.
    #[arg(long, default_value_t = 3600.0)]
    pub mean_failure_duration: f64,

    /// Mean inter-arrival time between standalone failures / disaster
    /// epicenters, in seconds.
    #[arg(long, default_value_t = 86_400.0)]
    pub mean_failure_inter_arrival_time: f64,

    /// Mean service holding time, in seconds.
    #[arg(long, default_value_t = 10_800.0)]
    pub mean_service_holding_time: f64,

    /// Units of network capacity each link carries.
    #[arg(long, default_value_t = 10)]
    pub resource_units_per_link: u32,

    /// Routing policies to run: any of CADC, FADC, FLB, RADC, RiskBalanced.
    #[arg(long, value_delimiter = ',', default_value = "CADC")]
    pub routing_policies: Vec<String>,

    /// Restoration policies to run: any of DNR, PR, PRwR, PRPA.
    #[arg(long, value_delimiter = ',', default_value = "PRwR")]
    pub restoration_policies: Vec<String>,
}
