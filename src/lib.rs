//! Discrete-event simulator of a datacenter-interconnect network subject to
//! disaster-induced cascading failures.
//!
//! The crate is organized around the nine components the design splits the
//! engine into: a static topology and precomputed path index (`topology`),
//! a per-episode capacity ledger (`ledger`), a min-heap event queue
//! (`event`), service/failure entities (`service`, `failure`), pluggable
//! routing and restoration strategies (`routing`, `restoration`), the
//! disaster scheduler (`disaster`), the main event loop (`engine`), and
//! statistics aggregation (`stats`). `cli`/`config` resolve the operator
//! surface into a validated run configuration; `output` writes the
//! per-run result directory.

pub mod cli;
pub mod config;
pub mod disaster;
pub mod engine;
pub mod error;
pub mod event;
pub mod failure;
pub mod ledger;
pub mod output;
pub mod restoration;
pub mod rng;
pub mod routing;
pub mod service;
pub mod stats;
pub mod topology;

pub use error::{Result, SimError};
