//! Crate-wide error type.
//!
//! One variant per failure family, matching the error kinds a caller of this
//! crate needs to distinguish: configuration mistakes caught before a run
//! starts, invariant violations discovered mid-run, and the two external
//! formats (topology XML, filesystem) whose errors are wrapped unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Bad CLI/config input: unknown policy name, invalid DC placement mode,
    /// `k_paths == 0`, malformed topology file structure.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A bookkeeping invariant was violated: double-free of link capacity,
    /// negative `available_units`, a scheduled departure missing from the
    /// event queue on cancellation, a path no longer viable after it was
    /// supposedly reserved. These abort the episode that raised them; they
    /// must never be papered over with a silent clamp.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("topology descriptor error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Results blob serialization failure.
    #[error("results serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
