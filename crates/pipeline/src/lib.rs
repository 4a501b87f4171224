//! Pipeline runs: fetch → load → flatten → aggregate → analyze.
//!
//! Every run rebuilds all relations from a fresh download. Runs are
//! serialized; each opens and releases its own DuckDB connection.

pub mod runner;
pub mod stages;

pub use runner::*;
pub use stages::{Analysis, RebuildSummary};
