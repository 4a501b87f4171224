//! Parquet source download for the funnel pipeline.

pub mod config;
pub mod source;

pub use config::*;
pub use source::*;
