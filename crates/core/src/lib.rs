//! Core types and errors for the funnel analytics pipeline.

pub mod error;
pub mod events;
pub mod reports;
pub mod session;
pub mod steps;

pub use error::{Error, ErrorCode, Result};
pub use events::*;
pub use reports::*;
pub use session::*;
pub use steps::*;
