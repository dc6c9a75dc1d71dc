//! Schema module - Configuration and report types for coverage searches.

mod config;
mod report;

pub use config::*;
pub use report::*;
