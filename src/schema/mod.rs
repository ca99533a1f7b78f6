//! Schema module - Genotype, configuration and run-parameter types.

mod config;
mod genotype;
mod optimization;

pub use config::*;
pub use genotype::*;
pub use optimization::*;
