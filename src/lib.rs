//! luxopt - Genetic optimization of daylighting designs.
//!
//! A design is an eleven-locus genotype describing a room and its glazing.
//! Each candidate is rendered by an external ray tracer at a sensor grid, and
//! the population evolves toward uniform, bright illumination over a schedule
//! of increasing ray-tracing precision. Every evaluated generation is written
//! to a checkpoint log so an interrupted run continues where it stopped.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Genotype, configuration and run-parameter types
//! - `compute`: Fitness oracle, evaluation pool and the evolutionary engine

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionError, JsonlStore, Optimizer, Population};
pub use compute::{FitnessOracle, RadianceOracle};
pub use schema::{EngineConfig, Genotype, RunParams, RunRequest};
