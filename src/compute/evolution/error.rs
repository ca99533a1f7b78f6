//! Error type shared by the evolution engine.

use std::fmt;

use crate::compute::OracleError;
use crate::schema::ConfigError;

use super::checkpoint::CheckpointError;

/// Rejection-sampling loop that ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    /// Drawing a valid random genotype.
    Randomize,
    /// Perturbing a genotype while keeping it valid.
    Mutate,
    /// Synthesizing a valid, unique child.
    Offspring,
}

impl fmt::Display for RepairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepairStage::Randomize => "randomize",
            RepairStage::Mutate => "mutate",
            RepairStage::Offspring => "offspring",
        })
    }
}

/// Errors raised while running the optimizer.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Infeasible region: {stage} found no valid genotype in {attempts} attempts")]
    InfeasibleRegion { stage: RepairStage, attempts: usize },
    #[error("Population is empty")]
    EmptyPopulation,
    #[error("Individual {index} out of range for population of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Every individual has a NaN fitness")]
    NanFitness,
    #[error("Evaluation cancelled")]
    Cancelled,
    #[error("Oracle failed: {0}")]
    Oracle(#[from] OracleError),
    #[error("Checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("Configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not start evaluation pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
