//! Genetic optimization of daylighting designs.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Random generation, crossover, and mutation
//! - **Fitness** (`fitness`): Radiance-uniformity score and the evaluation cache
//! - **Population** (`population`): Selection, offspring and diversity
//! - **Checkpoints** (`checkpoint`): Append-only run log for resuming
//! - **Driver** (`search`): Runs the precision schedule generation by generation
//!
//! # Example
//!
//! ```rust,no_run
//! use luxopt::compute::RadianceOracle;
//! use luxopt::compute::evolution::{JsonlStore, Optimizer};
//! use luxopt::schema::{EngineConfig, RunRequest};
//!
//! let config = EngineConfig::default();
//! let oracle = RadianceOracle::new(config.oracle.clone());
//! let store = JsonlStore::open("optim.jsonl")?;
//!
//! let mut optimizer = Optimizer::new(config, store)?;
//! optimizer.prepare_params(Some(&RunRequest {
//!     popsize: 100,
//!     keepfrac: 0.2,
//!     stages: vec![(20, 1), (10, 3)],
//! }))?;
//!
//! let result = optimizer.run_with_callback(&oracle, |progress| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         progress.generation, progress.best_fitness);
//! })?;
//! println!("Best fitness: {:.3}", result.stats.best_fitness);
//! # Ok::<(), luxopt::compute::evolution::EvolutionError>(())
//! ```

mod checkpoint;
mod error;
mod fitness;
mod genome;
mod population;
mod search;

pub use checkpoint::{CheckpointError, CheckpointStore, JsonlStore, MemoryStore, SCHEMA_VERSION};
pub use error::{EvolutionError, RepairStage};
pub use fitness::{
    CachedEvaluation, Evaluation, EvaluationCache, FITNESS_VERSION, INHOMOGENEITY_TARGET,
    PENALTY_EXPONENT, RadianceSummary, STABILITY_OFFSET, evaluate, fitness, scale_fitness,
};
pub use genome::GenotypeRng;
pub use population::{
    DiversityReport, GenerationSummary, Individual, LocusDiversity, Population,
    PopulationSnapshot, survivor_count,
};
pub use search::{OptimizationResult, Optimizer};
