//! Optimization driver: runs the schedule, checkpoints every generation and
//! resumes from the last stored one.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::compute::{DispatchStats, EvaluationDispatcher, FitnessOracle};
use crate::schema::{
    EngineConfig, GenerationProgress, OptimizationHistory, OptimizationStats, RunParams,
    RunRequest, ScheduleEntry, StopReason,
};

use super::checkpoint::{CheckpointError, CheckpointStore};
use super::error::EvolutionError;
use super::genome::GenotypeRng;
use super::population::Population;

/// Outcome of [`Optimizer::run_with_callback`].
#[derive(Debug)]
pub struct OptimizationResult {
    /// Population after the last step (advanced past the last stored generation).
    pub population: Population,
    /// Parameters the run used.
    pub params: RunParams,
    pub history: OptimizationHistory,
    pub stats: OptimizationStats,
    pub stop_reason: StopReason,
}

/// Genetic optimizer over a checkpoint store.
pub struct Optimizer<S: CheckpointStore> {
    config: EngineConfig,
    store: S,
    dispatcher: EvaluationDispatcher,
    rng: GenotypeRng,
}

impl<S: CheckpointStore> Optimizer<S> {
    /// Create an optimizer; fails on invalid configuration.
    pub fn new(config: EngineConfig, store: S) -> Result<Self, EvolutionError> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        log::debug!("Random seed {}", seed);

        let rng = GenotypeRng::new(seed, config.operators);
        let dispatcher = EvaluationDispatcher::new(config.workers)?;

        Ok(Self {
            config,
            store,
            dispatcher,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.dispatcher.cancel_handle()
    }

    /// Resolve the run parameters and persist them.
    ///
    /// Without a request the store must already hold parameters. With one,
    /// its stages are appended to the stored schedule (or start a new one).
    pub fn prepare_params(
        &mut self,
        request: Option<&RunRequest>,
    ) -> Result<RunParams, EvolutionError> {
        let stored = self.store.load_params()?;
        let params = match request {
            Some(request) => request.apply_to(stored),
            None => stored.ok_or(CheckpointError::MissingParams)?,
        };
        params.validate()?;

        if request.is_some() {
            self.store.save_params(&params)?;
        }
        Ok(params)
    }

    /// Population to evaluate first and its generation index.
    ///
    /// A stored generation `g` was evaluated before it was written, so it is
    /// advanced with its own schedule entry (served from the stored
    /// evaluations) and the run continues at `g + 1`.
    fn starting_population(
        &mut self,
        params: &RunParams,
        oracle: &dyn FitnessOracle,
    ) -> Result<(Population, usize), EvolutionError> {
        let Some(last) = self.store.last_generation() else {
            log::info!("Starting new optimization");
            let population = Population::random(params.popsize, &mut self.rng, &self.config.limits)?;
            log::info!("Generated population of size {}", population.len());
            return Ok((population, 0));
        };

        let mut population = Population::from_snapshot(self.store.load_generation(last)?);
        if let Some(entry) = params.schedule.get(last) {
            population.do_generation(
                entry.keep_best_frac,
                entry.precision,
                oracle,
                &mut self.rng,
                &self.config.limits,
            )?;
        }
        log::info!(
            "Continuing saved optimization from generation {}",
            last + 1
        );
        Ok((population, last + 1))
    }

    fn progress(
        generation: usize,
        total_generations: usize,
        entry: ScheduleEntry,
        population: &Population,
        raw_fitness: &[f64],
        dispatched: DispatchStats,
    ) -> Result<GenerationProgress, EvolutionError> {
        let (best_idx, best_fitness) = raw_fitness
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, f)| !f.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (idx, f)| match best {
                Some((_, b)) if b >= f => best,
                _ => Some((idx, f)),
            })
            .ok_or(EvolutionError::NanFitness)?;

        let best_genotype = population.individuals()[best_idx].genotype.clone();
        let best_metrics = best_genotype.design_metrics();

        Ok(GenerationProgress {
            generation,
            total_generations,
            precision: entry.precision,
            keep_best_frac: entry.keep_best_frac,
            best_fitness,
            avg_fitness: raw_fitness.iter().sum::<f64>() / raw_fitness.len() as f64,
            diversity: population
                .calc_diversity()
                .map(|report| report.cv_sum())
                .unwrap_or(0.0),
            best_genotype,
            best_metrics,
            evaluations: dispatched.evaluated,
        })
    }

    /// Run the stored schedule with progress callback.
    pub fn run_with_callback<F>(
        &mut self,
        oracle: &dyn FitnessOracle,
        mut callback: F,
    ) -> Result<OptimizationResult, EvolutionError>
    where
        F: FnMut(&GenerationProgress),
    {
        let start_time = Instant::now();
        let params = self
            .store
            .load_params()?
            .ok_or(CheckpointError::MissingParams)?;
        params.validate()?;

        let (mut population, start_generation) = self.starting_population(&params, oracle)?;
        let total_generations = params.generations();

        let mut history = OptimizationHistory::default();
        let mut total_evaluations = 0u64;
        let mut best_fitness = f64::NEG_INFINITY;
        let mut stop_reason = StopReason::ScheduleComplete;

        for generation in start_generation..total_generations {
            if self.dispatcher.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }
            let entry = params.schedule[generation];

            let dispatched =
                match self
                    .dispatcher
                    .dispatch(&mut population, entry.precision, oracle)
                {
                    Ok(stats) => stats,
                    Err(EvolutionError::Cancelled) => {
                        stop_reason = StopReason::Cancelled;
                        break;
                    }
                    Err(e) => return Err(e),
                };
            total_evaluations += dispatched.evaluated as u64;

            let raw = population.raw_fitness(entry.precision, oracle)?;
            let progress = Self::progress(
                generation,
                total_generations,
                entry,
                &population,
                &raw,
                dispatched,
            )?;

            self.store
                .append_generation(generation, &population.snapshot())?;

            log::info!(
                "Generation {}: f_best {:.2e}, f_av {:.2e}, Sigma_cv {:.2e}",
                generation,
                progress.best_fitness,
                progress.avg_fitness,
                progress.diversity
            );
            best_fitness = best_fitness.max(progress.best_fitness);
            history.record(&progress);
            callback(&progress);

            population.do_generation(
                entry.keep_best_frac,
                entry.precision,
                oracle,
                &mut self.rng,
                &self.config.limits,
            )?;
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        let stats = OptimizationStats {
            start_generation,
            generations_run: history.generations.len(),
            total_evaluations,
            best_fitness,
            elapsed_seconds: elapsed,
            evaluations_per_second: if elapsed > 0.0 {
                total_evaluations as f64 / elapsed
            } else {
                0.0
            },
        };

        Ok(OptimizationResult {
            population,
            params,
            history,
            stats,
            stop_reason,
        })
    }

    /// Run the stored schedule (blocking).
    pub fn run(&mut self, oracle: &dyn FitnessOracle) -> Result<OptimizationResult, EvolutionError> {
        self.run_with_callback(oracle, |_| {})
    }
}
