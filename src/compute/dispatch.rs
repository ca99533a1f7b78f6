//! Parallel phenotype evaluation on a bounded worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::compute::FitnessOracle;
use crate::compute::evolution::{EvolutionError, Population};
use crate::schema::ConfigError;

/// Counts from one [`EvaluationDispatcher::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Oracle calls made.
    pub evaluated: usize,
    /// Individuals that already had a phenotype.
    pub cached: usize,
}

/// Evaluates stale individuals on a dedicated rayon pool.
///
/// Workers only call the oracle; results are merged into the population on
/// the calling thread, in input order.
pub struct EvaluationDispatcher {
    pool: ThreadPool,
    cancelled: Arc<AtomicBool>,
}

impl EvaluationDispatcher {
    pub fn new(workers: usize) -> Result<Self, EvolutionError> {
        Self::with_cancel(workers, Arc::new(AtomicBool::new(false)))
    }

    /// Share an existing cancellation token.
    pub fn with_cancel(workers: usize, cancelled: Arc<AtomicBool>) -> Result<Self, EvolutionError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers.into());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("luxopt-eval-{}", i))
            .build()?;

        Ok(Self { pool, cancelled })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Compute every missing phenotype at `precision`.
    ///
    /// Tasks not yet started are skipped once cancellation is requested or a
    /// sibling task fails; calls already running finish normally. Every
    /// successful phenotype is kept, then the first error (in population
    /// order) is returned. After cancellation, oracle failures are reported
    /// as [`EvolutionError::Cancelled`]: an interrupt also reaches the
    /// external tools.
    pub fn dispatch(
        &self,
        population: &mut Population,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<DispatchStats, EvolutionError> {
        let start = Instant::now();
        let cached = population.len() - population.stale_count(precision);
        let pending = population.stale_genotypes(precision);

        let cancelled = &self.cancelled;
        let failed = AtomicBool::new(false);
        let results: Vec<Result<Vec<f64>, EvolutionError>> = self.pool.install(|| {
            pending
                .par_iter()
                .map(|genotype| {
                    if cancelled.load(Ordering::Relaxed) || failed.load(Ordering::Relaxed) {
                        return Err(EvolutionError::Cancelled);
                    }
                    oracle.evaluate(genotype, precision).map_err(|e| {
                        failed.store(true, Ordering::Relaxed);
                        EvolutionError::from(e)
                    })
                })
                .collect()
        });

        let mut evaluated = 0;
        let mut first_error = None;
        for (genotype, result) in pending.iter().zip(results) {
            match result {
                Ok(phenotype) => {
                    population.record_phenotype(genotype, precision, phenotype);
                    evaluated += 1;
                }
                // A real failure outranks the skips it caused.
                Err(e) => {
                    let replace = match &first_error {
                        None => true,
                        Some(EvolutionError::Cancelled) => !matches!(e, EvolutionError::Cancelled),
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }

        log::debug!(
            "Dispatched {} evaluations at precision {} ({} cached) in {:.2}s",
            evaluated,
            precision,
            cached,
            start.elapsed().as_secs_f64()
        );

        match first_error {
            Some(EvolutionError::Oracle(e)) if self.is_cancelled() => {
                log::debug!("Oracle failure after cancellation: {}", e);
                Err(EvolutionError::Cancelled)
            }
            Some(e) => Err(e),
            None => Ok(DispatchStats { evaluated, cached }),
        }
    }
}
