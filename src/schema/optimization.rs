//! Run parameters and progress reporting types for an optimization run.

use serde::{Deserialize, Serialize};

use super::{ConfigError, DesignMetrics, Genotype};

/// One generation's settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Oracle fidelity (ambient bounces) used to evaluate this generation.
    pub precision: u32,
    /// Fraction of top individuals carried into the next generation.
    pub keep_best_frac: f64,
}

/// Persisted parameters of a run.
///
/// Stored under the `params` record of the checkpoint log and reused on
/// resume; command-line arguments may only append to the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Population size `n`.
    pub popsize: usize,
    /// Survivor fraction applied to appended schedule entries.
    pub keepfrac: f64,
    /// One entry per generation.
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

impl RunParams {
    /// Create parameters with an empty schedule.
    pub fn new(popsize: usize, keepfrac: f64) -> Self {
        Self {
            popsize,
            keepfrac,
            schedule: Vec::new(),
        }
    }

    /// Append `count` generations evaluated at `precision`.
    pub fn extend_schedule(&mut self, count: usize, precision: u32) {
        let entry = ScheduleEntry {
            precision,
            keep_best_frac: self.keepfrac,
        };
        self.schedule.extend(std::iter::repeat_n(entry, count));
    }

    /// Builder form of [`extend_schedule`](Self::extend_schedule).
    pub fn with_stage(mut self, count: usize, precision: u32) -> Self {
        self.extend_schedule(count, precision);
        self
    }

    /// Total number of generations in the schedule.
    #[inline]
    pub fn generations(&self) -> usize {
        self.schedule.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.popsize < 2 {
            return Err(ConfigError::InvalidRunParams(format!(
                "population size must be at least 2, got {}",
                self.popsize
            )));
        }
        let check_frac = |frac: f64| {
            if (0.0..=1.0).contains(&frac) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRunParams(format!(
                    "keep fraction must lie in [0, 1], got {}",
                    frac
                )))
            }
        };
        check_frac(self.keepfrac)?;
        for entry in &self.schedule {
            check_frac(entry.keep_best_frac)?;
        }
        Ok(())
    }
}

/// Run parameters requested on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub popsize: usize,
    pub keepfrac: f64,
    /// `(generations, precision)` stages to append to the schedule.
    pub stages: Vec<(usize, u32)>,
}

impl RunRequest {
    /// Merge into previously stored parameters.
    ///
    /// Stored population size and keep fraction take precedence; the
    /// requested stages are always appended.
    pub fn apply_to(&self, stored: Option<RunParams>) -> RunParams {
        let mut params = match stored {
            Some(params) => {
                if params.popsize != self.popsize || params.keepfrac != self.keepfrac {
                    log::warn!(
                        "Keeping stored popsize {} and keepfrac {} (requested {} and {})",
                        params.popsize,
                        params.keepfrac,
                        self.popsize,
                        self.keepfrac
                    );
                }
                params
            }
            None => RunParams::new(self.popsize, self.keepfrac),
        };
        for &(count, precision) in &self.stages {
            params.extend_schedule(count, precision);
        }
        params
    }
}

/// Progress report emitted once per evaluated generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationProgress {
    /// Generation index.
    pub generation: usize,
    /// Length of the schedule.
    pub total_generations: usize,
    /// Precision used for this generation.
    pub precision: u32,
    /// Survivor fraction used to advance this generation.
    pub keep_best_frac: f64,
    /// Highest raw fitness in the population.
    pub best_fitness: f64,
    /// Mean raw fitness.
    pub avg_fitness: f64,
    /// Sum of per-locus coefficients of variation.
    pub diversity: f64,
    /// Genotype of the fittest individual.
    pub best_genotype: Genotype,
    /// Geometry of the fittest individual.
    pub best_metrics: DesignMetrics,
    /// Oracle calls made for this generation.
    pub evaluations: usize,
}

/// Per-generation series for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptimizationHistory {
    /// Generation indices covered by this run.
    pub generations: Vec<usize>,
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Diversity (cv sum) per generation.
    pub diversity: Vec<f64>,
}

impl OptimizationHistory {
    pub fn record(&mut self, progress: &GenerationProgress) {
        self.generations.push(progress.generation);
        self.best_fitness.push(progress.best_fitness);
        self.avg_fitness.push(progress.avg_fitness);
        self.diversity.push(progress.diversity);
    }
}

/// Statistics from an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationStats {
    /// First generation evaluated by this process.
    pub start_generation: usize,
    /// Generations evaluated by this process.
    pub generations_run: usize,
    /// Oracle calls made by this process.
    pub total_evaluations: u64,
    /// Best fitness seen in this process.
    pub best_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Oracle calls per second.
    pub evaluations_per_second: f64,
}

/// Reason the run loop ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every scheduled generation was evaluated.
    ScheduleComplete,
    /// The cancellation handle was triggered.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_schedule() {
        let params = RunParams::new(100, 0.2).with_stage(3, 2).with_stage(2, 8);
        assert_eq!(params.generations(), 5);
        assert_eq!(params.schedule[0].precision, 2);
        assert_eq!(params.schedule[4].precision, 8);
        assert!(params.schedule.iter().all(|e| e.keep_best_frac == 0.2));
    }

    #[test]
    fn test_validate() {
        assert!(RunParams::new(10, 0.3).validate().is_ok());
        assert!(RunParams::new(1, 0.3).validate().is_err());
        assert!(RunParams::new(10, 1.5).validate().is_err());
    }

    #[test]
    fn test_request_appends_to_stored_schedule() {
        let request = RunRequest {
            popsize: 20,
            keepfrac: 0.5,
            stages: vec![(2, 4)],
        };

        let fresh = request.apply_to(None);
        assert_eq!(fresh, RunParams::new(20, 0.5).with_stage(2, 4));

        let stored = RunParams::new(10, 0.2).with_stage(3, 1);
        let merged = request.apply_to(Some(stored));
        assert_eq!(merged.popsize, 10);
        assert_eq!(merged.generations(), 5);
        assert_eq!(merged.schedule[3].precision, 4);
        assert_eq!(merged.schedule[3].keep_best_frac, 0.2);
    }

    #[test]
    fn test_params_serialization() {
        let params = RunParams::new(50, 0.25).with_stage(4, 6);
        let json = serde_json::to_string(&params).unwrap();
        let parsed: RunParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }
}
