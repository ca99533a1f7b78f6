//! Engine configuration: oracle invocation, operator step sizes, retry caps.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default number of evaluation workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Top-level engine configuration.
///
/// Run parameters (population size, schedule) live in the checkpoint store,
/// not here; this only describes *how* the engine executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Evaluation worker count.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Step sizes for random initialization and mutation.
    #[serde(default)]
    pub operators: OperatorConfig,
    /// Caps on the repair and deduplication loops.
    #[serde(default)]
    pub limits: RetryLimits,
    /// Ray-tracing oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            operators: OperatorConfig::default(),
            limits: RetryLimits::default(),
            oracle: OracleConfig::default(),
            random_seed: None,
        }
    }
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

/// Standard deviations for the Gaussian draws on integer loci.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Spread of freshly randomized integer loci.
    #[serde(default = "default_init_sigma")]
    pub init_sigma: f64,
    /// Spread of a single mutation step.
    #[serde(default = "default_mutation_sigma")]
    pub mutation_sigma: f64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            init_sigma: default_init_sigma(),
            mutation_sigma: default_mutation_sigma(),
        }
    }
}

fn default_init_sigma() -> f64 {
    1000.0
}
fn default_mutation_sigma() -> f64 {
    100.0
}

/// Upper bounds on rejection-sampling loops.
///
/// Exhausting a cap surfaces as `EvolutionError::InfeasibleRegion`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryLimits {
    /// Draws allowed per `randomize` call.
    #[serde(default = "default_attempts")]
    pub max_randomize_attempts: usize,
    /// Perturbations allowed per `mutate` call.
    #[serde(default = "default_attempts")]
    pub max_mutation_attempts: usize,
    /// Crossover/mutation attempts allowed per accepted child.
    #[serde(default = "default_attempts")]
    pub max_child_attempts: usize,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            max_randomize_attempts: default_attempts(),
            max_mutation_attempts: default_attempts(),
            max_child_attempts: default_attempts(),
        }
    }
}

fn default_attempts() -> usize {
    100_000
}

/// External tool chain used by the radiance oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// m4 scene template parameterized by the genotype definitions.
    #[serde(default = "default_template")]
    pub template: PathBuf,
    /// Macro processor executable.
    #[serde(default = "default_m4")]
    pub m4: String,
    /// Octree compiler executable.
    #[serde(default = "default_oconv")]
    pub oconv: String,
    /// Ray tracer executable.
    #[serde(default = "default_rtrace")]
    pub rtrace: String,
    /// Sensor points sampled by the ray tracer.
    #[serde(default)]
    pub grid: SensorGrid,
    /// Parent directory for per-call scratch directories (system temp if unset).
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            m4: default_m4(),
            oconv: default_oconv(),
            rtrace: default_rtrace(),
            grid: SensorGrid::default(),
            scratch_dir: None,
        }
    }
}

fn default_template() -> PathBuf {
    PathBuf::from("design1.rad.m4")
}
fn default_m4() -> String {
    "m4".to_string()
}
fn default_oconv() -> String {
    "oconv".to_string()
}
fn default_rtrace() -> String {
    "rtrace".to_string()
}

/// Regular grid of upward-facing sensors on the `y = 0` plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorGrid {
    /// Sensors along x.
    pub x_count: usize,
    /// Sensors along z.
    pub z_count: usize,
    /// Grid centre on x.
    pub x_center: f64,
    /// Grid centre on z.
    pub z_center: f64,
    /// Distance from centre to the outermost sensor on x.
    pub x_half_span: f64,
    /// Distance from centre to the outermost sensor on z.
    pub z_half_span: f64,
}

impl Default for SensorGrid {
    fn default() -> Self {
        Self {
            x_count: 8,
            z_count: 8,
            x_center: 545.0,
            z_center: 9.0,
            x_half_span: 299.0,
            z_half_span: 324.0,
        }
    }
}

impl SensorGrid {
    /// Total number of sensors.
    #[inline]
    pub fn len(&self) -> usize {
        self.x_count * self.z_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sensor positions `(x, z)`, row-major with x as the outer axis.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let axis = |index: usize, count: usize, center: f64, half_span: f64| {
            if count <= 1 {
                center
            } else {
                center + half_span * (index as f64 / (count - 1) as f64 - 0.5) * 2.0
            }
        };

        let mut points = Vec::with_capacity(self.len());
        for ix in 0..self.x_count {
            for iz in 0..self.z_count {
                points.push((
                    axis(ix, self.x_count, self.x_center, self.x_half_span),
                    axis(iz, self.z_count, self.z_center, self.z_half_span),
                ));
            }
        }
        points
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !(self.operators.init_sigma > 0.0) {
            return Err(ConfigError::InvalidSigma {
                name: "init_sigma",
                value: self.operators.init_sigma,
            });
        }
        if !(self.operators.mutation_sigma > 0.0) {
            return Err(ConfigError::InvalidSigma {
                name: "mutation_sigma",
                value: self.operators.mutation_sigma,
            });
        }
        if self.limits.max_randomize_attempts == 0
            || self.limits.max_mutation_attempts == 0
            || self.limits.max_child_attempts == 0
        {
            return Err(ConfigError::ZeroRetryLimit);
        }
        if self.oracle.grid.is_empty() {
            return Err(ConfigError::EmptyGrid);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Worker count must be non-zero")]
    NoWorkers,
    #[error("{name} must be positive, got {value}")]
    InvalidSigma { name: &'static str, value: f64 },
    #[error("Retry limits must be non-zero")]
    ZeroRetryLimit,
    #[error("Sensor grid must contain at least one point")]
    EmptyGrid,
    #[error("Invalid run parameters: {0}")]
    InvalidRunParams(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"workers": 2, "random_seed": 7}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.operators.init_sigma, 1000.0);
        assert_eq!(config.limits.max_child_attempts, 100_000);
        assert_eq!(config.oracle.rtrace, "rtrace");
    }

    #[test]
    fn test_invalid_configs() {
        let config = EngineConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));

        let mut config = EngineConfig::default();
        config.operators.mutation_sigma = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSigma { .. })
        ));

        let mut config = EngineConfig::default();
        config.oracle.grid.z_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyGrid)));
    }

    #[test]
    fn test_grid_points() {
        let grid = SensorGrid::default();
        let points = grid.points();
        assert_eq!(points.len(), 64);
        assert!((points[0].0 - 246.0).abs() < 1e-9);
        assert!((points[0].1 - (-315.0)).abs() < 1e-9);
        // z varies fastest
        assert!((points[7].1 - 333.0).abs() < 1e-9);
        assert!((points[63].0 - 844.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_sensor_axis_is_centered() {
        let grid = SensorGrid {
            x_count: 1,
            z_count: 1,
            ..Default::default()
        };
        assert_eq!(grid.points(), vec![(545.0, 9.0)]);
    }
}
