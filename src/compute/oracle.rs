//! Fitness oracle: turns a genotype into sampled sensor radiances.
//!
//! The oracle is the expensive part of every generation. The engine only sees
//! the [`FitnessOracle`] trait; [`RadianceOracle`] implements it by running
//! the Radiance tool chain (`m4` → `oconv` → `rtrace`) in a private scratch
//! directory per call.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io;
use std::process::{Command, ExitStatus};
use std::time::Instant;

use crate::schema::{Genotype, OracleConfig};

/// Black-box evaluator of genotypes.
///
/// Implementations must be deterministic for a given `(genotype, precision)`
/// and safe to call from several worker threads at once.
pub trait FitnessOracle: Send + Sync {
    /// Sample the phenotype (one value per sensor, stable order).
    fn evaluate(&self, genotype: &Genotype, precision: u32) -> Result<Vec<f64>, OracleError>;
}

/// Oracle invocation errors.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Failed to launch {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Malformed ray-tracer output on line {line}: {content:?}")]
    MalformedOutput { line: usize, content: String },
    #[error("Expected {expected} sensor values, got {actual}")]
    SensorCount { expected: usize, actual: usize },
    #[error("Oracle produced an empty phenotype")]
    EmptyPhenotype,
    #[error("Scratch file error: {0}")]
    Io(#[from] io::Error),
}

/// Oracle backed by the Radiance command-line tools.
#[derive(Debug, Clone)]
pub struct RadianceOracle {
    config: OracleConfig,
}

impl RadianceOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Sensor description fed to `rtrace` on stdin: `x y z dx dy dz` per line.
    pub fn sensor_file_contents(&self) -> String {
        let mut out = String::new();
        for (x, z) in self.config.grid.points() {
            let _ = writeln!(out, "{}\t0\t{}\t0\t1\t0", x, z);
        }
        out
    }

    /// Keep the first column of every non-empty output line.
    pub fn parse_output(&self, output: &[u8]) -> Result<Vec<f64>, OracleError> {
        let text = String::from_utf8_lossy(output);
        let mut values = Vec::with_capacity(self.config.grid.len());

        for (n, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = trimmed
                .split_whitespace()
                .next()
                .and_then(|first| first.parse::<f64>().ok())
                .ok_or_else(|| OracleError::MalformedOutput {
                    line: n + 1,
                    content: line.to_string(),
                })?;
            values.push(value);
        }

        if values.is_empty() {
            return Err(OracleError::EmptyPhenotype);
        }
        if values.len() != self.config.grid.len() {
            return Err(OracleError::SensorCount {
                expected: self.config.grid.len(),
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

impl FitnessOracle for RadianceOracle {
    fn evaluate(&self, genotype: &Genotype, precision: u32) -> Result<Vec<f64>, OracleError> {
        let start = Instant::now();

        // Dropped (and deleted) on every return path.
        let mut builder = tempfile::Builder::new();
        builder.prefix("luxopt-");
        let scratch = match &self.config.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let scene_path = scratch.path().join("scene.rad");
        let octree_path = scratch.path().join("scene.oct");
        let sensor_path = scratch.path().join("grid.pts");

        let definitions = genotype
            .to_definition_args()
            .into_iter()
            .map(|definition| format!("-D{}", definition));
        let scene = run_tool(
            Command::new(&self.config.m4)
                .args(definitions)
                .arg(&self.config.template),
        )?;
        fs::write(&scene_path, scene)?;

        let octree = run_tool(Command::new(&self.config.oconv).arg(&scene_path))?;
        fs::write(&octree_path, octree)?;

        fs::write(&sensor_path, self.sensor_file_contents())?;
        let triplets = run_tool(
            Command::new(&self.config.rtrace)
                .arg("-ab")
                .arg(precision.to_string())
                .arg("-h")
                .arg(&octree_path)
                .stdin(File::open(&sensor_path)?),
        )?;

        let phenotype = self.parse_output(&triplets)?;
        log::debug!(
            "Evaluated {} at precision {} in {:.2}s",
            genotype,
            precision,
            start.elapsed().as_secs_f64()
        );
        Ok(phenotype)
    }
}

/// Run a tool to completion and return its stdout.
fn run_tool(command: &mut Command) -> Result<Vec<u8>, OracleError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = command.output().map_err(|source| OracleError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(OracleError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}
