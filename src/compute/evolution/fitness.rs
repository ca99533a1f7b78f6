//! Fitness function and evaluation cache.
//!
//! Fitness rewards a homogeneous illumination (inhomogeneity below
//! [`INHOMOGENEITY_TARGET`], penalized with a fifth power) and, secondarily, a
//! high minimum radiance. Changing any constant here makes fitness values
//! incomparable with older checkpoints, so bump [`FITNESS_VERSION`] with it.

use std::collections::{BTreeMap, HashMap, HashSet, btree_map};

use serde::{Deserialize, Serialize};

use crate::compute::{FitnessOracle, OracleError};
use crate::schema::Genotype;

/// Version tag stored with every population snapshot.
pub const FITNESS_VERSION: u32 = 1;

/// Offset added to min/max radiance so an all-dark phenotype stays finite.
pub const STABILITY_OFFSET: f64 = 1e-9;

/// Inhomogeneity at which the penalty term reaches 1.
pub const INHOMOGENEITY_TARGET: f64 = 0.03;

/// Exponent of the inhomogeneity penalty.
pub const PENALTY_EXPONENT: i32 = 5;

/// Min/max radiance and the resulting inhomogeneity of a phenotype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianceSummary {
    /// Minimum radiance plus offset.
    pub min_radiance: f64,
    /// Maximum radiance plus offset.
    pub max_radiance: f64,
    /// `(max - min) / min`.
    pub inhomogeneity: f64,
}

impl RadianceSummary {
    pub fn from_phenotype(phenotype: &[f64]) -> Result<Self, OracleError> {
        if phenotype.is_empty() {
            return Err(OracleError::EmptyPhenotype);
        }
        let min = phenotype.iter().copied().fold(f64::INFINITY, f64::min);
        let max = phenotype.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let min_radiance = min + STABILITY_OFFSET;
        let max_radiance = max + STABILITY_OFFSET;

        Ok(Self {
            min_radiance,
            max_radiance,
            inhomogeneity: (max_radiance - min_radiance) / min_radiance,
        })
    }

    /// `-((I / target)^5 - min_radiance)`
    pub fn fitness(&self) -> f64 {
        -((self.inhomogeneity / INHOMOGENEITY_TARGET).powi(PENALTY_EXPONENT) - self.min_radiance)
    }
}

/// Raw fitness of a phenotype.
pub fn fitness(phenotype: &[f64]) -> Result<f64, OracleError> {
    Ok(RadianceSummary::from_phenotype(phenotype)?.fitness())
}

/// Linearly rescale fitness values into `[0, 1]`.
///
/// All values map to 0 when they are all equal.
pub fn scale_fitness(raw: &[f64]) -> Vec<f64> {
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    raw.iter()
        .map(|&f| {
            let shifted = f - min;
            if range != 0.0 { shifted / range } else { shifted }
        })
        .collect()
}

/// Phenotype of one genotype at one precision, with lazily computed fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Precision level the phenotype was sampled at.
    pub precision: u32,
    /// Sensor radiances.
    pub phenotype: Vec<f64>,
    /// Raw fitness, filled on first read.
    #[serde(default)]
    pub fitness: Option<f64>,
}

impl Evaluation {
    /// Wrap a phenotype; fitness is computed on demand.
    pub fn new(precision: u32, phenotype: Vec<f64>) -> Self {
        Self {
            precision,
            phenotype,
            fitness: None,
        }
    }

    /// Fitness, computing and memoizing it if needed.
    pub fn fitness(&mut self) -> Result<f64, OracleError> {
        if let Some(f) = self.fitness {
            return Ok(f);
        }
        let f = fitness(&self.phenotype)?;
        self.fitness = Some(f);
        Ok(f)
    }
}

/// Evaluate a genotype from scratch: `(genotype, precision) -> (phenotype, fitness)`.
pub fn evaluate(
    genotype: &Genotype,
    precision: u32,
    oracle: &dyn FitnessOracle,
) -> Result<Evaluation, OracleError> {
    let mut evaluation = Evaluation::new(precision, oracle.evaluate(genotype, precision)?);
    evaluation.fitness()?;
    Ok(evaluation)
}

/// Serialized form of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEvaluation {
    /// Canonical genotype encoding.
    pub encoding: String,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

/// Evaluations keyed by canonical genotype encoding and precision.
#[derive(Debug, Clone, Default)]
pub struct EvaluationCache {
    entries: HashMap<String, BTreeMap<u32, Evaluation>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, encoding: &str, precision: u32) -> Option<&Evaluation> {
        self.entries.get(encoding)?.get(&precision)
    }

    pub fn get_mut(&mut self, encoding: &str, precision: u32) -> Option<&mut Evaluation> {
        self.entries.get_mut(encoding)?.get_mut(&precision)
    }

    pub fn contains(&self, encoding: &str, precision: u32) -> bool {
        self.get(encoding, precision).is_some()
    }

    /// Cached evaluation, or one built from `phenotype` on a miss.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        encoding: String,
        precision: u32,
        phenotype: impl FnOnce() -> Result<Vec<f64>, E>,
    ) -> Result<&mut Evaluation, E> {
        match self.entries.entry(encoding).or_default().entry(precision) {
            btree_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            btree_map::Entry::Vacant(entry) => {
                Ok(entry.insert(Evaluation::new(precision, phenotype()?)))
            }
        }
    }

    /// Store an evaluation, replacing any previous one for the same key.
    pub fn insert(&mut self, encoding: String, evaluation: Evaluation) {
        self.entries
            .entry(encoding)
            .or_default()
            .insert(evaluation.precision, evaluation);
    }

    /// Drop every entry whose encoding is not in `live`.
    pub fn retain_encodings(&mut self, live: &HashSet<String>) {
        self.entries.retain(|encoding, _| live.contains(encoding));
    }

    /// Drop all evaluations of one genotype.
    pub fn remove_encoding(&mut self, encoding: &str) {
        self.entries.remove(encoding);
    }

    /// Number of stored evaluations.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Entries in a deterministic order for serialization.
    pub fn to_entries(&self) -> Vec<CachedEvaluation> {
        let mut encodings: Vec<&String> = self.entries.keys().collect();
        encodings.sort();

        encodings
            .into_iter()
            .flat_map(|encoding| {
                self.entries[encoding]
                    .values()
                    .map(move |evaluation| CachedEvaluation {
                        encoding: encoding.clone(),
                        evaluation: evaluation.clone(),
                    })
            })
            .collect()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CachedEvaluation>) -> Self {
        let mut cache = Self::new();
        for entry in entries {
            cache.insert(entry.encoding, entry.evaluation);
        }
        cache
    }
}
