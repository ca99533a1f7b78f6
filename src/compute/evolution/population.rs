//! Population lifecycle: lazy evaluation, selection, offspring, diversity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::compute::FitnessOracle;
use crate::schema::{Genotype, Locus, RetryLimits};

use super::error::{EvolutionError, RepairStage};
use super::fitness::{
    CachedEvaluation, Evaluation, EvaluationCache, FITNESS_VERSION, scale_fitness,
};
use super::genome::GenotypeRng;

/// A member of the population.
///
/// Phenotype and fitness are not stored here; the owning [`Population`]
/// caches them by genotype encoding, so changing the genotype invalidates
/// both at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Unique identifier within a run.
    pub id: u64,
    /// The genotype.
    pub genotype: Genotype,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    #[serde(default)]
    pub parents: Vec<u64>,
}

/// Number of survivors kept from a population of `n`.
///
/// `max(2, floor(n * keep_best_frac))`, never more than `n`.
pub fn survivor_count(n: usize, keep_best_frac: f64) -> usize {
    let kept = (n as f64 * keep_best_frac).floor().max(0.0) as usize;
    kept.max(2).min(n)
}

/// Outcome of [`Population::do_generation`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    /// IDs of the survivors, best first.
    pub survivors: Vec<u64>,
    /// Children synthesized.
    pub children: usize,
    /// Candidate children rejected as invalid or duplicate.
    pub rejected: usize,
}

/// Mean and coefficient of variation of one locus across the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocusDiversity {
    pub locus: Locus,
    pub mean: f64,
    /// Population standard deviation over mean; `+inf` when the mean is 0.
    pub cv: f64,
}

/// Per-locus diversity of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    pub loci: Vec<LocusDiversity>,
}

impl DiversityReport {
    /// Scalar convergence proxy.
    pub fn cv_sum(&self) -> f64 {
        self.loci.iter().map(|l| l.cv).sum()
    }

    pub fn get(&self, locus: Locus) -> Option<&LocusDiversity> {
        self.loci.iter().find(|l| l.locus == locus)
    }
}

/// Serialized population, as persisted per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    /// Fitness function version the cached fitness values were computed with.
    pub fitness_version: u32,
    /// Generation index of this population.
    pub generation: usize,
    /// Next free individual ID.
    pub next_id: u64,
    pub individuals: Vec<Individual>,
    /// Cached phenotypes of the individuals.
    #[serde(default)]
    pub evaluations: Vec<CachedEvaluation>,
}

/// Ordered, fixed-size set of individuals plus their evaluation cache.
#[derive(Debug, Clone, Default)]
pub struct Population {
    individuals: Vec<Individual>,
    cache: EvaluationCache,
    next_id: u64,
    generation: usize,
}

impl Population {
    /// Build generation 0 from explicit genotypes.
    pub fn from_genotypes(genotypes: impl IntoIterator<Item = Genotype>) -> Self {
        let mut population = Self::default();
        for genotype in genotypes {
            let id = population.allocate_id();
            population.individuals.push(Individual {
                id,
                genotype,
                generation: 0,
                parents: Vec::new(),
            });
        }
        population
    }

    /// Build generation 0 from `size` randomized genotypes.
    pub fn random(
        size: usize,
        rng: &mut GenotypeRng,
        limits: &RetryLimits,
    ) -> Result<Self, EvolutionError> {
        let genotypes = (0..size)
            .map(|_| rng.randomize(limits))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_genotypes(genotypes))
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn get(&self, idx: usize) -> Option<&Individual> {
        self.individuals.get(idx)
    }

    /// Generation index of the current individuals.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// True if some individual already carries this genotype.
    pub fn contains_genotype(&self, genotype: &Genotype) -> bool {
        let encoding = genotype.encode();
        self.individuals
            .iter()
            .any(|i| i.genotype.encode() == encoding)
    }

    /// Individual `idx`, or [`EvolutionError::IndexOutOfRange`].
    fn individual(&self, idx: usize) -> Result<&Individual, EvolutionError> {
        self.individuals
            .get(idx)
            .ok_or(EvolutionError::IndexOutOfRange {
                index: idx,
                len: self.individuals.len(),
            })
    }

    /// Whether individual `idx` lacks a phenotype at `precision`.
    pub fn is_stale(&self, idx: usize, precision: u32) -> Result<bool, EvolutionError> {
        let encoding = self.individual(idx)?.genotype.encode();
        Ok(!self.cache.contains(&encoding, precision))
    }

    /// Number of individuals without a phenotype at `precision`.
    pub fn stale_count(&self, precision: u32) -> usize {
        self.individuals
            .iter()
            .filter(|i| !self.cache.contains(&i.genotype.encode(), precision))
            .count()
    }

    /// Genotypes without a phenotype at `precision`, one per distinct encoding.
    pub fn stale_genotypes(&self, precision: u32) -> Vec<Genotype> {
        let mut seen = HashSet::new();
        self.individuals
            .iter()
            .filter(|i| {
                let encoding = i.genotype.encode();
                !self.cache.contains(&encoding, precision) && seen.insert(encoding)
            })
            .map(|i| i.genotype.clone())
            .collect()
    }

    /// Attach an externally computed phenotype. Fitness stays lazy.
    pub fn record_phenotype(&mut self, genotype: &Genotype, precision: u32, phenotype: Vec<f64>) {
        self.cache
            .insert(genotype.encode(), Evaluation::new(precision, phenotype));
    }

    /// Evaluation of individual `idx` at `precision`, invoking the oracle if needed.
    fn evaluation_mut(
        &mut self,
        idx: usize,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<&mut Evaluation, EvolutionError> {
        let len = self.individuals.len();
        let genotype = &self
            .individuals
            .get(idx)
            .ok_or(EvolutionError::IndexOutOfRange { index: idx, len })?
            .genotype;
        Ok(self
            .cache
            .get_or_try_insert_with(genotype.encode(), precision, || {
                oracle.evaluate(genotype, precision)
            })?)
    }

    /// Phenotype of individual `idx` at `precision`.
    pub fn phenotype(
        &mut self,
        idx: usize,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<&[f64], EvolutionError> {
        Ok(&self.evaluation_mut(idx, precision, oracle)?.phenotype)
    }

    /// Raw fitness of individual `idx` at `precision`.
    pub fn fitness(
        &mut self,
        idx: usize,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<f64, EvolutionError> {
        Ok(self.evaluation_mut(idx, precision, oracle)?.fitness()?)
    }

    /// Raw fitness of every individual, in population order.
    pub fn raw_fitness(
        &mut self,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<Vec<f64>, EvolutionError> {
        (0..self.len())
            .map(|idx| self.fitness(idx, precision, oracle))
            .collect()
    }

    /// Raw fitness rescaled into `[0, 1]`.
    pub fn scaled_fitness(
        &mut self,
        precision: u32,
        oracle: &dyn FitnessOracle,
    ) -> Result<Vec<f64>, EvolutionError> {
        Ok(scale_fitness(&self.raw_fitness(precision, oracle)?))
    }

    /// Replace individual `idx` with a fresh random valid genotype.
    pub fn randomize(
        &mut self,
        idx: usize,
        rng: &mut GenotypeRng,
        limits: &RetryLimits,
    ) -> Result<(), EvolutionError> {
        self.individual(idx)?;
        let genotype = rng.randomize(limits)?;
        self.replace_genotype(idx, genotype);
        Ok(())
    }

    /// Mutate individual `idx` while keeping it valid.
    pub fn mutate(
        &mut self,
        idx: usize,
        rng: &mut GenotypeRng,
        limits: &RetryLimits,
    ) -> Result<(), EvolutionError> {
        let mut genotype = self.individual(idx)?.genotype.clone();
        rng.mutate(&mut genotype, limits)?;
        self.replace_genotype(idx, genotype);
        Ok(())
    }

    /// Perturb individual `idx` without any constraint check.
    pub fn mutate_unsafe(&mut self, idx: usize, rng: &mut GenotypeRng) -> Result<(), EvolutionError> {
        let mut genotype = self.individual(idx)?.genotype.clone();
        rng.mutate_unsafe(&mut genotype);
        self.replace_genotype(idx, genotype);
        Ok(())
    }

    /// Swap in a new genotype and drop cache entries no one references anymore.
    fn replace_genotype(&mut self, idx: usize, genotype: Genotype) {
        let old = std::mem::replace(&mut self.individuals[idx].genotype, genotype);
        if !self.contains_genotype(&old) {
            self.cache.remove_encoding(&old.encode());
        }
    }

    /// Advance one generation: truncation selection, uniform crossover,
    /// unsafe mutation, and rejection of invalid or duplicate children.
    pub fn do_generation(
        &mut self,
        keep_best_frac: f64,
        precision: u32,
        oracle: &dyn FitnessOracle,
        rng: &mut GenotypeRng,
        limits: &RetryLimits,
    ) -> Result<GenerationSummary, EvolutionError> {
        let n = self.len();
        if n == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }

        let raw = self.raw_fitness(precision, oracle)?;
        let rank_key = |idx: usize| {
            let f = raw[idx];
            if f.is_nan() { f64::NEG_INFINITY } else { f }
        };

        // Stable: equal fitness keeps population order.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| rank_key(b).total_cmp(&rank_key(a)));

        let m = survivor_count(n, keep_best_frac);
        let mut next: Vec<Individual> = order[..m]
            .iter()
            .map(|&idx| self.individuals[idx].clone())
            .collect();
        let survivors: Vec<u64> = next.iter().map(|i| i.id).collect();

        let mut present: HashSet<String> = next.iter().map(|i| i.genotype.encode()).collect();
        let child_generation = self.generation + 1;
        let mut rejected = 0;

        for _ in m..n {
            let mut accepted = None;
            for _ in 0..limits.max_child_attempts {
                let (p, q) = rng.choose_pair(m);
                let (parent1, parent2) = (&next[p], &next[q]);

                let mut genotype = rng.crossover(&parent1.genotype, &parent2.genotype);
                rng.mutate_unsafe(&mut genotype);

                if genotype.is_valid() && present.insert(genotype.encode()) {
                    accepted = Some((genotype, vec![parent1.id, parent2.id]));
                    break;
                }
                rejected += 1;
            }

            let (genotype, parents) = accepted.ok_or(EvolutionError::InfeasibleRegion {
                stage: RepairStage::Offspring,
                attempts: limits.max_child_attempts,
            })?;
            let id = self.allocate_id();
            next.push(Individual {
                id,
                genotype,
                generation: child_generation,
                parents,
            });
        }

        let children = n - m;
        self.individuals = next;
        self.generation = child_generation;
        self.cache.retain_encodings(&present);

        if rejected > children * 100 {
            log::warn!(
                "Generation {}: {} candidate children rejected for {} accepted",
                child_generation,
                rejected,
                children
            );
        }

        Ok(GenerationSummary {
            survivors,
            children,
            rejected,
        })
    }

    /// Per-locus mean and coefficient of variation. `None` when empty.
    pub fn calc_diversity(&self) -> Option<DiversityReport> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;

        let loci = Locus::ALL
            .iter()
            .map(|&locus| {
                let values: Vec<f64> = self
                    .individuals
                    .iter()
                    .map(|i| i.genotype.get(locus).as_f64())
                    .collect();
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let cv = if mean == 0.0 {
                    f64::INFINITY
                } else {
                    variance.sqrt() / mean
                };
                LocusDiversity { locus, mean, cv }
            })
            .collect();

        Some(DiversityReport { loci })
    }

    /// Serializable copy of the population and its cached evaluations.
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            fitness_version: FITNESS_VERSION,
            generation: self.generation,
            next_id: self.next_id,
            individuals: self.individuals.clone(),
            evaluations: self.cache.to_entries(),
        }
    }

    /// Restore a population from a snapshot.
    ///
    /// Cached fitness values from another fitness version are discarded and
    /// recomputed from the stored phenotypes on demand.
    pub fn from_snapshot(snapshot: PopulationSnapshot) -> Self {
        let mut evaluations = snapshot.evaluations;
        if snapshot.fitness_version != FITNESS_VERSION {
            log::warn!(
                "Snapshot uses fitness version {} (current {}); recomputing fitness",
                snapshot.fitness_version,
                FITNESS_VERSION
            );
            for entry in &mut evaluations {
                entry.evaluation.fitness = None;
            }
        }

        let next_id = snapshot
            .individuals
            .iter()
            .map(|i| i.id + 1)
            .max()
            .unwrap_or(0)
            .max(snapshot.next_id);

        Self {
            individuals: snapshot.individuals,
            cache: EvaluationCache::from_entries(evaluations),
            next_id,
            generation: snapshot.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::testing::{CountingOracle, design};
    use crate::schema::OperatorConfig;

    fn rng(seed: u64) -> GenotypeRng {
        GenotypeRng::new(seed, OperatorConfig::default())
    }

    fn encodings(population: &Population) -> HashSet<String> {
        population
            .individuals()
            .iter()
            .map(|i| i.genotype.encode())
            .collect()
    }

    #[test]
    fn test_survivor_count() {
        assert_eq!(survivor_count(4, 0.5), 2);
        assert_eq!(survivor_count(10, 0.05), 2);
        assert_eq!(survivor_count(10, 0.35), 3);
        assert_eq!(survivor_count(100, 0.2), 20);
        assert_eq!(survivor_count(3, 1.0), 3);
        assert_eq!(survivor_count(1, 0.5), 1);
    }

    #[test]
    fn test_fitness_is_memoized() {
        let oracle = CountingOracle::default();
        let mut population = Population::from_genotypes([design(7)]);

        let first = population.fitness(0, 2, &oracle).unwrap();
        let second = population.fitness(0, 2, &oracle).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(oracle.calls(), 1);

        // Another precision is a separate evaluation.
        population.fitness(0, 4, &oracle).unwrap();
        assert_eq!(oracle.calls(), 2);
        assert_eq!(population.phenotype(0, 4, &oracle).unwrap(), &[7.0, 7.0, 7.0]);
        assert_eq!(oracle.calls(), 2);
    }

    #[test]
    fn test_genotype_change_invalidates_cache() {
        let oracle = CountingOracle::default();
        let mut population = Population::from_genotypes([design(7)]);
        population.fitness(0, 2, &oracle).unwrap();

        let mut rng = rng(1);
        let before = population.individuals()[0].genotype.encode();
        for _ in 0..100 {
            population.mutate_unsafe(0, &mut rng).unwrap();
            if population.individuals()[0].genotype.encode() != before {
                break;
            }
        }
        assert_ne!(population.individuals()[0].genotype.encode(), before);
        assert!(population.is_stale(0, 2).unwrap());
        assert!(population.cache().is_empty());

        population.fitness(0, 2, &oracle).unwrap();
        assert_eq!(oracle.calls(), 2);

        population
            .randomize(0, &mut rng, &RetryLimits::default())
            .unwrap();
        assert!(population.is_stale(0, 2).unwrap());
        assert!(population.individuals()[0].genotype.is_valid());
    }

    #[test]
    fn test_index_out_of_range() {
        let oracle = CountingOracle::default();
        let mut population = Population::from_genotypes([design(7), design(8)]);
        let mut rng = rng(3);
        let out_of_range = |result: Result<_, EvolutionError>| {
            matches!(
                result,
                Err(EvolutionError::IndexOutOfRange { index: 2, len: 2 })
            )
        };

        assert!(out_of_range(population.is_stale(2, 1).map(|_| ())));
        assert!(out_of_range(population.fitness(2, 1, &oracle).map(|_| ())));
        assert!(out_of_range(population.mutate_unsafe(2, &mut rng)));
        assert!(out_of_range(population.mutate(2, &mut rng, &RetryLimits::default())));
        assert!(out_of_range(population.randomize(2, &mut rng, &RetryLimits::default())));
        assert_eq!(oracle.calls(), 0);
        assert_eq!(population.individuals()[1].genotype, design(8));
    }

    #[test]
    fn test_mutate_keeps_valid() {
        let mut population = Population::from_genotypes([design(7), design(8)]);
        let mut rng = rng(2);
        for _ in 0..50 {
            population.mutate(1, &mut rng, &RetryLimits::default()).unwrap();
            assert!(population.individuals()[1].genotype.is_valid());
        }
    }

    #[test]
    fn test_record_phenotype_skips_oracle() {
        let oracle = CountingOracle::default();
        let mut population = Population::from_genotypes([design(3), design(4)]);
        assert_eq!(population.stale_genotypes(2).len(), 2);

        population.record_phenotype(&design(3), 2, vec![5.0, 5.0]);
        assert_eq!(population.stale_genotypes(2), vec![design(4)]);

        let f = population.fitness(0, 2, &oracle).unwrap();
        assert!((f - 5.0).abs() < 1e-6);
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn test_stale_genotypes_deduplicated() {
        let population = Population::from_genotypes([design(3), design(3), design(4)]);
        assert_eq!(population.stale_genotypes(1).len(), 2);
    }

    #[test]
    fn test_scaled_fitness_bounds() {
        let oracle = CountingOracle::default();
        let mut population =
            Population::from_genotypes([design(5), design(1), design(9), design(3)]);
        let scaled = population.scaled_fitness(2, &oracle).unwrap();

        assert!(scaled.iter().all(|&s| (0.0..=1.0).contains(&s)));
        assert!(scaled.contains(&0.0));
        assert!(scaled.contains(&1.0));
        assert_eq!(scaled[1], 0.0);
        assert_eq!(scaled[2], 1.0);
    }

    #[test]
    fn test_scaled_fitness_flat() {
        let oracle = CountingOracle::default();
        let mut a = design(5);
        let mut b = design(5);
        a.j = true;
        b.k = false;
        let mut population = Population::from_genotypes([a, b, design(5)]);
        assert_eq!(
            population.scaled_fitness(2, &oracle).unwrap(),
            vec![0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_generation_of_four() {
        let oracle = CountingOracle::default();
        let mut population =
            Population::from_genotypes([design(1), design(2), design(3), design(4)]);
        let mut rng = rng(4);

        let summary = population
            .do_generation(0.5, 2, &oracle, &mut rng, &RetryLimits::default())
            .unwrap();

        assert_eq!(summary.survivors, vec![3, 2]);
        assert_eq!(summary.children, 2);
        assert_eq!(population.len(), 4);
        assert_eq!(population.generation(), 1);

        let individuals = population.individuals();
        assert_eq!(individuals[0].genotype, design(4));
        assert_eq!(individuals[1].genotype, design(3));
        for child in &individuals[2..] {
            assert_eq!(child.generation, 1);
            assert_eq!(child.parents.len(), 2);
            assert!(child.parents.iter().all(|p| *p == 2 || *p == 3));
            assert!(child.genotype.is_valid());
            assert!(child.id >= 4);
        }
        assert_eq!(encodings(&population).len(), 4);

        // Survivors keep their evaluations; discarded ones are pruned.
        assert!(!population.is_stale(0, 2).unwrap());
        assert!(!population.is_stale(1, 2).unwrap());
        assert!(!population.cache().contains(&design(1).encode(), 2));
    }

    #[test]
    fn test_ties_keep_population_order() {
        let oracle = CountingOracle::default();
        let mut first = design(5);
        first.j = true;
        let second = design(5);
        let mut third = design(5);
        third.k = false;
        let mut population = Population::from_genotypes([design(1), first, second, third]);

        let summary = population
            .do_generation(0.5, 2, &oracle, &mut rng(8), &RetryLimits::default())
            .unwrap();
        assert_eq!(summary.survivors, vec![1, 2]);
    }

    #[test]
    fn test_generations_keep_size_and_uniqueness() {
        let oracle = CountingOracle::default();
        let mut rng = rng(5);
        let limits = RetryLimits::default();
        let mut population = Population::random(20, &mut rng, &limits).unwrap();

        for _ in 0..5 {
            population
                .do_generation(0.2, 2, &oracle, &mut rng, &limits)
                .unwrap();
            assert_eq!(population.len(), 20);
            assert_eq!(encodings(&population).len(), 20);
            assert!(population.individuals().iter().all(|i| i.genotype.is_valid()));
        }
        assert_eq!(population.generation(), 5);
    }

    #[test]
    fn test_exhausted_offspring_space() {
        let oracle = CountingOracle::default();
        let operators = OperatorConfig {
            mutation_sigma: 1e-9,
            ..Default::default()
        };
        let mut rng = GenotypeRng::new(6, operators);
        let limits = RetryLimits {
            max_child_attempts: 500,
            ..Default::default()
        };

        // Only the two boolean loci can change: three new encodings exist, four are needed.
        let mut population = Population::from_genotypes(vec![design(2); 6]);
        let before = population.individuals().to_vec();

        let err = population
            .do_generation(0.0, 2, &oracle, &mut rng, &limits)
            .unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::InfeasibleRegion {
                stage: RepairStage::Offspring,
                attempts: 500
            }
        ));
        assert_eq!(population.individuals(), &before[..]);
    }

    #[test]
    fn test_diversity() {
        let mut low = design(1);
        let mut high = design(3);
        low.k = false;
        high.k = true;
        let population = Population::from_genotypes([low, high]);
        let report = population.calc_diversity().unwrap();

        let a = report.get(Locus::A).unwrap();
        assert_eq!(a.mean, 2.0);
        assert!((a.cv - 0.5).abs() < 1e-12);

        let b = report.get(Locus::B).unwrap();
        assert_eq!(b.cv, 0.0);

        assert_eq!(report.get(Locus::J).unwrap().cv, f64::INFINITY);
        let k = report.get(Locus::K).unwrap();
        assert_eq!(k.mean, 0.5);
        assert!((k.cv - 1.0).abs() < 1e-12);

        assert_eq!(report.cv_sum(), f64::INFINITY);
        assert!(Population::default().calc_diversity().is_none());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let oracle = CountingOracle::default();
        let mut rng = rng(10);
        let mut population = Population::random(6, &mut rng, &RetryLimits::default()).unwrap();
        population.raw_fitness(3, &oracle).unwrap();

        let snapshot = population.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: PopulationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let mut restored = Population::from_snapshot(parsed);
        assert_eq!(restored.individuals(), population.individuals());
        let calls = oracle.calls();
        let before = population.raw_fitness(3, &oracle).unwrap();
        let after = restored.raw_fitness(3, &oracle).unwrap();
        assert_eq!(oracle.calls(), calls);
        assert_eq!(
            before.iter().map(|f| f.to_bits()).collect::<Vec<_>>(),
            after.iter().map(|f| f.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_snapshot_from_other_fitness_version() {
        let mut population = Population::from_genotypes([design(4)]);
        population.record_phenotype(&design(4), 1, vec![4.0]);
        let mut snapshot = population.snapshot();
        snapshot.fitness_version = FITNESS_VERSION + 1;
        snapshot.evaluations[0].evaluation.fitness = Some(-1.0);

        let mut restored = Population::from_snapshot(snapshot);
        let f = restored
            .fitness(0, 1, &CountingOracle::default())
            .unwrap();
        assert!((f - 4.0).abs() < 1e-6);
    }
}
