//! Genotype manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, and mutation operations, plus the
//! bounded repair loops that keep results inside the feasible region.

use rand::prelude::*;
use rand::seq::index;

use crate::schema::{Allele, Genotype, Locus, OperatorConfig, RetryLimits};

use super::error::{EvolutionError, RepairStage};

/// Random number generator wrapper for genotype operations.
pub struct GenotypeRng {
    rng: StdRng,
    operators: OperatorConfig,
}

impl GenotypeRng {
    /// Create from seed.
    pub fn new(seed: u64, operators: OperatorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            operators,
        }
    }

    /// Zero-mean Gaussian draw truncated toward zero.
    fn gaussian_step(&mut self, sigma: f64) -> i64 {
        let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
        (noise * sigma) as i64
    }

    /// Draw every locus independently, without checking constraints.
    pub fn randomize_unsafe(&mut self) -> Genotype {
        let mut genotype = Genotype::default();
        for locus in Locus::ALL {
            let allele = match genotype.get(locus) {
                Allele::Int(_) => Allele::Int(self.gaussian_step(self.operators.init_sigma)),
                Allele::Bool(_) => Allele::Bool(self.rng.gen_bool(0.5)),
            };
            genotype.set(locus, allele);
        }
        genotype
    }

    /// Draw random genotypes until one is valid.
    pub fn randomize(&mut self, limits: &RetryLimits) -> Result<Genotype, EvolutionError> {
        for _ in 0..limits.max_randomize_attempts {
            let genotype = self.randomize_unsafe();
            if genotype.is_valid() {
                return Ok(genotype);
            }
        }
        Err(EvolutionError::InfeasibleRegion {
            stage: RepairStage::Randomize,
            attempts: limits.max_randomize_attempts,
        })
    }

    /// Perturb each locus with probability `1 / Locus::COUNT`.
    ///
    /// Integer loci receive a Gaussian step, boolean loci are redrawn. The
    /// result may violate constraints.
    pub fn mutate_unsafe(&mut self, genotype: &mut Genotype) {
        let rate = 1.0 / Locus::COUNT as f64;
        for locus in Locus::ALL {
            if !self.rng.gen_bool(rate) {
                continue;
            }
            let allele = match genotype.get(locus) {
                Allele::Int(v) => Allele::Int(v + self.gaussian_step(self.operators.mutation_sigma)),
                Allele::Bool(_) => Allele::Bool(self.rng.gen_bool(0.5)),
            };
            genotype.set(locus, allele);
        }
    }

    /// Mutate, retrying from the original value until the result is valid.
    ///
    /// On exhaustion the genotype is left unchanged.
    pub fn mutate(
        &mut self,
        genotype: &mut Genotype,
        limits: &RetryLimits,
    ) -> Result<(), EvolutionError> {
        let original = genotype.clone();
        for _ in 0..limits.max_mutation_attempts {
            self.mutate_unsafe(genotype);
            if genotype.is_valid() {
                return Ok(());
            }
            genotype.clone_from(&original);
        }
        Err(EvolutionError::InfeasibleRegion {
            stage: RepairStage::Mutate,
            attempts: limits.max_mutation_attempts,
        })
    }

    /// Uniform crossover: each locus comes from either parent with equal odds.
    pub fn crossover(&mut self, parent1: &Genotype, parent2: &Genotype) -> Genotype {
        let mut child = parent1.clone();
        for locus in Locus::ALL {
            if !self.rng.gen_bool(0.5) {
                child.set(locus, parent2.get(locus));
            }
        }
        child
    }

    /// Two distinct indices drawn uniformly from `0..pool`.
    ///
    /// `pool` must be at least 2.
    pub fn choose_pair(&mut self, pool: usize) -> (usize, usize) {
        let picked = index::sample(&mut self.rng, pool, 2);
        (picked.index(0), picked.index(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn interior_genotype() -> Genotype {
        Genotype {
            a: 500,
            b: 400,
            c: 900,
            d: 300,
            e: 800,
            f: 700,
            g: 250,
            h: 180,
            i: 600,
            j: false,
            k: true,
        }
    }

    #[test]
    fn test_randomize_valid() {
        let mut rng = GenotypeRng::new(42, OperatorConfig::default());
        let limits = RetryLimits::default();
        for _ in 0..50 {
            let genotype = rng.randomize(&limits).unwrap();
            assert!(genotype.is_valid());
        }
    }

    #[test]
    fn test_randomize_reproducible() {
        let limits = RetryLimits::default();
        let mut rng1 = GenotypeRng::new(7, OperatorConfig::default());
        let mut rng2 = GenotypeRng::new(7, OperatorConfig::default());
        assert_eq!(
            rng1.randomize(&limits).unwrap(),
            rng2.randomize(&limits).unwrap()
        );
    }

    #[test]
    fn test_randomize_infeasible() {
        let operators = OperatorConfig {
            init_sigma: 1e-9,
            ..Default::default()
        };
        let mut rng = GenotypeRng::new(1, operators);
        let limits = RetryLimits {
            max_randomize_attempts: 5,
            ..Default::default()
        };

        let err = rng.randomize(&limits).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::InfeasibleRegion {
                stage: RepairStage::Randomize,
                attempts: 5
            }
        ));
    }

    #[test]
    fn test_mutate_valid() {
        let mut rng = GenotypeRng::new(3, OperatorConfig::default());
        let limits = RetryLimits::default();
        let mut genotype = interior_genotype();
        for _ in 0..200 {
            rng.mutate(&mut genotype, &limits).unwrap();
            assert!(genotype.is_valid());
        }
    }

    #[test]
    fn test_mutate_keeps_first_valid_attempt() {
        let limits = RetryLimits::default();
        let mut checked = 0;
        for seed in 0..100 {
            let mut safe_rng = GenotypeRng::new(seed, OperatorConfig::default());
            let mut unsafe_rng = GenotypeRng::new(seed, OperatorConfig::default());

            let mut mutated = interior_genotype();
            let mut perturbed = interior_genotype();
            safe_rng.mutate(&mut mutated, &limits).unwrap();
            unsafe_rng.mutate_unsafe(&mut perturbed);

            if perturbed.is_valid() {
                assert_eq!(mutated, perturbed);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_mutate_infeasible_restores_original() {
        let operators = OperatorConfig {
            mutation_sigma: 1e-9,
            ..Default::default()
        };
        let mut rng = GenotypeRng::new(5, operators);
        let limits = RetryLimits {
            max_mutation_attempts: 10,
            ..Default::default()
        };

        // h is out of range and integer steps round to zero, so no repair exists.
        let mut genotype = interior_genotype();
        genotype.h = 0;
        genotype.j = false;
        genotype.k = false;
        let original = genotype.clone();

        let err = rng.mutate(&mut genotype, &limits).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::InfeasibleRegion {
                stage: RepairStage::Mutate,
                ..
            }
        ));
        assert_eq!(genotype, original);
    }

    #[test]
    fn test_mutate_unsafe_changes_few_loci() {
        let mut rng = GenotypeRng::new(11, OperatorConfig::default());
        let mut total_changed = 0;
        let trials = 2000;
        for _ in 0..trials {
            let original = interior_genotype();
            let mut genotype = original.clone();
            rng.mutate_unsafe(&mut genotype);
            total_changed += Locus::ALL
                .iter()
                .filter(|&&l| genotype.get(l) != original.get(l))
                .count();
        }
        // One locus selected per call on average; some draws leave the value unchanged.
        let mean = total_changed as f64 / trials as f64;
        assert!(mean > 0.6 && mean < 1.3, "mean changed loci {}", mean);
    }

    #[test]
    fn test_crossover_mixes_parents() {
        let mut rng = GenotypeRng::new(9, OperatorConfig::default());
        let p1 = interior_genotype();
        let mut p2 = interior_genotype();
        for locus in Locus::ALL {
            let allele = match p1.get(locus) {
                Allele::Int(v) => Allele::Int(v + 1),
                Allele::Bool(v) => Allele::Bool(!v),
            };
            p2.set(locus, allele);
        }

        let mut from_p1 = 0;
        let mut from_p2 = 0;
        for _ in 0..100 {
            let child = rng.crossover(&p1, &p2);
            for locus in Locus::ALL {
                let value = child.get(locus);
                if value == p1.get(locus) {
                    from_p1 += 1;
                } else {
                    assert_eq!(value, p2.get(locus));
                    from_p2 += 1;
                }
            }
        }
        assert!(from_p1 > 400 && from_p2 > 400);
    }

    #[test]
    fn test_choose_pair_distinct() {
        let mut rng = GenotypeRng::new(13, OperatorConfig::default());
        for _ in 0..100 {
            let (i, j) = rng.choose_pair(2);
            assert_ne!(i, j);
            assert!(i < 2 && j < 2);
        }
    }

    proptest! {
        #[test]
        fn prop_randomize_and_mutate_stay_valid(seed in any::<u64>()) {
            let mut rng = GenotypeRng::new(seed, OperatorConfig::default());
            let limits = RetryLimits::default();
            let mut genotype = rng.randomize(&limits).unwrap();
            prop_assert!(genotype.is_valid());
            rng.mutate(&mut genotype, &limits).unwrap();
            prop_assert!(genotype.is_valid());
        }
    }
}
