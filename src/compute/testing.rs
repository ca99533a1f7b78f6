//! Test doubles shared by the engine's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::compute::{FitnessOracle, OracleError};
use crate::schema::Genotype;

/// Uniform phenotype equal to locus `a`, so fitness ≈ `a`.
#[derive(Default)]
pub(crate) struct CountingOracle {
    pub calls: AtomicUsize,
}

impl CountingOracle {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FitnessOracle for CountingOracle {
    fn evaluate(&self, genotype: &Genotype, _precision: u32) -> Result<Vec<f64>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![genotype.a as f64; 3])
    }
}

/// Raises the cancellation token from inside the first oracle calls, like an
/// interrupt arriving mid-evaluation.
///
/// With `fail` set, interrupted calls error out the way a killed ray tracer
/// does; otherwise they complete.
pub(crate) struct InterruptingOracle {
    pub cancel: Arc<AtomicBool>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl InterruptingOracle {
    pub fn new(cancel: Arc<AtomicBool>, fail: bool) -> Self {
        Self {
            cancel,
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FitnessOracle for InterruptingOracle {
    fn evaluate(&self, genotype: &Genotype, _precision: u32) -> Result<Vec<f64>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        if self.fail {
            return Err(OracleError::EmptyPhenotype);
        }
        Ok(vec![genotype.a as f64; 3])
    }
}

/// A valid design whose first locus is `a`.
pub(crate) fn design(a: i64) -> Genotype {
    Genotype {
        a,
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
