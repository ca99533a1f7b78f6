//! Genotype representation for the daylighting design space.
//!
//! A genotype is a fixed record of nine integer loci (`a`..`i`, millimetres or
//! degrees depending on the locus) and two boolean loci (`j`, `k`, glazing
//! switches). Only genotypes satisfying the linear constraints in
//! [`Genotype::check_constraints`] describe buildable designs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound for locus `h`.
pub const H_MIN: i64 = 15;
/// Upper bound for locus `h`.
pub const H_MAX: i64 = 345;
/// Upper bound for locus `b`.
pub const B_MAX: i64 = 955;
/// Maximum allowed `i - b`.
pub const I_SPAN_MAX: i64 = 845;
/// Minimum clearance in `g + d + CLEARANCE <= c + e + f`.
pub const CLEARANCE: i64 = 300;

/// Identifies one locus of the genotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locus {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
}

/// Value type carried by a locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocusKind {
    Integer,
    Boolean,
}

impl Locus {
    /// Number of loci.
    pub const COUNT: usize = 11;

    /// All loci in declaration order.
    pub const ALL: [Locus; Locus::COUNT] = [
        Locus::A,
        Locus::B,
        Locus::C,
        Locus::D,
        Locus::E,
        Locus::F,
        Locus::G,
        Locus::H,
        Locus::I,
        Locus::J,
        Locus::K,
    ];

    /// Name used in definitions and reports.
    pub fn name(self) -> &'static str {
        match self {
            Locus::A => "a",
            Locus::B => "b",
            Locus::C => "c",
            Locus::D => "d",
            Locus::E => "e",
            Locus::F => "f",
            Locus::G => "g",
            Locus::H => "h",
            Locus::I => "i",
            Locus::J => "j",
            Locus::K => "k",
        }
    }

    pub fn kind(self) -> LocusKind {
        match self {
            Locus::J | Locus::K => LocusKind::Boolean,
            _ => LocusKind::Integer,
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value held at a single locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allele {
    Int(i64),
    Bool(bool),
}

impl Allele {
    /// Numeric view used for statistics; booleans map to 0/1.
    pub fn as_f64(self) -> f64 {
        match self {
            Allele::Int(v) => v as f64,
            Allele::Bool(true) => 1.0,
            Allele::Bool(false) => 0.0,
        }
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allele::Int(v) => write!(f, "{}", v),
            Allele::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A single violated design constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error("Locus {locus} must be non-negative, got {value}")]
    Negative { locus: Locus, value: i64 },
    #[error("Locus h must be at least 15, got {0}")]
    HTooSmall(i64),
    #[error("Locus h must be at most 345, got {0}")]
    HTooLarge(i64),
    #[error("Locus b must be at most 955, got {0}")]
    BTooLarge(i64),
    #[error("i - b must be at most 845, got {0}")]
    SpanTooLarge(i64),
    #[error("g + d + 300 ({required}) exceeds c + e + f ({available})")]
    InsufficientClearance { required: i64, available: i64 },
}

/// Geometric quantities derived from a genotype, reported alongside fitness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DesignMetrics {
    /// Bounding-box volume in litres.
    pub bounding_volume: f64,
    /// Glazed area in dm².
    pub glass_area: f64,
}

/// The parameter vector under optimization.
///
/// Created by randomization, mutation or crossover (see
/// [`GenotypeRng`](crate::compute::evolution::GenotypeRng)). The default value
/// is all-zero/false and is *not* valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Genotype {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
    pub f: i64,
    pub g: i64,
    pub h: i64,
    pub i: i64,
    pub j: bool,
    pub k: bool,
}

impl Genotype {
    /// Read a locus.
    pub fn get(&self, locus: Locus) -> Allele {
        match locus {
            Locus::A => Allele::Int(self.a),
            Locus::B => Allele::Int(self.b),
            Locus::C => Allele::Int(self.c),
            Locus::D => Allele::Int(self.d),
            Locus::E => Allele::Int(self.e),
            Locus::F => Allele::Int(self.f),
            Locus::G => Allele::Int(self.g),
            Locus::H => Allele::Int(self.h),
            Locus::I => Allele::Int(self.i),
            Locus::J => Allele::Bool(self.j),
            Locus::K => Allele::Bool(self.k),
        }
    }

    /// Write a locus. Alleles of the wrong kind are ignored.
    pub fn set(&mut self, locus: Locus, allele: Allele) {
        match (locus, allele) {
            (Locus::A, Allele::Int(v)) => self.a = v,
            (Locus::B, Allele::Int(v)) => self.b = v,
            (Locus::C, Allele::Int(v)) => self.c = v,
            (Locus::D, Allele::Int(v)) => self.d = v,
            (Locus::E, Allele::Int(v)) => self.e = v,
            (Locus::F, Allele::Int(v)) => self.f = v,
            (Locus::G, Allele::Int(v)) => self.g = v,
            (Locus::H, Allele::Int(v)) => self.h = v,
            (Locus::I, Allele::Int(v)) => self.i = v,
            (Locus::J, Allele::Bool(v)) => self.j = v,
            (Locus::K, Allele::Bool(v)) => self.k = v,
            (locus, allele) => {
                log::warn!("Ignoring {:?} allele {} for locus {}", locus.kind(), allele, locus)
            }
        }
    }

    /// All violated constraints, in a fixed order.
    pub fn violations(&self) -> Vec<ConstraintViolation> {
        let mut out = Vec::new();

        for locus in [
            Locus::A,
            Locus::B,
            Locus::C,
            Locus::D,
            Locus::E,
            Locus::F,
            Locus::G,
            Locus::I,
        ] {
            if let Allele::Int(value) = self.get(locus)
                && value < 0
            {
                out.push(ConstraintViolation::Negative { locus, value });
            }
        }
        if self.h < H_MIN {
            out.push(ConstraintViolation::HTooSmall(self.h));
        }
        if self.h > H_MAX {
            out.push(ConstraintViolation::HTooLarge(self.h));
        }
        if self.b > B_MAX {
            out.push(ConstraintViolation::BTooLarge(self.b));
        }
        if self.i - self.b > I_SPAN_MAX {
            out.push(ConstraintViolation::SpanTooLarge(self.i - self.b));
        }
        let required = self.g + self.d + CLEARANCE;
        let available = self.c + self.e + self.f;
        if required > available {
            out.push(ConstraintViolation::InsufficientClearance {
                required,
                available,
            });
        }

        out
    }

    /// Check all design constraints, returning the first violation.
    pub fn check_constraints(&self) -> Result<(), ConstraintViolation> {
        match self.violations().into_iter().next() {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }

    /// True when every constraint holds.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.check_constraints().is_ok()
    }

    /// Render as `name=value` definitions in locus order.
    pub fn to_definition_args(&self) -> Vec<String> {
        Locus::ALL
            .iter()
            .map(|&locus| format!("{}={}", locus.name(), self.get(locus)))
            .collect()
    }

    /// Canonical string encoding, unique per genotype.
    ///
    /// Used for deduplication and as the evaluation cache key.
    pub fn encode(&self) -> String {
        Locus::ALL
            .iter()
            .map(|&locus| self.get(locus).to_string())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Bounding volume and glazed area of the design.
    pub fn design_metrics(&self) -> DesignMetrics {
        let width = (self.a + self.c + self.e + self.f) as f64;
        let height = (245 + 600 + self.b) as f64;

        let bounding_volume = (width + 60.0) * (height + 60.0) * (990.0 + 60.0) / 1000.0;

        let mut glass_area = 0.0;
        if self.j {
            glass_area += width * 990.0 / 100.0;
        }
        if self.k {
            let dx = (self.c - self.d).abs() as f64;
            glass_area += (dx * dx + height * height).sqrt() * 990.0 / 100.0;
        }

        DesignMetrics {
            bounding_volume,
            glass_area,
        }
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
