//! Unit-norm state vectors on the 2^N-dimensional spin Hilbert space.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{Error, Result};
use crate::tolerances::{MAX_SITES, RATIO_EPS};

/// ⟨a|b⟩ = Σ conj(aᵢ)·bᵢ.
pub fn vdot(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

pub fn norm(v: &[Complex64]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// A normalised complex amplitude vector. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumState {
    amplitudes: Vec<Complex64>,
}

impl QuantumState {
    /// Normalise `amplitudes` to unit norm. The length must be a power of two.
    pub fn from_amplitudes(mut amplitudes: Vec<Complex64>) -> Result<Self> {
        let dim = amplitudes.len();
        if dim == 0 || !dim.is_power_of_two() {
            return Err(Error::invalid(
                "state",
                format!("length {dim} is not a power of two"),
            ));
        }
        let n = norm(&amplitudes);
        if !n.is_finite() || n < RATIO_EPS {
            return Err(Error::IllConditioned {
                quantity: "state norm",
                denominator: n,
            });
        }
        for a in &mut amplitudes {
            *a /= n;
        }
        Ok(Self { amplitudes })
    }

    /// Gaussian random state on `n_sites` spins, reproducible from `seed`.
    pub fn random(n_sites: usize, seed: u64) -> Result<Self> {
        if n_sites > MAX_SITES {
            return Err(Error::invalid(
                "n_sites",
                format!("{n_sites} exceeds the {MAX_SITES}-site limit"),
            ));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let amps = (0..1usize << n_sites)
            .map(|_| {
                let re: f64 = StandardNormal.sample(&mut rng);
                let im: f64 = StandardNormal.sample(&mut rng);
                Complex64::new(re, im)
            })
            .collect();
        Self::from_amplitudes(amps)
    }

    /// Rotate the global phase so the largest-magnitude amplitude is real
    /// and positive. Ties resolve to the lowest index.
    pub fn with_canonical_phase(mut self) -> Self {
        let mut best = 0usize;
        let mut best_mag = -1.0f64;
        for (i, a) in self.amplitudes.iter().enumerate() {
            let m = a.norm_sqr();
            if m > best_mag * (1.0 + 1e-12) {
                best = i;
                best_mag = m;
            }
        }
        let pivot = self.amplitudes[best];
        if pivot.norm() > 0.0 {
            let phase = pivot.conj() / pivot.norm();
            for a in &mut self.amplitudes {
                *a *= phase;
            }
        }
        self
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn n_sites(&self) -> usize {
        self.amplitudes.len().trailing_zeros() as usize
    }

    pub fn norm(&self) -> f64 {
        norm(&self.amplitudes)
    }

    pub fn inner(&self, other: &QuantumState) -> Complex64 {
        vdot(&self.amplitudes, &other.amplitudes)
    }

    /// |⟨self|other⟩|².
    pub fn fidelity(&self, other: &QuantumState) -> f64 {
        self.inner(other).norm_sqr()
    }
}
