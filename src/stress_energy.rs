//! Streaming stress-energy: Tᵢ = ⟨ψ|Hᵢ|ψ⟩ with Hᵢ the half-bond local density.
//!
//! One local Hamiltonian is built and applied per site, then dropped. Sites are
//! independent and run on the rayon pool; each result lands in its own slot.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::hamiltonian::build_local_hamiltonian;
use crate::lattice::Lattice;
use crate::state::QuantumState;

/// Per-site energy densities. `sites = None` evaluates every site in order.
pub fn compute_stress_energy(
    state: &QuantumState,
    lattice: &Lattice,
    j: f64,
    h: f64,
    sites: Option<&[usize]>,
) -> Result<Vec<f64>> {
    if state.dim() != lattice.hilbert_dim() {
        return Err(Error::DimensionMismatch {
            operator: lattice.hilbert_dim(),
            vector: state.dim(),
        });
    }
    let all: Vec<usize>;
    let sites = match sites {
        Some(s) => s,
        None => {
            all = (0..lattice.n_sites()).collect();
            &all
        }
    };
    for &site in sites {
        lattice.check_site(site)?;
    }

    let t = sites
        .par_iter()
        .map(|&site| build_local_hamiltonian(lattice, j, h, site)?.expectation(state))
        .collect::<Result<Vec<f64>>>()?;

    debug!(sites = t.len(), total = t.iter().sum::<f64>(), "stress-energy computed");
    Ok(t)
}

/// ΔT = T(state1) − T(state0), elementwise.
pub fn stress_energy_delta(
    state0: &QuantumState,
    state1: &QuantumState,
    lattice: &Lattice,
    j: f64,
    h: f64,
    sites: Option<&[usize]>,
) -> Result<Vec<f64>> {
    let t0 = compute_stress_energy(state0, lattice, j, h, sites)?;
    let t1 = compute_stress_energy(state1, lattice, j, h, sites)?;
    Ok(t1.iter().zip(&t0).map(|(a, b)| a - b).collect())
}

/// Aggregate view of a stress-energy vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressSummary {
    pub mean: f64,
    pub total: f64,
    pub norm: f64,
}

impl StressSummary {
    pub fn of(t: &[f64]) -> Self {
        let total: f64 = t.iter().sum();
        let mean = if t.is_empty() { 0.0 } else { total / t.len() as f64 };
        let norm = t.iter().map(|v| v * v).sum::<f64>().sqrt();
        Self { mean, total, norm }
    }
}
