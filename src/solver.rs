//! Ground states of sparse Hermitian operators by restarted Lanczos.
//!
//! ## Method
//!
//! Krylov tridiagonalisation with full reorthogonalisation against every
//! stored Lanczos vector, then exact diagonalisation of the small m×m
//! tridiagonal T. A Ritz pair (θ, y) has residual estimate
//!
//! ```text
//! ‖H x − θ x‖ = |β_m · y_m|
//! ```
//!
//! where β_m is the norm of the last unnormalised Krylov vector. When the k
//! lowest Ritz pairs are not yet below tolerance, the sweep restarts from the
//! sum of their Ritz vectors. Only the operator's mat-vec is used; no dense
//! 2^N × 2^N matrix is ever formed.
//!
//! ## Failure
//!
//! Running out of restarts is fatal and reported as
//! [`Error::NonConvergence`] with the operator dimension, k, Krylov dimension
//! and last residual. A larger subspace is only tried when the caller sets
//! `retry_krylov_dim` and calls [`ground_state_with_retry`].

use std::time::{Duration, Instant};

use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::operator::SparseOperator;
use crate::state::{norm, vdot, QuantumState};
use crate::tolerances::{LANCZOS_BREAKDOWN, LANCZOS_RESIDUAL};

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanczosConfig {
    /// Krylov subspace dimension per sweep (capped at the operator dimension).
    pub krylov_dim: usize,
    /// Restarted sweeps allowed after the first.
    pub max_restarts: usize,
    /// Residual below which a Ritz pair counts as converged.
    pub tolerance: f64,
    /// Seed for the random start vector.
    pub seed: u64,
    /// Wall-clock budget for the whole solve, in seconds.
    pub time_budget_secs: Option<f64>,
    /// Subspace dimension for one explicit retry after non-convergence.
    pub retry_krylov_dim: Option<usize>,
}

impl Default for LanczosConfig {
    fn default() -> Self {
        Self {
            krylov_dim: 80,
            max_restarts: 20,
            tolerance: LANCZOS_RESIDUAL,
            seed: 0x5eed,
            time_budget_secs: None,
            retry_krylov_dim: None,
        }
    }
}

impl LanczosConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.krylov_dim < 2 {
            return Err(Error::invalid("krylov_dim", "must be at least 2"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::invalid("tolerance", format!("{} must be positive", self.tolerance)));
        }
        if let Some(secs) = self.time_budget_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(Error::invalid("time_budget_secs", format!("{secs} is not a valid duration")));
            }
        }
        if let Some(retry) = self.retry_krylov_dim {
            if retry <= self.krylov_dim {
                return Err(Error::invalid(
                    "retry_krylov_dim",
                    format!("{retry} must exceed krylov_dim={}", self.krylov_dim),
                ));
            }
        }
        Ok(())
    }
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Lowest eigenpair plus solver diagnostics.
#[derive(Debug, Clone)]
pub struct GroundState {
    pub energy: f64,
    pub state: QuantumState,
    /// The k lowest Ritz values of the final sweep, ascending.
    pub ritz_values: Vec<f64>,
    /// Total Lanczos steps over all sweeps.
    pub iterations: usize,
    pub restarts: usize,
    /// ‖H x − E x‖ of the returned state.
    pub residual: f64,
}

impl GroundState {
    /// First excitation gap, when k ≥ 2 pairs were requested.
    pub fn gap(&self) -> Option<f64> {
        self.ritz_values.get(1).map(|e1| e1 - self.energy)
    }
}

// ── Sweep internals ──────────────────────────────────────────────────────────

struct Deadline {
    start: Instant,
    budget: Option<Duration>,
    dim: usize,
}

impl Deadline {
    fn check(&self) -> Result<()> {
        if let Some(budget) = self.budget {
            let elapsed = self.start.elapsed();
            if elapsed >= budget {
                return Err(Error::SolverTimeout {
                    dim: self.dim,
                    elapsed,
                    budget,
                });
            }
        }
        Ok(())
    }
}

struct Sweep {
    alpha: Vec<f64>,
    /// beta[j] = ‖w‖ after step j; the last entry drives the residual estimate.
    beta: Vec<f64>,
    basis: Vec<Vec<Complex64>>,
}

fn axpy(a: Complex64, x: &[Complex64], y: &mut [Complex64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += a * xi;
    }
}

fn lanczos_sweep(op: &SparseOperator, start: Vec<Complex64>, m: usize, deadline: &Deadline) -> Result<Sweep> {
    let dim = op.dim();
    let mut alpha: Vec<f64> = Vec::with_capacity(m);
    let mut beta: Vec<f64> = Vec::with_capacity(m);
    let mut basis: Vec<Vec<Complex64>> = Vec::with_capacity(m);
    basis.push(start);
    let mut w = vec![Complex64::new(0.0, 0.0); dim];

    for j in 0..m {
        deadline.check()?;
        op.apply_into(&basis[j], &mut w)?;

        let a_j = vdot(&basis[j], &w).re;
        axpy(Complex64::new(-a_j, 0.0), &basis[j], &mut w);
        if j > 0 {
            axpy(Complex64::new(-beta[j - 1], 0.0), &basis[j - 1], &mut w);
        }
        alpha.push(a_j);

        // Two Gram-Schmidt passes against the whole basis.
        for _ in 0..2 {
            for v in &basis {
                let proj = vdot(v, &w);
                axpy(-proj, v, &mut w);
            }
        }

        let b_next = norm(&w);
        beta.push(b_next);
        if b_next < LANCZOS_BREAKDOWN || j + 1 == m {
            break;
        }
        basis.push(w.iter().map(|x| *x / b_next).collect());
    }

    Ok(Sweep { alpha, beta, basis })
}

fn random_start(dim: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut v: Vec<Complex64> = (0..dim)
        .map(|_| {
            let re: f64 = StandardNormal.sample(&mut rng);
            let im: f64 = StandardNormal.sample(&mut rng);
            Complex64::new(re, im)
        })
        .collect();
    let n = norm(&v);
    for x in &mut v {
        *x /= n;
    }
    v
}

fn ritz_vector(basis: &[Vec<Complex64>], coeffs: impl Iterator<Item = f64>) -> Vec<Complex64> {
    let mut x = vec![Complex64::new(0.0, 0.0); basis[0].len()];
    for (v, c) in basis.iter().zip(coeffs) {
        axpy(Complex64::new(c, 0.0), v, &mut x);
    }
    x
}

// ── Public solvers ───────────────────────────────────────────────────────────

/// Lowest eigenpair with default solver settings. `k` lowest Ritz pairs must
/// converge before the lowest is returned.
pub fn ground_state(op: &SparseOperator, k: usize) -> Result<(f64, QuantumState)> {
    let gs = ground_state_with(op, k, &LanczosConfig::default())?;
    Ok((gs.energy, gs.state))
}

pub fn ground_state_with(op: &SparseOperator, k: usize, cfg: &LanczosConfig) -> Result<GroundState> {
    cfg.validate()?;
    let dim = op.dim();
    if k == 0 || k > dim {
        return Err(Error::invalid("k", format!("{k} must be in 1..={dim}")));
    }
    let m = cfg.krylov_dim.min(dim);
    if m < k {
        return Err(Error::invalid(
            "krylov_dim",
            format!("{m} cannot hold k={k} Ritz pairs"),
        ));
    }
    let deadline = Deadline {
        start: Instant::now(),
        budget: cfg.time_budget(),
        dim,
    };

    let mut start = random_start(dim, cfg.seed);
    let mut iterations = 0usize;
    let mut last_residual = f64::INFINITY;

    for restart in 0..=cfg.max_restarts {
        let sweep = lanczos_sweep(op, start, m, &deadline)?;
        let steps = sweep.alpha.len();
        iterations += steps;

        let mut t = DMatrix::<f64>::zeros(steps, steps);
        for i in 0..steps {
            t[(i, i)] = sweep.alpha[i];
            if i + 1 < steps {
                t[(i, i + 1)] = sweep.beta[i];
                t[(i + 1, i)] = sweep.beta[i];
            }
        }
        let eig = SymmetricEigen::new(t);
        let mut order: Vec<usize> = (0..steps).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

        let beta_last = sweep.beta[steps - 1];
        let wanted = k.min(steps);
        let residual = order[..wanted]
            .iter()
            .map(|&c| (beta_last * eig.eigenvectors[(steps - 1, c)]).abs())
            .fold(0.0f64, f64::max);
        last_residual = if wanted < k { f64::INFINITY } else { residual };

        debug!(restart, steps, residual = last_residual, theta0 = eig.eigenvalues[order[0]], "lanczos sweep");

        if last_residual <= cfg.tolerance {
            let x = ritz_vector(&sweep.basis, eig.eigenvectors.column(order[0]).iter().copied());
            let state = QuantumState::from_amplitudes(x)?.with_canonical_phase();
            let hx = op.apply(state.amplitudes())?;
            let energy = vdot(state.amplitudes(), &hx).re;
            let true_residual = hx
                .iter()
                .zip(state.amplitudes())
                .map(|(a, b)| (*a - *b * energy).norm_sqr())
                .sum::<f64>()
                .sqrt();
            return Ok(GroundState {
                energy,
                state,
                ritz_values: order[..k].iter().map(|&c| eig.eigenvalues[c]).collect(),
                iterations,
                restarts: restart,
                residual: true_residual,
            });
        }

        // Restart from the sum of the wanted Ritz vectors; fall back to a
        // fresh random vector if the Krylov space was exhausted early.
        let mut next = vec![Complex64::new(0.0, 0.0); dim];
        for &c in &order[..wanted] {
            let rv = ritz_vector(&sweep.basis, eig.eigenvectors.column(c).iter().copied());
            axpy(Complex64::new(1.0, 0.0), &rv, &mut next);
        }
        let n = norm(&next);
        start = if wanted < k || n < LANCZOS_BREAKDOWN {
            random_start(dim, cfg.seed.wrapping_add(restart as u64 + 1))
        } else {
            next.iter().map(|x| *x / n).collect()
        };
    }

    Err(Error::NonConvergence {
        dim,
        k,
        krylov_dim: m,
        restarts: cfg.max_restarts,
        residual: last_residual,
        tolerance: cfg.tolerance,
    })
}

/// [`ground_state_with`], retried once with `retry_krylov_dim` on
/// non-convergence. Without `retry_krylov_dim` this is a plain solve.
pub fn ground_state_with_retry(op: &SparseOperator, k: usize, cfg: &LanczosConfig) -> Result<GroundState> {
    match (ground_state_with(op, k, cfg), cfg.retry_krylov_dim) {
        (Err(err @ Error::NonConvergence { .. }), Some(enlarged)) => {
            warn!(%err, enlarged, "ground-state solve did not converge; retrying with enlarged subspace");
            let retry = LanczosConfig {
                krylov_dim: enlarged,
                retry_krylov_dim: None,
                ..cfg.clone()
            };
            ground_state_with(op, k, &retry)
        }
        (result, _) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::build_hamiltonian;
    use crate::lattice::Lattice;
    use crate::operator::{build_operator, Pauli};

    /// Dense Hermitian diagonalisation, reference only.
    fn dense_spectrum(op: &SparseOperator) -> (Vec<f64>, Vec<Complex64>) {
        let eig = SymmetricEigen::new(op.to_dense().unwrap());
        let mut order: Vec<usize> = (0..op.dim()).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
        let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
        let ground = eig.eigenvectors.column(order[0]).iter().copied().collect();
        (values, ground)
    }

    #[test]
    fn single_spin_in_transverse_field() {
        let op = build_operator(1, &[(0, Pauli::X)]).unwrap().scaled(-1.0);
        let (e, psi) = ground_state(&op, 1).unwrap();
        assert!((e + 1.0).abs() < 1e-12, "E0 = {e}, expected −1");
        let amp = std::f64::consts::FRAC_1_SQRT_2;
        for a in psi.amplitudes() {
            assert!((a - Complex64::new(amp, 0.0)).norm() < 1e-10, "amplitude {a}");
        }
    }

    #[test]
    fn tfim_l2_matches_dense_diagonalisation() {
        let lat = Lattice::new(2).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 1.0, None).unwrap();
        let gs = ground_state_with(&op, 2, &LanczosConfig::default()).unwrap();
        let (exact, exact_vec) = dense_spectrum(&op);
        let exact_state = QuantumState::from_amplitudes(exact_vec).unwrap();

        println!("L=2 TFIM: Lanczos E0={:.12} dense E0={:.12} gap={:?}", gs.energy, exact[0], gs.gap());
        assert!((gs.energy - exact[0]).abs() < 1e-10);
        assert!((gs.ritz_values[1] - exact[1]).abs() < 1e-8);
        assert!((gs.state.norm() - 1.0).abs() < 1e-12);
        assert!(gs.state.fidelity(&exact_state) > 1.0 - 1e-10);
        assert!(gs.residual < 1e-8, "true residual {:.2e}", gs.residual);
    }

    #[test]
    fn tfim_l3_converges_with_restarts() {
        let lat = Lattice::new(3).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 3.5, None).unwrap();
        let cfg = LanczosConfig {
            krylov_dim: 40,
            ..LanczosConfig::default()
        };
        let gs = ground_state_with(&op, 1, &cfg).unwrap();
        let (exact, _) = dense_spectrum(&op);
        println!(
            "L=3 TFIM: E0={:.10} (dense {:.10}), {} steps, {} restarts",
            gs.energy, exact[0], gs.iterations, gs.restarts
        );
        assert!((gs.energy - exact[0]).abs() < 1e-9);
    }

    #[test]
    fn non_convergence_reports_context() {
        let lat = Lattice::new(2).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 1.0, None).unwrap();
        let cfg = LanczosConfig {
            krylov_dim: 2,
            max_restarts: 0,
            ..LanczosConfig::default()
        };
        match ground_state_with(&op, 1, &cfg) {
            Err(Error::NonConvergence { dim, k, krylov_dim, .. }) => {
                assert_eq!((dim, k, krylov_dim), (16, 1, 2));
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn explicit_retry_enlarges_subspace() {
        let lat = Lattice::new(2).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 1.0, None).unwrap();
        let cfg = LanczosConfig {
            krylov_dim: 2,
            max_restarts: 0,
            retry_krylov_dim: Some(16),
            ..LanczosConfig::default()
        };
        let gs = ground_state_with_retry(&op, 1, &cfg).unwrap();
        let (exact, _) = dense_spectrum(&op);
        assert!((gs.energy - exact[0]).abs() < 1e-10);
    }

    #[test]
    fn zero_time_budget_times_out() {
        let lat = Lattice::new(2).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 1.0, None).unwrap();
        let cfg = LanczosConfig {
            time_budget_secs: Some(0.0),
            ..LanczosConfig::default()
        };
        assert!(matches!(
            ground_state_with(&op, 1, &cfg),
            Err(Error::SolverTimeout { dim: 16, .. })
        ));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let op = build_operator(2, &[(0, Pauli::Z)]).unwrap();
        assert!(ground_state(&op, 0).is_err());
        assert!(ground_state(&op, 5).is_err());
        let bad = LanczosConfig {
            tolerance: -1.0,
            ..LanczosConfig::default()
        };
        assert!(ground_state_with(&op, 1, &bad).is_err());
    }

    #[test]
    fn solve_is_deterministic() {
        let lat = Lattice::new(2).unwrap();
        let op = build_hamiltonian(&lat, 1.0, 1.0, Some(&[0.1, 0.0, 0.3, 0.2])).unwrap();
        let (e1, s1) = ground_state(&op, 1).unwrap();
        let (e2, s2) = ground_state(&op, 1).unwrap();
        assert_eq!(e1.to_bits(), e2.to_bits());
        assert_eq!(s1, s2);
    }
}
