//! Streaming quantum Fisher information.
//!
//! ## What is computed
//!
//! For a state |ψ⟩ and Hermitian generators Gᵢ:
//!
//! ```text
//! F_ij = 2 · ( ⟨{Gᵢ, Gⱼ}_s⟩ − ⟨Gᵢ⟩⟨Gⱼ⟩ ),   {A, B}_s = (AB + BA)/2
//! g    = F/4 + ε·I
//! ```
//!
//! ## Streaming
//!
//! Each element F_ij for j ≥ i needs four mat-vecs against |ψ⟩:
//! Gᵢψ, Gⱼψ, Gᵢ(Gⱼψ), Gⱼ(Gᵢψ). Nothing of size N × 2^N or 4^N is ever held;
//! memory is the two N×N outputs plus a handful of 2^N transients per worker.
//! The N(N+1)/2 elements are independent and evaluated on the rayon pool;
//! (i, j) and (j, i) are written from the same value, so F is exactly
//! symmetric and identical to a sequential evaluation.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::operator::SparseOperator;
use crate::state::{vdot, QuantumState};
use crate::tolerances::RATIO_EPS;

/// Single element F_ij.
pub fn qfi_element(state: &QuantumState, gen_i: &SparseOperator, gen_j: &SparseOperator) -> Result<f64> {
    let psi = state.amplitudes();
    let gi_psi = gen_i.apply(psi)?;
    let gj_psi = gen_j.apply(psi)?;
    let exp_i = vdot(psi, &gi_psi).re;
    let exp_j = vdot(psi, &gj_psi).re;

    let exp_ij = vdot(psi, &gen_i.apply(&gj_psi)?).re;
    let exp_ji = vdot(psi, &gen_j.apply(&gi_psi)?).re;

    let anticomm = 0.5 * (exp_ij + exp_ji);
    Ok(2.0 * (anticomm - exp_i * exp_j))
}

fn check_inputs(state: &QuantumState, generators: &[SparseOperator], regularization: f64) -> Result<()> {
    if generators.is_empty() {
        return Err(Error::invalid("generators", "at least one generator is required"));
    }
    if let Some(bad) = generators.iter().find(|g| g.dim() != state.dim()) {
        return Err(Error::DimensionMismatch {
            operator: bad.dim(),
            vector: state.dim(),
        });
    }
    if !(regularization.is_finite() && regularization >= 0.0) {
        return Err(Error::invalid(
            "regularization",
            format!("{regularization} must be finite and non-negative"),
        ));
    }
    Ok(())
}

/// F and g = F/4 + ε·I over all generators.
pub fn compute_qfi(
    state: &QuantumState,
    generators: &[SparseOperator],
    regularization: f64,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let sites: Vec<usize> = (0..generators.len()).collect();
    compute_qfi_for_sites(state, generators, &sites, regularization)
}

/// F and g restricted to `sites` (indices into `generators`), in the given order.
pub fn compute_qfi_for_sites(
    state: &QuantumState,
    generators: &[SparseOperator],
    sites: &[usize],
    regularization: f64,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    check_inputs(state, generators, regularization)?;
    if let Some(&site) = sites.iter().find(|&&s| s >= generators.len()) {
        return Err(Error::SiteOutOfRange {
            site,
            n_sites: generators.len(),
        });
    }

    let n = sites.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|a| (a..n).map(move |b| (a, b))).collect();
    let elements = pairs
        .par_iter()
        .map(|&(a, b)| {
            qfi_element(state, &generators[sites[a]], &generators[sites[b]]).map(|v| (a, b, v))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut fisher = DMatrix::<f64>::zeros(n, n);
    for (a, b, v) in elements {
        fisher[(a, b)] = v;
        fisher[(b, a)] = v;
    }
    let metric = &fisher / 4.0 + DMatrix::<f64>::identity(n, n) * regularization;

    debug!(sites = n, pairs = pairs.len(), trace_f = fisher.trace(), "qfi computed");
    Ok((fisher, metric))
}

/// Diagonal QFI from the fidelity of two displaced ground states:
/// F ≈ 2·(1 − |⟨ψ(θ+Δ)|ψ(θ−Δ)⟩|) / Δ².
pub fn fidelity_qfi(psi_plus: &QuantumState, psi_minus: &QuantumState, delta: f64) -> Result<f64> {
    if psi_plus.dim() != psi_minus.dim() {
        return Err(Error::LengthMismatch {
            what: "displaced states",
            expected: psi_plus.dim(),
            actual: psi_minus.dim(),
        });
    }
    if !delta.is_finite() || delta.abs() < RATIO_EPS {
        return Err(Error::IllConditioned {
            quantity: "finite-difference step",
            denominator: delta,
        });
    }
    let overlap = psi_plus.fidelity(psi_minus).sqrt();
    Ok(2.0 * (1.0 - overlap) / (delta * delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::{build_generators, build_hamiltonian};
    use crate::lattice::Lattice;
    use crate::solver::ground_state;
    use crate::tolerances::STREAMING_VS_DENSE;
    use nalgebra::{DVector, SymmetricEigen};
    use num_complex::Complex64;

    fn basis_state(n_sites: usize, index: usize) -> QuantumState {
        let mut amps = vec![Complex64::new(0.0, 0.0); 1 << n_sites];
        amps[index] = Complex64::new(1.0, 0.0);
        QuantumState::from_amplitudes(amps).unwrap()
    }

    /// Brute-force F from dense generator matrices.
    fn dense_qfi(state: &QuantumState, generators: &[SparseOperator]) -> DMatrix<f64> {
        let psi = DVector::from_column_slice(state.amplitudes());
        let dense: Vec<_> = generators.iter().map(|g| g.to_dense().unwrap()).collect();
        let n = generators.len();
        let expect = |m: &DMatrix<Complex64>| (psi.adjoint() * m * &psi)[(0, 0)].re;
        DMatrix::from_fn(n, n, |i, j| {
            let anti = (&dense[i] * &dense[j] + &dense[j] * &dense[i]) * Complex64::new(0.5, 0.0);
            2.0 * (expect(&anti) - expect(&dense[i]) * expect(&dense[j]))
        })
    }

    #[test]
    fn qfi_is_exactly_symmetric() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let psi = QuantumState::random(4, 42).unwrap();
        let (f, g) = compute_qfi(&psi, &gens, 1e-6).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(f[(i, j)].to_bits(), f[(j, i)].to_bits(), "F[{i},{j}] ≠ F[{j},{i}]");
                assert_eq!(g[(i, j)].to_bits(), g[(j, i)].to_bits());
            }
        }
    }

    #[test]
    fn streaming_matches_dense_reference() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let random = QuantumState::random(4, 42).unwrap();
        let ham = build_hamiltonian(&lat, 1.0, 1.0, Some(&[0.2, 0.0, 0.5, 0.1])).unwrap();
        let (_, ground) = ground_state(&ham, 1).unwrap();

        for (label, psi) in [("random", &random), ("ground", &ground)] {
            let (f, _) = compute_qfi(psi, &gens, 1e-6).unwrap();
            let reference = dense_qfi(psi, &gens);
            let worst = (&f - &reference).abs().max();
            println!("{label}: max |F_stream − F_dense| = {worst:.3e}, Tr F = {:.6}", f.trace());
            assert!(worst < STREAMING_VS_DENSE, "{label}: deviation {worst:.3e}");
        }
    }

    #[test]
    fn metric_is_positive_definite() {
        let eps = 1e-6;
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        for seed in 0..5 {
            let psi = QuantumState::random(4, seed).unwrap();
            let (_, g) = compute_qfi(&psi, &gens, eps).unwrap();
            let min_eig = SymmetricEigen::new(g).eigenvalues.min();
            assert!(
                min_eig >= eps * (1.0 - 1e-6),
                "seed {seed}: λ_min(g) = {min_eig:.3e} < ε = {eps:.1e}"
            );
        }
    }

    /// |0…0⟩ is a σᶻ product state: ⟨σˣᵢ⟩ = 0, ⟨σˣᵢσˣⱼ⟩ = δᵢⱼ, so F = 2·I.
    #[test]
    fn z_product_state_has_diagonal_qfi() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let (f, g) = compute_qfi(&basis_state(4, 0), &gens, 0.0).unwrap();
        assert_eq!(f, DMatrix::<f64>::identity(4, 4) * 2.0);
        assert_eq!(g, DMatrix::<f64>::identity(4, 4) * 0.5);
    }

    /// |+…+⟩ is a σˣ eigenstate: every generator has zero variance.
    #[test]
    fn x_eigenstate_has_vanishing_qfi() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let plus = QuantumState::from_amplitudes(vec![Complex64::new(1.0, 0.0); 16]).unwrap();
        let (f, _) = compute_qfi(&plus, &gens, 1e-6).unwrap();
        assert!(f.abs().max() < 1e-14, "max |F| = {:.3e}", f.abs().max());
    }

    #[test]
    fn site_subset_matches_full_block() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let psi = QuantumState::random(4, 3).unwrap();
        let (full, _) = compute_qfi(&psi, &gens, 1e-6).unwrap();
        let (sub, _) = compute_qfi_for_sites(&psi, &gens, &[1, 3], 1e-6).unwrap();
        assert_eq!(sub[(0, 0)], full[(1, 1)]);
        assert_eq!(sub[(0, 1)], full[(1, 3)]);
        assert_eq!(sub[(1, 1)], full[(3, 3)]);
        assert!(compute_qfi_for_sites(&psi, &gens, &[4], 1e-6).is_err());
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let lat = Lattice::new(2).unwrap();
        let gens = build_generators(&lat).unwrap();
        let small = QuantumState::random(2, 1).unwrap();
        assert!(matches!(
            compute_qfi(&small, &gens, 1e-6),
            Err(Error::DimensionMismatch { operator: 16, vector: 4 })
        ));
        let psi = QuantumState::random(4, 1).unwrap();
        assert!(compute_qfi(&psi, &gens, -1.0).is_err());
        assert!(compute_qfi(&psi, &[], 1e-6).is_err());
    }

    #[test]
    fn fidelity_qfi_limits() {
        let psi = QuantumState::random(3, 9).unwrap();
        assert!(fidelity_qfi(&psi, &psi, 0.01).unwrap().abs() < 1e-10);
        let other = QuantumState::random(3, 10).unwrap();
        assert!(fidelity_qfi(&psi, &other, 0.01).unwrap() > 0.0);
        assert!(matches!(
            fidelity_qfi(&psi, &other, 0.0),
            Err(Error::IllConditioned { .. })
        ));
    }
}
