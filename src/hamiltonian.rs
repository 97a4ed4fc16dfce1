//! Transverse-field Ising Hamiltonian on the square lattice.
//!
//! ```text
//! H = −J Σ_⟨ab⟩ σᶻ_a σᶻ_b − Σ_i (h + δh_i) σˣ_i
//! ```
//!
//! ## Bond accounting
//!
//! Two conventions exist and must not be mixed:
//!
//! - **Full system** ([`build_hamiltonian`]): every bond enters once with
//!   weight −J.
//! - **Local density** ([`build_local_hamiltonian`]): site i owns its field
//!   term plus *half* of each incident bond, so that Σᵢ Hᵢ reproduces the
//!   full bond+field operator (at δh = 0) with every bond counted once
//!   across its two endpoints. This is the stress-energy convention.
//!
//! [`BondShare::Full`] gives each site the whole of every incident bond
//! instead; summing those densities double-counts bonds. It is kept for
//! comparison against the unhalved local energy.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lattice::Lattice;
use crate::operator::{build_operator, Pauli, SparseOperator};

/// How much of an incident bond a local density owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondShare {
    Full,
    Half,
}

impl BondShare {
    pub fn weight(self) -> f64 {
        match self {
            BondShare::Full => 1.0,
            BondShare::Half => 0.5,
        }
    }
}

fn check_finite(name: &'static str, v: f64) -> Result<()> {
    if !v.is_finite() {
        return Err(Error::invalid(name, format!("{v} is not finite")));
    }
    Ok(())
}

fn zz_bond(n_sites: usize, a: usize, b: usize) -> Result<SparseOperator> {
    build_operator(n_sites, &[(a, Pauli::Z), (b, Pauli::Z)])
}

/// Full Hamiltonian. `delta_h = None` is the unperturbed baseline.
pub fn build_hamiltonian(
    lattice: &Lattice,
    j: f64,
    h: f64,
    delta_h: Option<&[f64]>,
) -> Result<SparseOperator> {
    check_finite("J", j)?;
    check_finite("h", h)?;
    let n = lattice.n_sites();
    if let Some(dh) = delta_h {
        if dh.len() != n {
            return Err(Error::LengthMismatch {
                what: "delta_h",
                expected: n,
                actual: dh.len(),
            });
        }
        if let Some(bad) = dh.iter().find(|v| !v.is_finite()) {
            return Err(Error::invalid("delta_h", format!("entry {bad} is not finite")));
        }
    }

    let mut ham = SparseOperator::zeros(lattice.hilbert_dim());
    for bond in lattice.bonds() {
        ham = ham.add_scaled(-j, &zz_bond(n, bond.a, bond.b)?)?;
    }
    for site in 0..n {
        let h_i = h + delta_h.map_or(0.0, |dh| dh[site]);
        ham = ham.add_scaled(-h_i, &build_operator(n, &[(site, Pauli::X)])?)?;
    }
    Ok(ham)
}

/// Local energy density at `site` in the stress-energy convention:
/// −h σˣ_site − (J/2) Σ_{b ∋ site} σᶻσᶻ.
pub fn build_local_hamiltonian(lattice: &Lattice, j: f64, h: f64, site: usize) -> Result<SparseOperator> {
    build_local_hamiltonian_with(lattice, j, h, site, BondShare::Half)
}

pub fn build_local_hamiltonian_with(
    lattice: &Lattice,
    j: f64,
    h: f64,
    site: usize,
    share: BondShare,
) -> Result<SparseOperator> {
    check_finite("J", j)?;
    check_finite("h", h)?;
    let n = lattice.n_sites();
    let bonds = lattice.incident_bonds(site)?;

    let mut local = build_operator(n, &[(site, Pauli::X)])?.scaled(-h);
    for bond in bonds {
        local = local.add_scaled(-j * share.weight(), &zz_bond(n, bond.a, bond.b)?)?;
    }
    Ok(local)
}

/// Generators Gᵢ = ∂H/∂θᵢ = σˣᵢ, one per site.
pub fn build_generators(lattice: &Lattice) -> Result<Vec<SparseOperator>> {
    let n = lattice.n_sites();
    (0..n).map(|site| build_operator(n, &[(site, Pauli::X)])).collect()
}
