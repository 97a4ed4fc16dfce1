//! Sparse operators on the N-spin Hilbert space.
//!
//! ## Construction
//!
//! Every many-body operator here is an ordered Kronecker product of N one-site
//! factors, site 0 leftmost (most significant bit of the basis index):
//!
//! ```text
//! O = P₀ ⊗ P₁ ⊗ … ⊗ P_{N−1},   Pₖ ∈ {I, X, Y, Z}
//! ```
//!
//! [`build_operator`] evaluates this as a pure fold over the factor list,
//! starting from the 1×1 identity. Each 2×2 Pauli factor has exactly two
//! nonzeros, so a product of N factors has exactly 2^N nonzeros: single-site
//! and two-site operators stay O(2^N), never O(4^N).
//!
//! ## Storage
//!
//! Compressed sparse rows with complex values. Rows are built in index order
//! and columns within a row are strictly increasing, so two builds from the
//! same inputs are bit-identical.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::state::{vdot, QuantumState};
use crate::tolerances::{DENSE_MAX_SITES, MAX_SITES, SPARSE_DROP};

// ── Pauli blocks ─────────────────────────────────────────────────────────────

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I_UNIT: Complex64 = Complex64::new(0.0, 1.0);

/// One-site 2×2 building blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    /// The two nonzeros `(row, col, value)` in row order.
    fn entries(self) -> [(usize, usize, Complex64); 2] {
        match self {
            Pauli::I => [(0, 0, ONE), (1, 1, ONE)],
            Pauli::X => [(0, 1, ONE), (1, 0, ONE)],
            Pauli::Y => [(0, 1, -I_UNIT), (1, 0, I_UNIT)],
            Pauli::Z => [(0, 0, ONE), (1, 1, -ONE)],
        }
    }
}

// ── CSR operator ─────────────────────────────────────────────────────────────

/// Square CSR matrix over ℂ. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseOperator {
    dim: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<Complex64>,
}

impl SparseOperator {
    pub fn identity(dim: usize) -> Self {
        Self {
            dim,
            row_ptr: (0..=dim).collect(),
            col_idx: (0..dim).collect(),
            values: vec![ONE; dim],
        }
    }

    /// The all-zero operator.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            row_ptr: vec![0; dim + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn pauli(p: Pauli) -> Self {
        let mut row_ptr = vec![0usize];
        let mut col_idx = Vec::with_capacity(2);
        let mut values = Vec::with_capacity(2);
        for (_, c, v) in p.entries() {
            col_idx.push(c);
            values.push(v);
            row_ptr.push(col_idx.len());
        }
        Self {
            dim: 2,
            row_ptr,
            col_idx,
            values,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Kronecker product `self ⊗ other`. Row and column order stay sorted.
    pub fn kron(&self, other: &SparseOperator) -> SparseOperator {
        let dim = self.dim * other.dim;
        let mut row_ptr = Vec::with_capacity(dim + 1);
        let mut col_idx = Vec::with_capacity(self.nnz() * other.nnz());
        let mut values = Vec::with_capacity(self.nnz() * other.nnz());
        row_ptr.push(0);
        for ra in 0..self.dim {
            let a_range = self.row_ptr[ra]..self.row_ptr[ra + 1];
            for rb in 0..other.dim {
                for ka in a_range.clone() {
                    let (ca, va) = (self.col_idx[ka], self.values[ka]);
                    for kb in other.row_ptr[rb]..other.row_ptr[rb + 1] {
                        col_idx.push(ca * other.dim + other.col_idx[kb]);
                        values.push(va * other.values[kb]);
                    }
                }
                row_ptr.push(col_idx.len());
            }
        }
        SparseOperator {
            dim,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// `c · self`.
    pub fn scaled(&self, c: f64) -> SparseOperator {
        SparseOperator {
            values: self.values.iter().map(|v| *v * c).collect(),
            ..self.clone()
        }
    }

    /// `self + c · other`, merging rows column by column.
    /// Entries that cancel below [`SPARSE_DROP`] are removed.
    pub fn add_scaled(&self, c: f64, other: &SparseOperator) -> Result<SparseOperator> {
        if self.dim != other.dim {
            return Err(Error::LengthMismatch {
                what: "operator dimension",
                expected: self.dim,
                actual: other.dim,
            });
        }
        let mut row_ptr = Vec::with_capacity(self.dim + 1);
        let mut col_idx = Vec::with_capacity(self.nnz() + other.nnz());
        let mut values = Vec::with_capacity(self.nnz() + other.nnz());
        row_ptr.push(0);

        for r in 0..self.dim {
            let (mut i, i_end) = (self.row_ptr[r], self.row_ptr[r + 1]);
            let (mut k, k_end) = (other.row_ptr[r], other.row_ptr[r + 1]);
            while i < i_end || k < k_end {
                let ci = if i < i_end { self.col_idx[i] } else { usize::MAX };
                let ck = if k < k_end { other.col_idx[k] } else { usize::MAX };
                if ci < ck {
                    push_nonzero(ci, self.values[i], &mut col_idx, &mut values);
                    i += 1;
                } else if ck < ci {
                    push_nonzero(ck, other.values[k] * c, &mut col_idx, &mut values);
                    k += 1;
                } else {
                    push_nonzero(ci, self.values[i] + other.values[k] * c, &mut col_idx, &mut values);
                    i += 1;
                    k += 1;
                }
            }
            row_ptr.push(col_idx.len());
        }

        Ok(SparseOperator {
            dim: self.dim,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// y = A·x. `x` and `y` must both have length `dim`.
    pub fn apply_into(&self, x: &[Complex64], y: &mut [Complex64]) -> Result<()> {
        if x.len() != self.dim || y.len() != self.dim {
            return Err(Error::DimensionMismatch {
                operator: self.dim,
                vector: if x.len() != self.dim { x.len() } else { y.len() },
            });
        }
        for (r, out) in y.iter_mut().enumerate() {
            let mut sum = ZERO;
            for k in self.row_ptr[r]..self.row_ptr[r + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            *out = sum;
        }
        Ok(())
    }

    pub fn apply(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        let mut y = vec![ZERO; self.dim];
        self.apply_into(x, &mut y)?;
        Ok(y)
    }

    /// ⟨ψ|A|ψ⟩ (complex in general).
    pub fn expectation_complex(&self, state: &QuantumState) -> Result<Complex64> {
        let a_psi = self.apply(state.amplitudes())?;
        Ok(vdot(state.amplitudes(), &a_psi))
    }

    /// Re ⟨ψ|A|ψ⟩, the expectation of a Hermitian observable.
    pub fn expectation(&self, state: &QuantumState) -> Result<f64> {
        Ok(self.expectation_complex(state)?.re)
    }

    /// Largest |A − A†| entry. Zero for Hermitian operators.
    pub fn hermiticity_defect(&self) -> f64 {
        let mut worst = 0.0f64;
        for r in 0..self.dim {
            for k in self.row_ptr[r]..self.row_ptr[r + 1] {
                let c = self.col_idx[k];
                let mirror = self.get(c, r);
                worst = worst.max((self.values[k] - mirror.conj()).norm());
            }
        }
        worst
    }

    /// Entry (r, c), zero if not stored.
    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        let cols = &self.col_idx[self.row_ptr[r]..self.row_ptr[r + 1]];
        match cols.binary_search(&c) {
            Ok(pos) => self.values[self.row_ptr[r] + pos],
            Err(_) => ZERO,
        }
    }

    /// Dense copy, for exact diagonalisation of small systems only.
    pub fn to_dense(&self) -> Result<DMatrix<Complex64>> {
        if self.dim > 1usize << DENSE_MAX_SITES {
            return Err(Error::invalid(
                "dense operator",
                format!("dimension {} exceeds dense limit 2^{DENSE_MAX_SITES}", self.dim),
            ));
        }
        let mut m = DMatrix::from_element(self.dim, self.dim, ZERO);
        for r in 0..self.dim {
            for k in self.row_ptr[r]..self.row_ptr[r + 1] {
                m[(r, self.col_idx[k])] = self.values[k];
            }
        }
        Ok(m)
    }
}

// ── Builders ─────────────────────────────────────────────────────────────────

fn push_nonzero(col: usize, v: Complex64, col_idx: &mut Vec<usize>, values: &mut Vec<Complex64>) {
    if v.norm() > SPARSE_DROP {
        col_idx.push(col);
        values.push(v);
    }
}

/// Operator on `n_sites` spins with `factors[site]` on the listed sites and
/// identity elsewhere. Sites must be distinct and in range.
pub fn build_operator(n_sites: usize, factors: &[(usize, Pauli)]) -> Result<SparseOperator> {
    if n_sites > MAX_SITES {
        return Err(Error::invalid(
            "n_sites",
            format!("{n_sites} exceeds the {MAX_SITES}-site limit"),
        ));
    }
    let mut per_site = vec![Pauli::I; n_sites];
    let mut seen = vec![false; n_sites];
    for &(site, p) in factors {
        if site >= n_sites {
            return Err(Error::SiteOutOfRange { site, n_sites });
        }
        if seen[site] {
            return Err(Error::invalid("factors", format!("site {site} listed twice")));
        }
        seen[site] = true;
        per_site[site] = p;
    }
    Ok(per_site
        .into_iter()
        .fold(SparseOperator::identity(1), |acc, p| acc.kron(&SparseOperator::pauli(p))))
}

/// Σ cₖ·Oₖ over a list of weighted terms on a common dimension.
pub fn linear_combination(dim: usize, terms: &[(f64, SparseOperator)]) -> Result<SparseOperator> {
    terms
        .iter()
        .try_fold(SparseOperator::zeros(dim), |acc, (c, op)| acc.add_scaled(*c, op))
}
