//! Numeric tolerances and epsilon guards used across the pipeline.
//!
//! Every ratio in the crate divides by a quantity compared against
//! [`RATIO_EPS`] first. Below it, the computation either clamps to a
//! documented bound or returns [`Error::IllConditioned`](crate::Error).

// ── Ratios and regularisation ────────────────────────────────────────────────

/// Denominator floor for ratio computations (fit slopes, R², δh/h).
pub const RATIO_EPS: f64 = 1e-12;

/// Default metric regularisation ε in g = F/4 + ε·I.
pub const DEFAULT_REGULARIZATION: f64 = 1e-6;

// ── Lanczos ──────────────────────────────────────────────────────────────────

/// Lanczos residual ‖H x − θ x‖ accepted as converged.
pub const LANCZOS_RESIDUAL: f64 = 1e-10;

/// Lanczos breakdown: β below this means the Krylov space is invariant.
pub const LANCZOS_BREAKDOWN: f64 = 1e-14;

// ── Sparse operators ─────────────────────────────────────────────────────────

/// Sparse entries with |value| below this are dropped when operators are summed.
pub const SPARSE_DROP: f64 = 1e-15;

// ── Cross-checks ─────────────────────────────────────────────────────────────

/// Fidelity |⟨ψ_lanczos|ψ_exact⟩|² required by the exact-diagonalisation cross-check.
pub const CROSS_CHECK_FIDELITY: f64 = 0.9999;

/// Absolute ground-energy agreement required by the cross-check.
pub const CROSS_CHECK_ENERGY: f64 = 1e-8;

/// Streaming vs dense reference agreement (absolute, per matrix entry).
pub const STREAMING_VS_DENSE: f64 = 1e-9;

// ── Regimes ──────────────────────────────────────────────────────────────────

/// Regime boundaries on mean δh / h.
pub const REGIME_LINEAR_MAX: f64 = 0.3;
pub const REGIME_GEOMETRIC_MAX: f64 = 0.7;

// ── System size ──────────────────────────────────────────────────────────────

/// Largest lattice (in sites) for which dense exact diagonalisation is allowed.
pub const DENSE_MAX_SITES: usize = 10;

/// Largest lattice (in sites) the sparse pipeline accepts: 2^16 amplitudes,
/// one Krylov basis of `krylov_dim` such vectors per solve.
pub const MAX_SITES: usize = 16;
