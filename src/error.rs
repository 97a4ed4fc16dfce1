//! Error taxonomy for the validation pipeline.
//!
//! Three families, matching how a run can go wrong:
//!
//! - **configuration**: bad lattice size, mismatched vector lengths, site
//!   indices out of range. Rejected before any numerical work starts.
//! - **convergence**: the Lanczos solver ran out of restarts or wall-clock
//!   budget. Fatal for the configuration; the error carries the operator
//!   dimension and solver parameters needed to reproduce it.
//! - **ill-conditioned ratios**: a denominator fell below
//!   [`RATIO_EPS`](crate::tolerances::RATIO_EPS) where no clamp is defined.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid lattice size L={l}: need L ≥ 1 and L² ≤ {} sites", crate::tolerances::MAX_SITES)]
    InvalidLatticeSize { l: usize },

    #[error("site index {site} out of range for lattice with {n_sites} sites")]
    SiteOutOfRange { site: usize, n_sites: usize },

    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("dimension mismatch: operator is {operator}×{operator}, vector has length {vector}")]
    DimensionMismatch { operator: usize, vector: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(
        "Lanczos did not converge: dim={dim}, k={k}, krylov_dim={krylov_dim}, \
         restarts={restarts}, residual={residual:.3e} > tolerance={tolerance:.1e}"
    )]
    NonConvergence {
        dim: usize,
        k: usize,
        krylov_dim: usize,
        restarts: usize,
        residual: f64,
        tolerance: f64,
    },

    #[error("ground-state solve exceeded its wall-clock budget: dim={dim}, elapsed={elapsed:?}, budget={budget:?}")]
    SolverTimeout {
        dim: usize,
        elapsed: Duration,
        budget: Duration,
    },

    #[error("ill-conditioned {quantity}: denominator {denominator:.3e} below epsilon")]
    IllConditioned {
        quantity: &'static str,
        denominator: f64,
    },

    #[error("cross-check failed at L={l}: fidelity={fidelity:.6}, |ΔE|={energy_error:.3e}")]
    CrossCheckFailed {
        l: usize,
        fidelity: f64,
        energy_error: f64,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// True for errors rejected up front, before any solve.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidLatticeSize { .. }
                | Error::SiteOutOfRange { .. }
                | Error::LengthMismatch { .. }
                | Error::DimensionMismatch { .. }
                | Error::InvalidParameter { .. }
                | Error::Config(_)
        )
    }
}
