//! Emergent-gravity test on transverse-field Ising lattices.
//!
//! Builds the TFIM Hamiltonian on an L×L open lattice as a sparse operator,
//! solves baseline and perturbed ground states, streams the quantum Fisher
//! information and local energy densities from them, and regresses the
//! resulting discrete Einstein-tensor response against the stress-energy
//! response to extract a coupling κ.
//!
//! # Modules
//!
//! - [`lattice`]: L×L open grid, bonds to right/up neighbours
//! - [`state`]: unit-norm amplitude vectors
//! - [`operator`]: CSR Pauli strings via Kronecker folds
//! - [`hamiltonian`]: full TFIM, half-bond local densities, σˣ generators
//! - [`solver`]: restarted Lanczos ground states with wall-clock budget
//! - [`qfi`]: streaming QFI matrix F and metric g = F/4 + εI
//! - [`stress_energy`]: streaming Tᵢ = ⟨Hᵢ⟩
//! - [`geometry`]: trace/mean Ricci and Einstein diagonals
//! - [`fit`]: ΔG = κ ΔT + b (OLS or through the origin)
//! - [`regime`]: linear / geometric / breakdown
//! - [`cross_check`]: Lanczos vs dense exact diagonalisation
//! - [`validation`]: the staged end-to-end run and its JSON record
//! - [`config`]: run configuration
//!
//! # Running tests
//!
//! ```bash
//! cargo test --release -- --nocapture
//! ```

pub mod config;
pub mod cross_check;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod hamiltonian;
pub mod lattice;
pub mod operator;
pub mod qfi;
pub mod regime;
pub mod solver;
pub mod state;
pub mod stress_energy;
pub mod tolerances;
pub mod validation;

pub use config::{KappaBand, Perturbation, ValidationConfig};
pub use cross_check::{validate_against_exact, CrossCheck, CrossCheckOutcome};
pub use error::{Error, Result};
pub use fit::{fit, FitResult};
pub use geometry::{einstein_delta, geometry_from_metric, Geometry};
pub use hamiltonian::{build_generators, build_hamiltonian, build_local_hamiltonian, BondShare};
pub use lattice::{Bond, Lattice};
pub use operator::{build_operator, Pauli, SparseOperator};
pub use qfi::{compute_qfi, compute_qfi_for_sites, fidelity_qfi};
pub use regime::{classify_regime, Regime};
pub use solver::{ground_state, ground_state_with, GroundState, LanczosConfig};
pub use state::QuantumState;
pub use stress_energy::{compute_stress_energy, stress_energy_delta, StressSummary};
pub use tolerances::DEFAULT_REGULARIZATION;
pub use validation::{run_validation, ValidationRecord, ValidationRunner, ValidationStage};
