//! Streaming QFI and stress-energy on a small lattice.
//!
//! Shows that the streamed quantities never need the dense 2^N × 2^N
//! operators: a random state and the L=2 ground state are pushed through
//! the QFI and stress-energy engines, and the sparse storage is compared
//! against what the dense operators would occupy.
//!
//! Run: `cargo run --example streaming_demo --release`

use std::time::Instant;

use anyhow::Result;
use qfi_einstein::{
    build_generators, build_hamiltonian, compute_qfi, compute_stress_energy, geometry_from_metric,
    ground_state, Lattice, QuantumState, StressSummary, DEFAULT_REGULARIZATION,
};
use tracing_subscriber::EnvFilter;

const L: usize = 2;
const J: f64 = 1.0;
const H: f64 = 1.0;

fn section(title: &str) {
    println!("\n══════════════════════════════════════════════════════════");
    println!("{title}");
    println!("══════════════════════════════════════════════════════════");
}

fn report(label: &str, lattice: &Lattice, psi: &QuantumState) -> Result<()> {
    let generators = build_generators(lattice)?;
    let t0 = Instant::now();
    let (f, g) = compute_qfi(psi, &generators, DEFAULT_REGULARIZATION)?;
    let qfi_ms = t0.elapsed().as_secs_f64() * 1e3;

    let t = compute_stress_energy(psi, lattice, J, H, None)?;
    let summary = StressSummary::of(&t);
    let geo = geometry_from_metric(&g)?;

    println!("\n  --- {label} ---");
    println!("  ‖ψ‖              = {:.6}", psi.norm());
    println!("  diag F           = {:?}", f.diagonal().iter().map(|v| format!("{v:.4}")).collect::<Vec<_>>());
    println!("  Tr F             = {:.6}", f.trace());
    println!("  ‖F‖_F            = {:.6}", f.norm());
    println!("  QFI time         = {qfi_ms:.2} ms");
    println!("  T                = {:?}", t.iter().map(|v| format!("{v:.4}")).collect::<Vec<_>>());
    println!("  mean / Σ / ‖T‖   = {:.6} / {:.6} / {:.6}", summary.mean, summary.total, summary.norm);
    println!("  Ricci scalar     = {:.6}", geo.ricci_scalar);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Streaming QFI / stress-energy demonstration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");

    let lattice = Lattice::new(L)?;
    let n = lattice.n_sites();
    let dim = lattice.hilbert_dim();
    println!("\n  L={L}: {n} sites, Hilbert dim 2^{n} = {dim}, {} bonds", lattice.bonds().len());

    section("1 — Random state (seed 42)");
    let random = QuantumState::random(n, 42)?;
    report("random", &lattice, &random)?;

    section("2 — Ground state (J=1, h=1)");
    let ham = build_hamiltonian(&lattice, J, H, None)?;
    let (e0, ground) = ground_state(&ham, 1)?;
    println!("  E₀ = {e0:.12}");
    report("ground", &lattice, &ground)?;

    section("3 — Memory");
    let generators = build_generators(&lattice)?;
    // value (16 B) + column index (8 B) per nonzero, plus row pointers
    let sparse_bytes: usize = generators
        .iter()
        .map(|g| g.nnz() * 24 + (g.dim() + 1) * 8)
        .sum::<usize>()
        + ham.nnz() * 24
        + (dim + 1) * 8;
    let dense_bytes = (n + 1) * dim * dim * 16;
    println!("  sparse generators + H : {sparse_bytes:>10} B");
    println!("  dense  generators + H : {dense_bytes:>10} B");
    println!("  ratio                 : {:>10.1}×", dense_bytes as f64 / sparse_bytes as f64);
    println!("  QFI working set       : 4 vectors of {dim} amplitudes per worker");

    Ok(())
}
