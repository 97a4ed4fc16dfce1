//! End-to-end Einstein-relation validation for one configuration.
//!
//! ## Stages
//!
//! ```text
//! Init → BaselineSolve → PerturbedSolve → QfiComputed → StressComputed
//!      → GeometryComputed → Fitted → Reported
//! ```
//!
//! Each transition is one forward step; there is no retry edge. A failure at
//! any stage jumps straight to `Reported` with the error in the record and no
//! measurement fields, so a failed run never emits a partial κ.
//!
//! The baseline (δh = 0) and perturbed branches are independent up to the
//! ground-state solve and may run concurrently (`parallel_branches`); the
//! recorded stage order is the same either way.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::{KappaBand, ValidationConfig};
use crate::cross_check::{validate_against_exact, CrossCheck, CrossCheckOutcome};
use crate::error::Result;
use crate::fit::fit;
use crate::geometry::{einstein_delta, geometry_from_metric};
use crate::hamiltonian::{build_generators, build_hamiltonian};
use crate::lattice::Lattice;
use crate::qfi::compute_qfi;
use crate::regime::{activation, classify_regime, Regime};
use crate::solver::{ground_state_with_retry, GroundState, LanczosConfig};
use crate::stress_energy::compute_stress_energy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Init,
    BaselineSolve,
    PerturbedSolve,
    QfiComputed,
    StressComputed,
    GeometryComputed,
    Fitted,
    Reported,
}

impl ValidationStage {
    pub fn next(self) -> Option<Self> {
        use ValidationStage::*;
        match self {
            Init => Some(BaselineSolve),
            BaselineSolve => Some(PerturbedSolve),
            PerturbedSolve => Some(QfiComputed),
            QfiComputed => Some(StressComputed),
            StressComputed => Some(GeometryComputed),
            GeometryComputed => Some(Fitted),
            Fitted => Some(Reported),
            Reported => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ValidationStage::Reported
    }
}

/// Fit output of a successful run. Field names are the record's JSON keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub kappa: f64,
    #[serde(rename = "R2")]
    pub r_squared: f64,
    pub intercept: f64,
    pub regime: Regime,
    #[serde(rename = "E_0")]
    pub e0: f64,
    #[serde(rename = "E_1")]
    pub e1: f64,
    #[serde(rename = "delta_E")]
    pub delta_e: f64,
    #[serde(rename = "norm_delta_G")]
    pub norm_delta_g: f64,
    #[serde(rename = "norm_delta_T")]
    pub norm_delta_t: f64,
}

/// Solver and pipeline diagnostics, filled in as stages complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub n_sites: usize,
    pub hilbert_dim: usize,
    pub nnz_baseline: Option<usize>,
    pub nnz_perturbed: Option<usize>,
    pub iterations_baseline: Option<usize>,
    pub iterations_perturbed: Option<usize>,
    pub residual_baseline: Option<f64>,
    pub residual_perturbed: Option<f64>,
    pub trace_f_baseline: Option<f64>,
    pub trace_f_perturbed: Option<f64>,
    pub activation: Option<f64>,
    pub kappa_band: Option<KappaBand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    pub seed: u64,
    pub delta_h: f64,
    #[serde(rename = "L")]
    pub l: usize,
    #[serde(flatten)]
    pub measurement: Option<Measurement>,
    pub success: bool,
    pub timestamp: String,
    pub runtime_seconds: f64,
    pub error: Option<String>,
    /// Last stage completed before a failure.
    pub failed_after: Option<ValidationStage>,
    pub stage: ValidationStage,
    pub cross_check: CrossCheckOutcome,
    pub diagnostics: Option<Diagnostics>,
}

/// One ground-state branch: its Hamiltonian's size and the solved state.
#[derive(Debug, Clone)]
pub struct Branch {
    pub hamiltonian_nnz: usize,
    pub ground: GroundState,
}

pub fn solve_branch(
    lattice: &Lattice,
    j: f64,
    h: f64,
    delta_h: Option<&[f64]>,
    solver: &LanczosConfig,
) -> Result<Branch> {
    let ham = build_hamiltonian(lattice, j, h, delta_h)?;
    let ground = ground_state_with_retry(&ham, 1, solver)?;
    Ok(Branch {
        hamiltonian_nnz: ham.nnz(),
        ground,
    })
}

fn l2(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub struct ValidationRunner<'a> {
    config: &'a ValidationConfig,
    stage: ValidationStage,
    cross_check: Option<CrossCheck>,
    diagnostics: Option<Diagnostics>,
    started: Instant,
}

impl<'a> ValidationRunner<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self {
            config,
            stage: ValidationStage::Init,
            cross_check: None,
            diagnostics: None,
            started: Instant::now(),
        }
    }

    pub fn stage(&self) -> ValidationStage {
        self.stage
    }

    fn advance(&mut self, to: ValidationStage) {
        debug_assert_eq!(self.stage.next(), Some(to), "illegal transition {:?} → {to:?}", self.stage);
        info!(from = ?self.stage, to = ?to, "stage complete");
        self.stage = to;
    }

    fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics.get_or_insert_with(Diagnostics::default)
    }

    /// Drive the state machine to `Reported`.
    pub fn run(mut self) -> ValidationRecord {
        let cfg = self.config;
        let _run = info_span!("validation", l = cfg.l, seed = cfg.seed).entered();
        let outcome = self.execute();

        let (measurement, success, error, failed_after) = match outcome {
            Ok((m, success)) => (Some(m), success, None, None),
            Err(err) => {
                warn!(stage = ?self.stage, %err, "validation failed");
                (None, false, Some(err.to_string()), Some(self.stage))
            }
        };
        if failed_after.is_none() {
            self.advance(ValidationStage::Reported);
        } else {
            self.stage = ValidationStage::Reported;
        }

        let record = ValidationRecord {
            seed: cfg.seed,
            delta_h: cfg.perturbation.magnitude(),
            l: cfg.l,
            measurement,
            success,
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            runtime_seconds: self.started.elapsed().as_secs_f64(),
            error,
            failed_after,
            stage: self.stage,
            cross_check: CrossCheckOutcome::from(self.cross_check),
            diagnostics: self.diagnostics,
        };
        info!(
            success = record.success,
            runtime_seconds = record.runtime_seconds,
            "validation reported"
        );
        record
    }

    fn execute(&mut self) -> Result<(Measurement, bool)> {
        let cfg = self.config;
        cfg.validate()?;
        let lattice = Lattice::new(cfg.l)?;
        let (j, h) = (cfg.coupling_j, cfg.field_h);
        let delta_h = cfg.perturbation.resolve(lattice.n_sites(), cfg.seed)?;
        *self.diagnostics() = Diagnostics {
            n_sites: lattice.n_sites(),
            hilbert_dim: lattice.hilbert_dim(),
            kappa_band: cfg.kappa_band(),
            ..Diagnostics::default()
        };

        if let Some(l_small) = cfg.cross_check_l {
            let _s = info_span!("cross_check", l_small).entered();
            let check = validate_against_exact(l_small, j, h, &cfg.solver)?;
            self.cross_check = Some(check);
            check.into_result()?;
        }

        let (base, pert) = {
            let _s = info_span!("ground_state").entered();
            if cfg.parallel_branches {
                let (base, pert) = rayon::join(
                    || solve_branch(&lattice, j, h, None, &cfg.solver),
                    || solve_branch(&lattice, j, h, Some(&delta_h), &cfg.solver),
                );
                (base?, pert?)
            } else {
                let base = solve_branch(&lattice, j, h, None, &cfg.solver)?;
                let pert = solve_branch(&lattice, j, h, Some(&delta_h), &cfg.solver)?;
                (base, pert)
            }
        };
        let d = self.diagnostics();
        d.nnz_baseline = Some(base.hamiltonian_nnz);
        d.iterations_baseline = Some(base.ground.iterations);
        d.residual_baseline = Some(base.ground.residual);
        self.advance(ValidationStage::BaselineSolve);
        let d = self.diagnostics();
        d.nnz_perturbed = Some(pert.hamiltonian_nnz);
        d.iterations_perturbed = Some(pert.ground.iterations);
        d.residual_perturbed = Some(pert.ground.residual);
        self.advance(ValidationStage::PerturbedSolve);

        let (psi0, psi1) = (&base.ground.state, &pert.ground.state);
        let (metric0, metric1) = {
            let _s = info_span!("qfi").entered();
            let generators = build_generators(&lattice)?;
            let (f0, g0) = compute_qfi(psi0, &generators, cfg.regularization)?;
            let (f1, g1) = compute_qfi(psi1, &generators, cfg.regularization)?;
            let d = self.diagnostics();
            d.trace_f_baseline = Some(f0.trace());
            d.trace_f_perturbed = Some(f1.trace());
            (g0, g1)
        };
        self.advance(ValidationStage::QfiComputed);

        let delta_t: Vec<f64> = {
            let _s = info_span!("stress_energy").entered();
            let t0 = compute_stress_energy(psi0, &lattice, j, h, None)?;
            let t1 = compute_stress_energy(psi1, &lattice, j, h, None)?;
            t1.iter().zip(&t0).map(|(a, b)| a - b).collect()
        };
        self.advance(ValidationStage::StressComputed);

        let delta_g = {
            let _s = info_span!("geometry").entered();
            einstein_delta(&geometry_from_metric(&metric0)?, &geometry_from_metric(&metric1)?)?
        };
        self.advance(ValidationStage::GeometryComputed);

        let result = fit(&delta_g, &delta_t, cfg.free_intercept)?;
        let act = activation(&delta_h, h)?;
        self.diagnostics().activation = Some(act);
        let regime = classify_regime(act);
        self.advance(ValidationStage::Fitted);

        let in_band = match cfg.kappa_band() {
            Some(band) => band.contains(result.kappa),
            None => {
                warn!(l = cfg.l, "no kappa band configured for this lattice size; run cannot succeed");
                false
            }
        };
        let success = result.r_squared > cfg.min_r_squared && in_band;
        info!(
            kappa = result.kappa,
            r_squared = result.r_squared,
            intercept = result.intercept,
            regime = %regime,
            in_band,
            "fit complete"
        );

        let (e0, e1) = (base.ground.energy, pert.ground.energy);
        let measurement = Measurement {
            kappa: result.kappa,
            r_squared: result.r_squared,
            intercept: result.intercept,
            regime,
            e0,
            e1,
            delta_e: e1 - e0,
            norm_delta_g: l2(&delta_g),
            norm_delta_t: l2(&delta_t),
        };
        Ok((measurement, success))
    }
}

/// Run one configuration end to end. Failures are reported in the record.
pub fn run_validation(config: &ValidationConfig) -> ValidationRecord {
    ValidationRunner::new(config).run()
}
