//! Einstein-relation fit: ΔG = κ·ΔT + b.
//!
//! ## Modes
//!
//! - **free intercept**: ordinary least squares, R² = r² (squared Pearson
//!   correlation, equal to 1 − SS_res/SS_tot about the mean).
//! - **forced origin**: κ = Σ G·T / Σ T², b = 0, R² = 1 − SS_res / Σ G²
//!   (uncentred total sum of squares).
//!
//! ## Guards
//!
//! | Denominator            | Below `RATIO_EPS`          |
//! |------------------------|----------------------------|
//! | Σ (T − T̄)² (OLS)       | `IllConditioned` error     |
//! | Σ T² (forced origin)   | `IllConditioned` error     |
//! | Σ (G − Ḡ)² (OLS R²)    | R² clamped to 0.0          |
//! | Σ G² (forced R²)       | R² clamped to 0.0          |
//!
//! R² is additionally clamped into [0, 1].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tolerances::RATIO_EPS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub kappa: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl FitResult {
    pub fn predict(&self, t: f64) -> f64 {
        self.kappa * t + self.intercept
    }
}

fn check_inputs(g_diag: &[f64], t_diag: &[f64], min_points: usize) -> Result<()> {
    if g_diag.len() != t_diag.len() {
        return Err(Error::LengthMismatch {
            what: "fit inputs",
            expected: t_diag.len(),
            actual: g_diag.len(),
        });
    }
    if t_diag.len() < min_points {
        return Err(Error::invalid(
            "fit inputs",
            format!("need at least {min_points} points, got {}", t_diag.len()),
        ));
    }
    if g_diag.iter().chain(t_diag).any(|v| !v.is_finite()) {
        return Err(Error::invalid("fit inputs", "non-finite value"));
    }
    Ok(())
}

/// Regress `g_diag` on `t_diag`.
pub fn fit(g_diag: &[f64], t_diag: &[f64], free_intercept: bool) -> Result<FitResult> {
    if free_intercept {
        fit_ols(g_diag, t_diag)
    } else {
        fit_through_origin(g_diag, t_diag)
    }
}

fn fit_ols(g: &[f64], t: &[f64]) -> Result<FitResult> {
    check_inputs(g, t, 2)?;
    let n = t.len() as f64;
    let t_mean = t.iter().sum::<f64>() / n;
    let g_mean = g.iter().sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&ti, &gi) in t.iter().zip(g) {
        let dt = ti - t_mean;
        let dg = gi - g_mean;
        sxx += dt * dt;
        syy += dg * dg;
        sxy += dt * dg;
    }
    if sxx < RATIO_EPS {
        return Err(Error::IllConditioned {
            quantity: "stress-energy variance",
            denominator: sxx,
        });
    }

    let kappa = sxy / sxx;
    let intercept = g_mean - kappa * t_mean;
    let r_squared = if syy < RATIO_EPS {
        0.0
    } else {
        (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0)
    };
    Ok(FitResult {
        kappa,
        intercept,
        r_squared,
    })
}

fn fit_through_origin(g: &[f64], t: &[f64]) -> Result<FitResult> {
    check_inputs(g, t, 1)?;
    let stt: f64 = t.iter().map(|v| v * v).sum();
    if stt < RATIO_EPS {
        return Err(Error::IllConditioned {
            quantity: "Σ T² (forced-origin fit)",
            denominator: stt,
        });
    }
    let sgt: f64 = g.iter().zip(t).map(|(a, b)| a * b).sum();
    let kappa = sgt / stt;

    let sgg: f64 = g.iter().map(|v| v * v).sum();
    let r_squared = if sgg < RATIO_EPS {
        0.0
    } else {
        let ss_res: f64 = g.iter().zip(t).map(|(gi, ti)| (gi - kappa * ti).powi(2)).sum();
        (1.0 - ss_res / sgg).clamp(0.0, 1.0)
    };
    Ok(FitResult {
        kappa,
        intercept: 0.0,
        r_squared,
    })
}
