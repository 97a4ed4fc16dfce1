//! Coarse discrete curvature from the QFI metric.
//!
//! ```text
//! R       = tr(g)
//! R_ii    = g_ii − mean(diag g)
//! G_ii    = R_ii − ½ · R · g_ii
//! ```
//!
//! This is a fixed proxy, not a finite-difference Ricci tensor. κ values from
//! the fitter are only comparable under exactly these formulas.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub ricci_scalar: f64,
    pub ricci_diag: Vec<f64>,
    pub einstein_diag: Vec<f64>,
}

pub fn geometry_from_metric(g: &DMatrix<f64>) -> Result<Geometry> {
    if g.nrows() != g.ncols() {
        return Err(Error::invalid(
            "metric",
            format!("{}×{} is not square", g.nrows(), g.ncols()),
        ));
    }
    if g.nrows() == 0 {
        return Err(Error::invalid("metric", "empty matrix"));
    }

    let diag: Vec<f64> = g.diagonal().iter().copied().collect();
    let ricci_scalar = g.trace();
    let mean = diag.iter().sum::<f64>() / diag.len() as f64;
    let ricci_diag: Vec<f64> = diag.iter().map(|d| d - mean).collect();
    let einstein_diag = ricci_diag
        .iter()
        .zip(&diag)
        .map(|(r, d)| r - 0.5 * ricci_scalar * d)
        .collect();

    Ok(Geometry {
        ricci_scalar,
        ricci_diag,
        einstein_diag,
    })
}

/// Elementwise b − a over Einstein diagonals.
pub fn einstein_delta(base: &Geometry, perturbed: &Geometry) -> Result<Vec<f64>> {
    if base.einstein_diag.len() != perturbed.einstein_diag.len() {
        return Err(Error::LengthMismatch {
            what: "einstein diagonal",
            expected: base.einstein_diag.len(),
            actual: perturbed.einstein_diag.len(),
        });
    }
    Ok(perturbed
        .einstein_diag
        .iter()
        .zip(&base.einstein_diag)
        .map(|(p, b)| p - b)
        .collect())
}
