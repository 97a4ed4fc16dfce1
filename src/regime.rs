//! Response regime from the relative perturbation strength mean(δh)/h.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tolerances::{RATIO_EPS, REGIME_GEOMETRIC_MAX, REGIME_LINEAR_MAX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Linear,
    Geometric,
    Breakdown,
}

impl Regime {
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Linear => "linear",
            Regime::Geometric => "geometric",
            Regime::Breakdown => "breakdown",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<0.3` linear, `[0.3, 0.7)` geometric, `≥0.7` breakdown. NaN is breakdown.
pub fn classify_regime(activation: f64) -> Regime {
    if activation < REGIME_LINEAR_MAX {
        Regime::Linear
    } else if activation < REGIME_GEOMETRIC_MAX {
        Regime::Geometric
    } else {
        Regime::Breakdown
    }
}

/// mean(δh) / |h|, with |h| floored at `RATIO_EPS`.
pub fn activation(delta_h: &[f64], h: f64) -> Result<f64> {
    if delta_h.is_empty() {
        return Err(Error::invalid("delta_h", "empty perturbation vector"));
    }
    let mean = delta_h.iter().sum::<f64>() / delta_h.len() as f64;
    Ok(mean / h.abs().max(RATIO_EPS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_half_open() {
        assert_eq!(classify_regime(0.0), Regime::Linear);
        assert_eq!(classify_regime(0.29), Regime::Linear);
        assert_eq!(classify_regime(0.30), Regime::Geometric);
        assert_eq!(classify_regime(0.69), Regime::Geometric);
        assert_eq!(classify_regime(0.70), Regime::Breakdown);
        assert_eq!(classify_regime(5.0), Regime::Breakdown);
        assert_eq!(classify_regime(f64::NAN), Regime::Breakdown);
    }

    #[test]
    fn activation_is_mean_over_field() {
        let a = activation(&[0.1, 0.3, 0.2, 0.2], 0.5).unwrap();
        assert!((a - 0.4).abs() < 1e-12);
        assert_eq!(classify_regime(a), Regime::Geometric);
        assert_eq!(activation(&[0.0; 4], 1.0).unwrap(), 0.0);
        assert!(activation(&[], 1.0).is_err());
    }

    #[test]
    fn zero_field_is_floored_not_nan() {
        let a = activation(&[0.1], 0.0).unwrap();
        assert!(a.is_finite());
        assert_eq!(classify_regime(a), Regime::Breakdown);
    }

    #[test]
    fn serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Regime::Geometric).unwrap(), "\"geometric\"");
        assert_eq!(Regime::Breakdown.to_string(), "breakdown");
    }
}
