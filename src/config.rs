//! Run configuration for one validation (one L, one seed, one δh).
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "l": 3, "field_h": 2.0, "perturbation": { "uniform": { "magnitude": 0.2 } } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lattice::Lattice;
use crate::solver::LanczosConfig;
use crate::tolerances::{DEFAULT_REGULARIZATION, DENSE_MAX_SITES};

/// Per-site field perturbation δh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perturbation {
    /// δhᵢ drawn uniformly from [0, magnitude] with the run seed.
    Uniform { magnitude: f64 },
    /// Explicit δh, one entry per site.
    PerSite(Vec<f64>),
}

impl Perturbation {
    /// Scalar reported as `delta_h`: the magnitude, or the maximum entry.
    pub fn magnitude(&self) -> f64 {
        match self {
            Perturbation::Uniform { magnitude } => *magnitude,
            Perturbation::PerSite(v) => v.iter().copied().fold(0.0, f64::max),
        }
    }

    /// Concrete δh vector for `n_sites` sites.
    pub fn resolve(&self, n_sites: usize, seed: u64) -> Result<Vec<f64>> {
        match self {
            Perturbation::Uniform { magnitude } => {
                if !(magnitude.is_finite() && *magnitude >= 0.0) {
                    return Err(Error::invalid(
                        "delta_h",
                        format!("{magnitude} must be finite and non-negative"),
                    ));
                }
                if *magnitude == 0.0 {
                    return Ok(vec![0.0; n_sites]);
                }
                let mut rng = StdRng::seed_from_u64(seed);
                let dist = Uniform::new_inclusive(0.0, *magnitude);
                Ok((0..n_sites).map(|_| dist.sample(&mut rng)).collect())
            }
            Perturbation::PerSite(v) => {
                if v.len() != n_sites {
                    return Err(Error::LengthMismatch {
                        what: "delta_h",
                        expected: n_sites,
                        actual: v.len(),
                    });
                }
                if let Some(bad) = v.iter().find(|x| !x.is_finite()) {
                    return Err(Error::invalid("delta_h", format!("entry {bad} is not finite")));
                }
                Ok(v.clone())
            }
        }
    }
}

/// Accepted κ interval for one lattice size. Both ends are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KappaBand {
    pub min: f64,
    pub max: f64,
}

impl KappaBand {
    pub fn contains(&self, kappa: f64) -> bool {
        self.min < kappa && kappa < self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Linear lattice size; N = L² sites.
    pub l: usize,
    pub coupling_j: f64,
    pub field_h: f64,
    pub perturbation: Perturbation,
    /// Seeds the δh draw only.
    pub seed: u64,
    /// ε in g = F/4 + ε·I.
    pub regularization: f64,
    pub free_intercept: bool,
    /// R² must exceed this for a run to succeed.
    pub min_r_squared: f64,
    /// Expected κ per lattice size. Runs at an L without a band never succeed.
    pub kappa_bands: BTreeMap<usize, KappaBand>,
    pub solver: LanczosConfig,
    /// Lattice size for the exact-diagonalisation cross-check; `None` skips it.
    pub cross_check_l: Option<usize>,
    /// Solve baseline and perturbed ground states concurrently.
    pub parallel_branches: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut kappa_bands = BTreeMap::new();
        kappa_bands.insert(4, KappaBand { min: 50.0, max: 80.0 });
        Self {
            l: 4,
            coupling_j: 1.0,
            field_h: 1.0,
            perturbation: Perturbation::Uniform { magnitude: 0.1 },
            seed: 42,
            regularization: DEFAULT_REGULARIZATION,
            free_intercept: true,
            min_r_squared: 0.95,
            kappa_bands,
            solver: LanczosConfig::default(),
            cross_check_l: Some(2),
            parallel_branches: true,
        }
    }
}

impl ValidationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn kappa_band(&self) -> Option<KappaBand> {
        self.kappa_bands.get(&self.l).copied()
    }

    /// Reject configuration errors before any numerical work.
    pub fn validate(&self) -> Result<()> {
        let lattice = Lattice::new(self.l)?;
        for (name, v) in [("coupling_j", self.coupling_j), ("field_h", self.field_h)] {
            if !v.is_finite() {
                return Err(Error::invalid(name, format!("{v} is not finite")));
            }
        }
        self.perturbation.resolve(lattice.n_sites(), self.seed)?;
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(Error::invalid(
                "regularization",
                format!("{} must be finite and non-negative", self.regularization),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_r_squared) {
            return Err(Error::invalid(
                "min_r_squared",
                format!("{} is outside [0, 1]", self.min_r_squared),
            ));
        }
        for (l, band) in &self.kappa_bands {
            if !(band.min.is_finite() && band.max.is_finite() && band.min < band.max) {
                return Err(Error::Config(format!(
                    "kappa band for L={l} is not a finite open interval: ({}, {})",
                    band.min, band.max
                )));
            }
        }
        self.solver.validate()?;
        if let Some(cl) = self.cross_check_l {
            let small = Lattice::new(cl)?;
            if small.n_sites() > DENSE_MAX_SITES {
                return Err(Error::invalid(
                    "cross_check_l",
                    format!("L={cl} exceeds the {DENSE_MAX_SITES}-site dense limit"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let c = ValidationConfig::default();
        c.validate().unwrap();
        assert_eq!(c.kappa_band(), Some(KappaBand { min: 50.0, max: 80.0 }));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = ValidationConfig::from_json_str(
            r#"{ "l": 2, "perturbation": { "per_site": [0.1, 0.0, 0.2, 0.0] },
                 "kappa_bands": { "2": { "min": -5.0, "max": 5.0 } } }"#,
        )
        .unwrap();
        assert_eq!(c.l, 2);
        assert_eq!(c.coupling_j, 1.0);
        assert_eq!(c.solver, LanczosConfig::default());
        assert_eq!(c.kappa_band(), Some(KappaBand { min: -5.0, max: 5.0 }));
        assert_eq!(c.perturbation.magnitude(), 0.2);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "l": 3, "seed": 7, "cross_check_l": null }}"#).unwrap();
        let c = ValidationConfig::from_json_file(file.path()).unwrap();
        assert_eq!((c.l, c.seed, c.cross_check_l), (3, 7, None));

        let missing = ValidationConfig::from_json_file(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }

    #[test]
    fn serialises_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let original = ValidationConfig {
            l: 3,
            perturbation: Perturbation::PerSite(vec![0.05; 9]),
            ..ValidationConfig::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();
        let reloaded = ValidationConfig::from_json_file(&path).unwrap();
        assert_eq!(reloaded.l, 3);
        assert_eq!(reloaded.kappa_bands.len(), 1);
        match reloaded.perturbation {
            Perturbation::PerSite(v) => {
                assert_eq!(v.len(), 9);
                assert!(v.iter().all(|x| (x - 0.05).abs() < 1e-15));
            }
            other => panic!("unexpected perturbation {other:?}"),
        }
    }

    #[test]
    fn rejects_configuration_errors() {
        let bad = [
            ValidationConfig { l: 0, ..Default::default() },
            ValidationConfig { field_h: f64::NAN, ..Default::default() },
            ValidationConfig { perturbation: Perturbation::Uniform { magnitude: -0.1 }, ..Default::default() },
            ValidationConfig { perturbation: Perturbation::PerSite(vec![0.1; 3]), ..Default::default() },
            ValidationConfig { regularization: -1e-6, ..Default::default() },
            ValidationConfig { min_r_squared: 1.5, ..Default::default() },
            ValidationConfig { cross_check_l: Some(4), ..Default::default() },
        ];
        for c in &bad {
            let err = c.validate().unwrap_err();
            assert!(err.is_configuration(), "{err}");
        }
        assert!(ValidationConfig::from_json_str(r#"{ "l": "four" }"#).is_err());
    }

    /// 2^(L²) amplitudes per vector: L=5 would already need 2^25, and L=8
    /// overflows the basis index. Both are refused up front.
    #[test]
    fn rejects_lattices_beyond_site_limit() {
        for l in [5usize, 8] {
            let err = ValidationConfig { l, ..Default::default() }.validate().unwrap_err();
            println!("L={l}: {err}");
            assert!(err.is_configuration(), "{err}");
            assert!(err.to_string().contains("invalid lattice size"));
        }
        assert!(ValidationConfig { l: 4, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn kappa_band_excludes_its_edges() {
        let band = KappaBand { min: 50.0, max: 80.0 };
        assert!(band.contains(65.0));
        assert!(band.contains(50.000_001));
        assert!(!band.contains(50.0));
        assert!(!band.contains(80.0));
        assert!(!band.contains(f64::NAN));

        let mut c = ValidationConfig::default();
        c.kappa_bands.insert(3, KappaBand { min: 1.0, max: 1.0 });
        assert!(c.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn uniform_draw_is_seeded_and_bounded() {
        let p = Perturbation::Uniform { magnitude: 0.3 };
        let a = p.resolve(16, 42).unwrap();
        assert_eq!(a, p.resolve(16, 42).unwrap());
        assert_ne!(a, p.resolve(16, 43).unwrap());
        assert!(a.iter().all(|&x| (0.0..=0.3).contains(&x)));
        let zero = Perturbation::Uniform { magnitude: 0.0 }.resolve(4, 1).unwrap();
        assert_eq!(zero, vec![0.0; 4]);
    }
}
