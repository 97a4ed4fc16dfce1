//! Run one Einstein-relation validation and write its JSON record.
//!
//! ```bash
//! qfi_validate --l 3 --delta-h 0.1 --seed 42 --output results/l3.json
//! qfi_validate --config run.json --output results/run.json
//! ```
//!
//! Command-line flags override values from `--config`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use qfi_einstein::{run_validation, Perturbation, ValidationConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "qfi_validate", about = "QFI / stress-energy Einstein-relation validation")]
struct Cli {
    /// JSON run configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the per-site perturbation draw.
    #[arg(long)]
    seed: Option<u64>,

    /// Perturbation magnitude; δhᵢ ~ U[0, delta_h].
    #[arg(long = "delta-h")]
    delta_h: Option<f64>,

    /// Linear lattice size.
    #[arg(long = "l")]
    l: Option<usize>,

    /// Ising coupling J.
    #[arg(long = "j")]
    coupling_j: Option<f64>,

    /// Transverse field h.
    #[arg(long = "h")]
    field_h: Option<f64>,

    /// Lattice size for the exact-diagonalisation cross-check (0 disables it).
    #[arg(long = "cross-check-l")]
    cross_check_l: Option<usize>,

    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(ValidationConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => ValidationConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ValidationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(magnitude) = self.delta_h {
            config.perturbation = Perturbation::Uniform { magnitude };
        }
        if let Some(l) = self.l {
            config.l = l;
        }
        if let Some(j) = self.coupling_j {
            config.coupling_j = j;
        }
        if let Some(h) = self.field_h {
            config.field_h = h;
        }
        if let Some(cl) = self.cross_check_l {
            config.cross_check_l = (cl > 0).then_some(cl);
        }
        Ok((config, self.output))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (config, output) = Cli::parse().into_config()?;
    info!(
        l = config.l,
        j = config.coupling_j,
        h = config.field_h,
        delta_h = config.perturbation.magnitude(),
        seed = config.seed,
        "starting validation"
    );

    let record = run_validation(&config);

    match &output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &record)?;
            writer.flush()?;
            info!(path = %path.display(), "record written");
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &record)?;
            writeln!(lock)?;
        }
    }

    if let Some(err) = &record.error {
        bail!("validation failed: {err}");
    }
    Ok(())
}
