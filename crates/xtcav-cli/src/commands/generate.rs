use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use xtcav_core::io::SerRun;
use xtcav_core::kernels::StandardKernels;
use xtcav_core::pipeline::config::{IslandSplitMethod, ReferenceConfig, RunSelector, ValidityRange};
use xtcav_core::pipeline::{generate_reference_reported, prepare_run, write_reference};

use crate::progress::BarReporter;
use crate::summary::{print_generate_summary, print_run_summary};

#[derive(Args)]
pub struct GenerateArgs {
    /// SER recording of the run
    pub file: PathBuf,

    /// Event manifest (JSON). Defaults to the recording path with a .json extension
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Reference config file (TOML); command-line options override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,

    /// Runs, e.g. "86", "86-90" or "86,91"
    #[arg(long)]
    pub runs: Option<RunSelector>,

    /// Maximum number of valid shots to keep
    #[arg(long)]
    pub max_shots: Option<usize>,

    /// Number of bunches in each image
    #[arg(long)]
    pub num_bunches: Option<usize>,

    /// Number of shots averaged into each reference profile
    #[arg(long)]
    pub group_size: Option<usize>,

    /// Median filter width in pixels
    #[arg(long)]
    pub median_filter: Option<usize>,

    /// Noise threshold in standard deviations
    #[arg(long)]
    pub snr_filter: Option<f64>,

    /// Island splitting method (scipyLabel or contourLabel)
    #[arg(long)]
    pub island_split: Option<IslandSplitMethod>,

    /// Runs the reference is valid for, e.g. "86-end"
    #[arg(long)]
    pub validity: Option<ValidityRange>,

    /// Dark background file; looked up in the calibration store if omitted
    #[arg(long)]
    pub dark: Option<PathBuf>,

    /// Calibration store root
    #[arg(long)]
    pub calib_dir: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output file; defaults to a new file in the calibration store
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &GenerateArgs) -> Result<()> {
    let mut config: ReferenceConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid reference config")?
    } else {
        ReferenceConfig::default()
    };
    apply_overrides(&mut config, args);

    let (resolved, dark) = prepare_run(&config).context("Failed to prepare run")?;

    let manifest = args
        .manifest
        .clone()
        .unwrap_or_else(|| args.file.with_extension("json"));
    let source = SerRun::open(&args.file, &manifest)
        .with_context(|| format!("Failed to open run {}", args.file.display()))?;

    let workers = args.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    info!(manifest = %manifest.display(), workers, "Opened run");

    print_generate_summary(&resolved, &args.file, workers, dark.is_some());

    let reporter = Arc::new(BarReporter::new());
    let output = generate_reference_reported(
        &resolved,
        &source,
        dark.as_ref(),
        Arc::new(StandardKernels),
        workers,
        reporter.clone(),
    )?;
    let path = write_reference(&output.reference, args.output.as_deref(), reporter.as_ref())?;
    reporter.finish();

    print_run_summary(&output, &path);
    Ok(())
}

fn apply_overrides(config: &mut ReferenceConfig, args: &GenerateArgs) {
    if let Some(ref experiment) = args.experiment {
        config.experiment = experiment.clone();
    }
    if let Some(ref runs) = args.runs {
        config.runs = runs.clone();
    }
    if let Some(ref validity) = args.validity {
        config.validity_range = Some(validity.clone());
    }
    if let Some(ref dark) = args.dark {
        config.dark_reference_path = Some(dark.clone());
    }
    if let Some(ref calib_dir) = args.calib_dir {
        config.calibration_path = Some(calib_dir.clone());
    }

    let params = &mut config.processing;
    if let Some(max_shots) = args.max_shots {
        params.max_shots = max_shots;
    }
    if let Some(num_bunches) = args.num_bunches {
        params.num_bunches = num_bunches;
    }
    if let Some(group_size) = args.group_size {
        params.group_size = group_size;
    }
    if let Some(median_filter) = args.median_filter {
        params.median_filter = median_filter;
    }
    if let Some(snr_filter) = args.snr_filter {
        params.snr_filter = snr_filter;
    }
    if let Some(method) = args.island_split {
        params.island_split_method = method;
    }
}
