use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use xtcav_core::calib::CalibrationPaths;
use xtcav_core::consts::{DEFAULT_EXPERIMENT, DEFAULT_RUN, PEDESTALS_KIND};
use xtcav_core::dark::DarkBackground;
use xtcav_core::frame::Roi;
use xtcav_core::io::ser::SerReader;
use xtcav_core::pipeline::config::ValidityRange;

#[derive(Args)]
pub struct DarkArgs {
    /// SER recording of dark frames
    pub file: PathBuf,

    /// Camera ROI origin, x (pixels)
    #[arg(long, default_value = "0")]
    pub x0: usize,

    /// Camera ROI origin, y (pixels)
    #[arg(long, default_value = "0")]
    pub y0: usize,

    /// Experiment name
    #[arg(long, default_value = DEFAULT_EXPERIMENT)]
    pub experiment: String,

    /// Dark run number; start of the default validity range
    #[arg(long, default_value_t = DEFAULT_RUN)]
    pub run: u32,

    /// Runs the dark background is valid for, e.g. "86-end"
    #[arg(long)]
    pub validity: Option<ValidityRange>,

    /// Calibration store root
    #[arg(long)]
    pub calib_dir: Option<PathBuf>,

    /// Output file; defaults to a new file in the calibration store
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &DarkArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let total = reader.frame_count();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Reading dark frames");

    let frames: Vec<_> = reader
        .frames()
        .enumerate()
        .map(|(i, f)| {
            pb.set_position(i as u64 + 1);
            f
        })
        .collect::<std::result::Result<_, _>>()?;
    pb.finish_with_message("Averaging");

    let roi = Roi::new(
        args.x0,
        args.y0,
        reader.header.width as usize,
        reader.header.height as usize,
    );
    let dark = DarkBackground::from_frames(&frames, roi)?;

    let path = match args.output {
        Some(ref path) => path.clone(),
        None => {
            let validity = args
                .validity
                .clone()
                .unwrap_or_else(|| ValidityRange::open_ended(args.run));
            CalibrationPaths::new(args.calib_dir.as_deref(), &args.experiment)
                .new_cal_file(PEDESTALS_KIND, &validity)
        }
    };
    dark.save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Averaged {} dark frames ({}x{})", dark.n, dark.roi.x_n, dark.roi.y_n);
    println!("Dark background saved to {}", path.display());
    Ok(())
}
