use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::average::average_profiles;
use crate::calib::CalibrationPaths;
use crate::consts::{LASING_OFF_REFERENCE_KIND, PEDESTALS_KIND};
use crate::dark::DarkBackground;
use crate::error::{Result, XtcavError};
use crate::filter::EventFilter;
use crate::io::EventSource;
use crate::kernels::ShotKernels;
use crate::reference::LasingOffReference;

use super::config::{ReferenceConfig, ResolvedConfig};
use super::reduce::{reduce_worker_outputs, RunSummary};
use super::types::{NoOpReporter, PipelineStage, ProgressReporter};
use super::worker::{run_worker, worker_target, WorkerOutput};

/// Result of a complete reference run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub reference: LasingOffReference,
    pub summary: RunSummary,
}

/// Find the dark background for the run.
///
/// An explicitly configured path must load. Otherwise the calibration store
/// is searched for the most recent pedestal file valid for the first run.
/// When none is found the run proceeds without background subtraction.
pub fn load_dark_reference(config: &ReferenceConfig) -> Result<Option<(PathBuf, DarkBackground)>> {
    if let Some(path) = &config.dark_reference_path {
        let dark = DarkBackground::load(path)?;
        info!(path = %path.display(), frames = dark.n, "Loaded dark reference");
        return Ok(Some((path.clone(), dark)));
    }

    let paths = CalibrationPaths::new(config.calibration_path.as_deref(), &config.experiment);
    match paths.find_cal_file(PEDESTALS_KIND, config.runs.first())? {
        Some(path) => {
            let dark = DarkBackground::load(&path)?;
            info!(path = %path.display(), frames = dark.n, "Found dark reference in calibration store");
            Ok(Some((path, dark)))
        }
        None => {
            warn!(
                experiment = %config.experiment,
                run = config.runs.first(),
                "Dark reference run not found, generating reference without dark subtraction"
            );
            Ok(None)
        }
    }
}

/// Resolve the dark background and finalize the configuration.
pub fn prepare_run(config: &ReferenceConfig) -> Result<(ResolvedConfig, Option<DarkBackground>)> {
    let dark = load_dark_reference(config)?;
    let (path, dark) = match dark {
        Some((path, dark)) => (Some(path), Some(dark)),
        None => (None, None),
    };
    Ok((config.resolve(path)?, dark))
}

/// Run the full reference pipeline with a thread-safe progress reporter.
///
/// `workers` threads each process their share of the events; their records
/// are gathered in rank order on the calling thread, truncated to
/// `max_shots` and averaged.
pub fn generate_reference_reported(
    config: &ResolvedConfig,
    source: &dyn EventSource,
    dark: Option<&DarkBackground>,
    kernels: Arc<dyn ShotKernels>,
    workers: usize,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunOutput> {
    reporter.begin_stage(PipelineStage::Resolving, None);
    if workers == 0 {
        return Err(XtcavError::InvalidConfig("workers must be > 0".into()));
    }
    let params = &config.processing;
    params.validate()?;
    let camera = source.camera_settings()?;
    let total = source.event_count();
    info!(
        experiment = %config.experiment,
        run = config.runs.first(),
        events = total,
        workers,
        kernels = kernels.name(),
        dark = dark.is_some(),
        "Generating lasing-off reference"
    );
    reporter.finish_stage();

    let quota = (worker_target(params.max_shots, workers) * workers).min(total);
    reporter.begin_stage(PipelineStage::Processing, Some(quota));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("xtcav-worker-{i}"))
        .build()
        .map_err(|e| XtcavError::WorkerPool(e.to_string()))?;

    let outputs: Vec<WorkerOutput> = pool.install(|| {
        (0..workers)
            .into_par_iter()
            .map(|rank| {
                let filter = EventFilter::new(params, &camera, dark, kernels.as_ref());
                run_worker(
                    source,
                    &filter,
                    rank,
                    workers,
                    params.max_shots,
                    reporter.as_ref(),
                )
            })
            .collect::<Result<Vec<_>>>()
    })?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Reducing, Some(workers));
    let (records, summary) = reduce_worker_outputs(outputs, params.max_shots);
    reporter.finish_stage();
    info!(
        accepted = summary.accepted,
        kept = summary.kept,
        rejected = summary.rejections.total(),
        "Gathered shot records"
    );
    if records.is_empty() {
        warn!("No shot passed the event filter");
        return Err(XtcavError::EmptySequence);
    }

    reporter.begin_stage(PipelineStage::Averaging, Some(records.len()));
    let profiles = average_profiles(&records, params.group_size)?;
    reporter.finish_stage();

    let reference = LasingOffReference::new(profiles, config.clone(), records.len());
    info!(
        profiles = reference.averaged_profiles.len(),
        n = reference.n,
        validity = %reference.validity_range,
        "Reference complete"
    );
    Ok(RunOutput { reference, summary })
}

/// Run the full reference pipeline without progress reporting.
pub fn generate_reference(
    config: &ResolvedConfig,
    source: &dyn EventSource,
    dark: Option<&DarkBackground>,
    kernels: Arc<dyn ShotKernels>,
    workers: usize,
) -> Result<RunOutput> {
    generate_reference_reported(config, source, dark, kernels, workers, Arc::new(NoOpReporter))
}

/// Save the reference to `output`, or to a new file in the calibration store
/// named after its validity range. Returns the path written.
pub fn write_reference(
    reference: &LasingOffReference,
    output: Option<&Path>,
    reporter: &dyn ProgressReporter,
) -> Result<PathBuf> {
    reporter.begin_stage(PipelineStage::Writing, None);
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let params = &reference.parameters;
            CalibrationPaths::new(params.calibration_path.as_deref(), &params.experiment)
                .new_cal_file(LASING_OFF_REFERENCE_KIND, &reference.validity_range)
        }
    };
    reference.save(&path)?;
    reporter.finish_stage();
    Ok(path)
}
