//! Calibration store lookup.
//!
//! Files live at `<root>/<experiment>/<kind>/<begin>-<end>.json`, where the
//! file stem is a [`ValidityRange`] such as `86-end` or `86-120`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::pipeline::config::ValidityRange;

const CALIB_EXTENSION: &str = "json";

/// Default calibration store root when none is configured.
pub const DEFAULT_CALIB_ROOT: &str = "calib";

/// Resolver for calibration files of one experiment.
#[derive(Clone, Debug)]
pub struct CalibrationPaths {
    root: PathBuf,
    experiment: String,
}

impl CalibrationPaths {
    pub fn new(root: Option<&Path>, experiment: &str) -> Self {
        Self {
            root: root
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CALIB_ROOT)),
            experiment: experiment.to_string(),
        }
    }

    pub fn kind_dir(&self, kind: &str) -> PathBuf {
        self.root.join(&self.experiment).join(kind)
    }

    /// The most recent file of `kind` valid for `run`, i.e. the applicable
    /// file with the highest range start. Files whose stem is not a validity
    /// range are ignored. A missing directory yields `None`.
    pub fn find_cal_file(&self, kind: &str, run: u32) -> Result<Option<PathBuf>> {
        let dir = self.kind_dir(kind);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Calibration directory not found");
            return Ok(None);
        }

        let mut best: Option<(u32, PathBuf)> = None;
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CALIB_EXTENSION) {
                continue;
            }
            let Some(range) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<ValidityRange>().ok())
            else {
                continue;
            };
            if !range.contains(run) {
                continue;
            }
            let newer = match &best {
                Some((begin, current)) => {
                    range.begin > *begin || (range.begin == *begin && path > *current)
                }
                None => true,
            };
            if newer {
                best = Some((range.begin, path));
            }
        }
        Ok(best.map(|(_, path)| path))
    }

    /// Path for a new calibration file of `kind` covering `validity`.
    pub fn new_cal_file(&self, kind: &str, validity: &ValidityRange) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{validity}.{CALIB_EXTENSION}"))
    }
}
