use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::average::ReferenceProfile;
use crate::error::Result;
use crate::pipeline::config::{check_format_version, ResolvedConfig, ValidityRange};

/// Result of a lasing-off reference run, as written to the calibration store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LasingOffReference {
    pub averaged_profiles: Vec<ReferenceProfile>,
    /// Configuration the reference was generated with.
    pub parameters: ResolvedConfig,
    /// Number of shot records that went into the averages.
    pub n: usize,
    pub validity_range: ValidityRange,
}

impl LasingOffReference {
    pub fn new(averaged_profiles: Vec<ReferenceProfile>, parameters: ResolvedConfig, n: usize) -> Self {
        let validity_range = parameters.validity_range.clone();
        Self {
            averaged_profiles,
            parameters,
            n,
            validity_range,
        }
    }

    pub fn num_bunches(&self) -> usize {
        self.averaged_profiles
            .first()
            .map(ReferenceProfile::num_bunches)
            .unwrap_or(0)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(path = %path.display(), profiles = self.averaged_profiles.len(), "Saved lasing-off reference");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let reference: Self = serde_json::from_reader(reader)?;
        check_format_version(reference.parameters.version)?;
        Ok(reference)
    }
}
