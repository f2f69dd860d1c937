//! Per-shot records produced by the event filter pipeline.

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use crate::frame::Roi;

/// Shot-to-shot machine parameters needed to calibrate the image axes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotToShot {
    pub unixtime: u64,
    pub fiducial: u32,
    /// XTCAV RF amplitude, MV.
    pub xtcav_rf_amp: f64,
    /// XTCAV RF phase, degrees.
    pub xtcav_rf_phase: f64,
    /// Beam energy at the dump, MeV.
    pub dump_energy: f64,
    /// Charge at the dump, electrons.
    pub dump_charge: f64,
    /// Mean X-ray pulse energy from the gas detectors, mJ.
    pub xray_energy: f64,
    pub valid: bool,
}

/// Statistics of a single bunch image, in pixels relative to the ROI origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub image_sum: f64,
    pub x_com: f64,
    pub y_com: f64,
    pub x_rms: f64,
    pub y_rms: f64,
    /// Column sums (time profile).
    pub x_profile: Array1<f64>,
    /// Row sums (energy profile).
    pub y_profile: Array1<f64>,
    /// Energy centroid of each column.
    pub y_com_slice: Array1<f64>,
    /// Energy spread of each column.
    pub y_rms_slice: Array1<f64>,
}

impl ImageStats {
    /// Reverse every per-column sequence.
    pub fn reverse_slices(&mut self) {
        self.x_profile = reversed(&self.x_profile);
        self.y_com_slice = reversed(&self.y_com_slice);
        self.y_rms_slice = reversed(&self.y_rms_slice);
    }
}

/// Image axes converted to physical units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalUnits {
    /// Time axis, fs, one entry per ROI column.
    pub xfs: Array1<f64>,
    /// Energy axis, MeV, one entry per ROI row.
    pub y_mev: Array1<f64>,
    pub xfs_per_pix: f64,
    pub y_mev_per_pix: f64,
    pub valid: bool,
}

impl PhysicalUnits {
    pub fn time_is_ascending(&self) -> bool {
        is_ascending(&self.xfs)
    }
}

/// Everything kept from one event that passed every gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    /// One entry per bunch.
    pub image_stats: Vec<ImageStats>,
    pub shot_to_shot: ShotToShot,
    pub roi: Roi,
    pub physical_units: PhysicalUnits,
}

impl ShotRecord {
    pub fn num_bunches(&self) -> usize {
        self.image_stats.len()
    }
}

/// Make the stored time axis ascending.
///
/// When the time step per pixel is negative the time axis and the per-column
/// sequences of every bunch are mirrored. Already-ascending data is left
/// untouched, so applying this twice is a no-op.
pub fn normalize_time_axis(units: &mut PhysicalUnits, image_stats: &mut [ImageStats]) {
    if units.xfs_per_pix >= 0.0 || units.time_is_ascending() {
        return;
    }
    units.xfs = reversed(&units.xfs);
    for stats in image_stats.iter_mut() {
        stats.reverse_slices();
    }
}

fn reversed(a: &Array1<f64>) -> Array1<f64> {
    a.slice(s![..;-1]).to_owned()
}

fn is_ascending(a: &Array1<f64>) -> bool {
    a.iter().zip(a.iter().skip(1)).all(|(prev, next)| prev <= next)
}
