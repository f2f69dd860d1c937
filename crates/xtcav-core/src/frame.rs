use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single raw XTCAV camera image.
/// Pixel values are f32 detector counts (not normalized).
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Index of the event this image belongs to
    pub event_index: usize,
}

impl Frame {
    pub fn new(data: Array2<f32>, event_index: usize) -> Self {
        Self { data, event_index }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Brightest pixel value, `-inf` for an empty image.
    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Region of interest on the camera, in absolute pixel coordinates.
///
/// `x` runs along image columns (time axis), `y` along rows (energy axis).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x0: usize,
    pub y0: usize,
    pub x_n: usize,
    pub y_n: usize,
}

impl Roi {
    pub fn new(x0: usize, y0: usize, x_n: usize, y_n: usize) -> Self {
        Self { x0, y0, x_n, y_n }
    }

    /// ROI covering a whole image of the given shape, anchored at the origin.
    pub fn full(height: usize, width: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// True if `other` lies entirely inside this ROI.
    pub fn contains(&self, other: &Roi) -> bool {
        other.x0 >= self.x0
            && other.y0 >= self.y0
            && other.x0 + other.x_n <= self.x0 + self.x_n
            && other.y0 + other.y_n <= self.y0 + self.y_n
    }
}

/// Timing identity of an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventId {
    pub seconds: u64,
    pub nanoseconds: u32,
    pub fiducial: u32,
}

/// Electron beam readings for one shot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EbeamData {
    /// Beam energy at the dump, MeV.
    pub dump_energy_mev: f64,
    /// Charge at the dump, electrons.
    pub dump_charge: f64,
    /// XTCAV RF amplitude, MV.
    pub xtcav_rf_amp: f64,
    /// XTCAV RF phase, degrees.
    pub xtcav_rf_phase: f64,
}

/// Gas detector pulse energy readings, mJ.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasDetectorData {
    pub f_11: f64,
    pub f_12: f64,
    pub f_21: f64,
    pub f_22: f64,
}

/// Per-event metadata delivered alongside the camera image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotMetadata {
    pub event_id: EventId,
    #[serde(default)]
    pub ebeam: Option<EbeamData>,
    #[serde(default)]
    pub gas_detector: Option<GasDetectorData>,
}

/// Global XTCAV calibration constants for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalCalibration {
    /// Camera pixel size, micrometers.
    pub um_per_pix: f64,
    /// Streaking strength.
    pub str_strength: f64,
    /// RF amplitude at calibration time, MV.
    pub rf_amp_calib: f64,
    /// RF phase at calibration time, degrees.
    pub rf_phase_calib: f64,
    /// Beam energy at the dump at calibration time, MeV.
    pub dump_e: f64,
    /// Dispersion at the screen, mm.
    pub dump_disp: f64,
}

/// Camera-level settings that hold for every event of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub roi: Roi,
    pub calibration: GlobalCalibration,
    /// Pixel value at which the camera saturates.
    pub saturation_value: f32,
}
