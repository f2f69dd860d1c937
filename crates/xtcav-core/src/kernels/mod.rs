//! Per-image numeric kernels consumed by the event filter pipeline.
//!
//! The pipeline only depends on the [`ShotKernels`] contract; the
//! [`StandardKernels`] implementation is the one used for real runs.

pub mod background;
pub mod denoise;
pub mod islands;
pub mod roi;
pub mod stats;
pub mod units;

use ndarray::Array2;

use crate::dark::DarkBackground;
use crate::frame::{GlobalCalibration, Roi, ShotMetadata};
use crate::pipeline::config::IslandSplitMethod;
use crate::shot::{ImageStats, PhysicalUnits, ShotToShot};

/// Pure per-image transforms used by the event filter pipeline.
pub trait ShotKernels: Send + Sync {
    fn name(&self) -> &str;

    /// Extract the machine parameters of one shot. `valid` is false when the
    /// metadata cannot be used to calibrate the image.
    fn shot_to_shot(&self, metadata: &ShotMetadata) -> ShotToShot;

    /// Subtract the dark background (if any) and return the image with its ROI.
    fn subtract_background(
        &self,
        image: Array2<f32>,
        camera_roi: &Roi,
        dark: Option<&DarkBackground>,
    ) -> (Array2<f32>, Roi);

    /// Median filter, threshold at `snr_filter` noise sigmas and normalize to
    /// unit sum. `None` when no signal survives.
    fn denoise(
        &self,
        image: &Array2<f32>,
        median_filter: usize,
        snr_filter: f64,
    ) -> Option<Array2<f32>>;

    /// Crop the image around the trace, updating the ROI accordingly.
    fn find_roi(
        &self,
        image: &Array2<f32>,
        roi: &Roi,
        waist_threshold: f64,
        expand: f64,
    ) -> (Array2<f32>, Roi);

    /// Split the image into per-bunch images. Returns fewer than
    /// `num_bunches` images when the split is not clean.
    fn split_image(
        &self,
        image: &Array2<f32>,
        num_bunches: usize,
        method: IslandSplitMethod,
        par1: f64,
        par2: f64,
    ) -> Vec<Array2<f32>>;

    /// Profiles and moments of each bunch image.
    fn image_stats(&self, bunches: &[Array2<f32>], roi: &Roi) -> Vec<ImageStats>;

    /// Time and energy axes of the ROI, centred on `center` (x, y in pixels
    /// relative to the ROI origin).
    fn physical_units(
        &self,
        roi: &Roi,
        center: (f64, f64),
        shot: &ShotToShot,
        calibration: &GlobalCalibration,
    ) -> PhysicalUnits;
}

/// Default kernels.
pub struct StandardKernels;

impl ShotKernels for StandardKernels {
    fn name(&self) -> &str {
        "standard"
    }

    fn shot_to_shot(&self, metadata: &ShotMetadata) -> ShotToShot {
        units::shot_to_shot(metadata)
    }

    fn subtract_background(
        &self,
        image: Array2<f32>,
        camera_roi: &Roi,
        dark: Option<&DarkBackground>,
    ) -> (Array2<f32>, Roi) {
        background::subtract_background(image, camera_roi, dark)
    }

    fn denoise(
        &self,
        image: &Array2<f32>,
        median_filter: usize,
        snr_filter: f64,
    ) -> Option<Array2<f32>> {
        denoise::denoise_image(image, median_filter, snr_filter)
    }

    fn find_roi(
        &self,
        image: &Array2<f32>,
        roi: &Roi,
        waist_threshold: f64,
        expand: f64,
    ) -> (Array2<f32>, Roi) {
        roi::find_roi(image, roi, waist_threshold, expand)
    }

    fn split_image(
        &self,
        image: &Array2<f32>,
        num_bunches: usize,
        method: IslandSplitMethod,
        par1: f64,
        par2: f64,
    ) -> Vec<Array2<f32>> {
        islands::split_image(image, num_bunches, method, par1, par2)
    }

    fn image_stats(&self, bunches: &[Array2<f32>], _roi: &Roi) -> Vec<ImageStats> {
        bunches.iter().map(stats::bunch_stats).collect()
    }

    fn physical_units(
        &self,
        roi: &Roi,
        center: (f64, f64),
        shot: &ShotToShot,
        calibration: &GlobalCalibration,
    ) -> PhysicalUnits {
        units::physical_units(roi, center, shot, calibration)
    }
}
