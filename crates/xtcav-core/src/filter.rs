//! Event filter pipeline: turns one raw event into a [`ShotRecord`] or a
//! [`Rejection`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::MIN_ROI_EXTENT;
use crate::dark::DarkBackground;
use crate::frame::{CameraSettings, Frame, ShotMetadata};
use crate::kernels::ShotKernels;
use crate::pipeline::config::ProcessingParams;
use crate::shot::{normalize_time_axis, ShotRecord};

/// Reason an event did not yield a usable shot record.
///
/// Rejections are not errors: the worker loop counts them and moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rejection {
    /// The event carries no camera image.
    NoData,
    /// At least one pixel reached the camera saturation value.
    Saturated,
    /// E-beam or RF readings missing or unusable.
    BadShotMetadata,
    /// Nothing survived the noise threshold.
    EmptyAfterDenoise,
    /// The trace ROI is narrower than the minimum extent in some axis.
    RoiTooSmall,
    /// Island splitting did not find the configured number of bunches.
    BunchCountMismatch,
    /// The physical unit calibration is not valid for this shot.
    CalibrationInvalid,
}

impl Rejection {
    pub const ALL: [Rejection; 7] = [
        Rejection::NoData,
        Rejection::Saturated,
        Rejection::BadShotMetadata,
        Rejection::EmptyAfterDenoise,
        Rejection::RoiTooSmall,
        Rejection::BunchCountMismatch,
        Rejection::CalibrationInvalid,
    ];
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no image"),
            Self::Saturated => write!(f, "saturated"),
            Self::BadShotMetadata => write!(f, "bad shot metadata"),
            Self::EmptyAfterDenoise => write!(f, "empty after denoise"),
            Self::RoiTooSmall => write!(f, "ROI too small"),
            Self::BunchCountMismatch => write!(f, "bunch count mismatch"),
            Self::CalibrationInvalid => write!(f, "invalid calibration"),
        }
    }
}

/// Per-event processing with everything that stays fixed for a run.
pub struct EventFilter<'a> {
    params: &'a ProcessingParams,
    camera: &'a CameraSettings,
    dark: Option<&'a DarkBackground>,
    kernels: &'a dyn ShotKernels,
}

impl<'a> EventFilter<'a> {
    pub fn new(
        params: &'a ProcessingParams,
        camera: &'a CameraSettings,
        dark: Option<&'a DarkBackground>,
        kernels: &'a dyn ShotKernels,
    ) -> Self {
        Self {
            params,
            camera,
            dark,
            kernels,
        }
    }

    /// Run every gate on one event. The first failing gate decides the
    /// rejection.
    pub fn process(
        &self,
        image: Option<&Frame>,
        metadata: &ShotMetadata,
    ) -> Result<ShotRecord, Rejection> {
        let Some(frame) = image else {
            debug!("Event without camera image");
            return Err(Rejection::NoData);
        };

        let max_value = frame.max_value();
        if max_value >= self.camera.saturation_value {
            warn!(
                event = frame.event_index,
                max_value,
                saturation = self.camera.saturation_value,
                "Saturated image, skipping shot"
            );
            return Err(Rejection::Saturated);
        }

        let shot_to_shot = self.kernels.shot_to_shot(metadata);
        if !shot_to_shot.valid {
            debug!(event = frame.event_index, "Unusable shot-to-shot metadata");
            return Err(Rejection::BadShotMetadata);
        }

        let (image, roi) =
            self.kernels
                .subtract_background(frame.data.clone(), &self.camera.roi, self.dark);

        let params = self.params;
        let Some(denoised) = self
            .kernels
            .denoise(&image, params.median_filter, params.snr_filter)
        else {
            debug!(event = frame.event_index, "No signal after denoising");
            return Err(Rejection::EmptyAfterDenoise);
        };

        let (cropped, roi) = self.kernels.find_roi(
            &denoised,
            &roi,
            params.roi_waist_threshold,
            params.roi_expand,
        );
        if roi.x_n < MIN_ROI_EXTENT || roi.y_n < MIN_ROI_EXTENT {
            debug!(event = frame.event_index, roi = ?roi, "ROI too small");
            return Err(Rejection::RoiTooSmall);
        }

        let bunches = self.kernels.split_image(
            &cropped,
            params.num_bunches,
            params.island_split_method,
            params.island_split_par1,
            params.island_split_par2,
        );
        if bunches.len() != params.num_bunches {
            debug!(
                event = frame.event_index,
                found = bunches.len(),
                expected = params.num_bunches,
                "Bunch count mismatch"
            );
            return Err(Rejection::BunchCountMismatch);
        }

        let mut image_stats = self.kernels.image_stats(&bunches, &roi);
        if image_stats.len() != params.num_bunches {
            debug!(event = frame.event_index, "Missing bunch statistics");
            return Err(Rejection::BunchCountMismatch);
        }

        let center = (image_stats[0].x_com, image_stats[0].y_com);
        let mut physical_units = self.kernels.physical_units(
            &roi,
            center,
            &shot_to_shot,
            &self.camera.calibration,
        );
        if !physical_units.valid {
            debug!(event = frame.event_index, "Invalid physical units");
            return Err(Rejection::CalibrationInvalid);
        }

        normalize_time_axis(&mut physical_units, &mut image_stats);

        Ok(ShotRecord {
            image_stats,
            shot_to_shot,
            roi,
            physical_units,
        })
    }
}
