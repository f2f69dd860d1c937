use ndarray::Array1;
use tracing::debug;

use crate::consts::MIN_RF_PHASE_COSINE;
use crate::frame::{GlobalCalibration, Roi, ShotMetadata};
use crate::shot::{PhysicalUnits, ShotToShot};

/// Extract shot-to-shot parameters from the event metadata.
///
/// Valid only when e-beam data is present with a positive dump charge and a
/// usable XTCAV RF amplitude.
pub fn shot_to_shot(metadata: &ShotMetadata) -> ShotToShot {
    let xray_energy = metadata
        .gas_detector
        .as_ref()
        .map(|gd| (gd.f_11 + gd.f_12) / 2.0)
        .unwrap_or(0.0);

    let mut shot = ShotToShot {
        unixtime: metadata.event_id.seconds,
        fiducial: metadata.event_id.fiducial,
        xray_energy,
        ..Default::default()
    };

    if let Some(ebeam) = &metadata.ebeam {
        shot.xtcav_rf_amp = ebeam.xtcav_rf_amp;
        shot.xtcav_rf_phase = ebeam.xtcav_rf_phase;
        shot.dump_energy = ebeam.dump_energy_mev;
        shot.dump_charge = ebeam.dump_charge;
        shot.valid = ebeam.dump_charge > 0.0
            && ebeam.xtcav_rf_amp.is_finite()
            && ebeam.xtcav_rf_amp != 0.0
            && ebeam.xtcav_rf_phase.is_finite();
    }
    shot
}

/// Convert the ROI axes to femtoseconds and MeV.
///
/// The time step per pixel follows the streaking calibration and is flipped
/// by the sign of the cosine of the RF phase difference; it may be negative.
/// The result is invalid when that cosine is below [`MIN_RF_PHASE_COSINE`]
/// or when any step is not finite.
pub fn physical_units(
    roi: &Roi,
    center: (f64, f64),
    shot: &ShotToShot,
    calibration: &GlobalCalibration,
) -> PhysicalUnits {
    let y_mev_per_pix =
        calibration.um_per_pix * calibration.dump_e / calibration.dump_disp * 1e-3;
    let mut xfs_per_pix = -calibration.um_per_pix * calibration.rf_amp_calib
        / (0.3 * calibration.str_strength * shot.xtcav_rf_amp);

    let cos_phase_diff =
        ((calibration.rf_phase_calib - shot.xtcav_rf_phase) * std::f64::consts::PI / 180.0).cos();
    let mut valid = true;
    if cos_phase_diff.abs() < MIN_RF_PHASE_COSINE {
        debug!(
            rf_phase = shot.xtcav_rf_phase,
            "Bunch phase with the RF field is far from 0 or 180 degrees"
        );
        valid = false;
    }
    xfs_per_pix *= cos_phase_diff.signum();

    if !xfs_per_pix.is_finite() || xfs_per_pix == 0.0 || !y_mev_per_pix.is_finite() {
        valid = false;
    }

    let (x_center, y_center) = center;
    let xfs = Array1::from_iter((0..roi.x_n).map(|i| xfs_per_pix * (i as f64 - x_center)));
    let y_mev = Array1::from_iter((0..roi.y_n).map(|j| y_mev_per_pix * (j as f64 - y_center)));

    PhysicalUnits {
        xfs,
        y_mev,
        xfs_per_pix,
        y_mev_per_pix,
        valid,
    }
}
