//! Averaging engine: calibrates shot records to physical units and averages
//! them in groups of consecutive shots.

use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{ELECTRON_CHARGE_C, FS_TO_S};
use crate::error::{Result, XtcavError};
use crate::shot::ShotRecord;

/// Time-resolved profiles of one bunch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BunchProfile {
    /// Current, kA, one entry per time sample.
    pub current: Array1<f64>,
    /// Energy centroid of each time slice relative to the first bunch, MeV.
    pub e_com_slice: Array1<f64>,
    /// Energy spread of each time slice, MeV.
    pub e_rms_slice: Array1<f64>,
    /// Current-weighted mean time, fs.
    pub t_centroid: f64,
}

/// Averaged profiles of one group of shots on a shared time axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    /// Time axis, fs, ascending.
    pub t: Array1<f64>,
    pub bunches: Vec<BunchProfile>,
    /// Number of shots averaged into this profile.
    pub shots: usize,
}

impl ReferenceProfile {
    pub fn num_bunches(&self) -> usize {
        self.bunches.len()
    }
}

/// One shot converted to physical units, on its own time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibratedShot {
    pub t: Array1<f64>,
    /// Absolute time step, fs.
    pub dt: f64,
    pub bunches: Vec<BunchProfile>,
}

/// Convert the per-column statistics of a record to current and energy
/// profiles.
///
/// The charge is split between bunches in proportion to their image sums.
/// Columns without signal have zero current and zero energy slices.
pub fn calibrate_shot(record: &ShotRecord) -> CalibratedShot {
    let units = &record.physical_units;
    let dt = units.xfs_per_pix.abs();
    let total_sum: f64 = record.image_stats.iter().map(|s| s.image_sum).sum();
    let charge = record.shot_to_shot.dump_charge * ELECTRON_CHARGE_C;
    // A per unit of normalized column sum, converted to kA.
    let scale = if total_sum > 0.0 && dt > 0.0 {
        charge / (dt * FS_TO_S) / total_sum / 1e3
    } else {
        0.0
    };
    let y_com_ref = record
        .image_stats
        .first()
        .map(|s| s.y_com)
        .unwrap_or(0.0);

    let bunches = record
        .image_stats
        .iter()
        .map(|stats| {
            let current = stats.x_profile.mapv(|v| v * scale);
            let has_signal = stats.x_profile.mapv(|v| v > 0.0);

            let mut e_com_slice = stats
                .y_com_slice
                .mapv(|y| (y - y_com_ref) * units.y_mev_per_pix);
            let mut e_rms_slice = stats
                .y_rms_slice
                .mapv(|y| y * units.y_mev_per_pix.abs());
            for ((com, rms), &signal) in e_com_slice
                .iter_mut()
                .zip(e_rms_slice.iter_mut())
                .zip(has_signal.iter())
            {
                if !signal {
                    *com = 0.0;
                    *rms = 0.0;
                }
            }

            BunchProfile {
                t_centroid: weighted_time(&units.xfs, &current),
                current,
                e_com_slice,
                e_rms_slice,
            }
        })
        .collect();

    CalibratedShot {
        t: units.xfs.clone(),
        dt,
        bunches,
    }
}

/// Average the records in groups of `group_size` consecutive shots.
///
/// The last group holds the remainder when the record count is not a
/// multiple of the group size. Every record must have the same number of
/// bunches.
pub fn average_profiles(records: &[ShotRecord], group_size: usize) -> Result<Vec<ReferenceProfile>> {
    if group_size == 0 {
        return Err(XtcavError::InvalidConfig("group_size must be > 0".into()));
    }
    let Some(first) = records.first() else {
        return Err(XtcavError::EmptySequence);
    };

    let num_bunches = first.num_bunches();
    if let Some((i, bad)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| r.num_bunches() != num_bunches)
    {
        return Err(XtcavError::Inconsistent(format!(
            "record {i} has {} bunches, expected {num_bunches}",
            bad.num_bunches()
        )));
    }

    let calibrated: Vec<CalibratedShot> = records.par_iter().map(calibrate_shot).collect();

    Ok(calibrated
        .chunks(group_size)
        .map(|group| average_group(group, num_bunches))
        .collect())
}

/// Element-wise mean of a non-empty group of calibrated shots.
fn average_group(group: &[CalibratedShot], num_bunches: usize) -> ReferenceProfile {
    let t = group_time_axis(group);
    let n = group.len() as f64;

    let mut bunches: Vec<BunchProfile> = (0..num_bunches)
        .map(|b| resample_bunch(&group[0], b, &t))
        .collect();
    for shot in &group[1..] {
        for (b, acc) in bunches.iter_mut().enumerate() {
            let profile = resample_bunch(shot, b, &t);
            acc.current += &profile.current;
            acc.e_com_slice += &profile.e_com_slice;
            acc.e_rms_slice += &profile.e_rms_slice;
            acc.t_centroid += profile.t_centroid;
        }
    }
    for acc in &mut bunches {
        acc.current /= n;
        acc.e_com_slice /= n;
        acc.e_rms_slice /= n;
        acc.t_centroid /= n;
    }

    ReferenceProfile {
        t,
        bunches,
        shots: group.len(),
    }
}

/// The time axis shared by a group: the common axis when all shots agree,
/// otherwise a uniform grid covering every shot at the finest step.
fn group_time_axis(group: &[CalibratedShot]) -> Array1<f64> {
    let first = &group[0];
    if group.iter().all(|s| s.t == first.t) {
        return first.t.clone();
    }

    let step = group
        .iter()
        .map(|s| s.dt)
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .fold(f64::INFINITY, f64::min);
    let start = group
        .iter()
        .filter_map(|s| s.t.first().copied())
        .fold(f64::INFINITY, f64::min);
    let end = group
        .iter()
        .filter_map(|s| s.t.last().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    if !step.is_finite() || !(end >= start) {
        return first.t.clone();
    }

    let len = ((end - start) / step + 1e-9).floor() as usize + 1;
    Array1::from_iter((0..len).map(|i| start + i as f64 * step))
}

fn resample_bunch(shot: &CalibratedShot, bunch: usize, t: &Array1<f64>) -> BunchProfile {
    let profile = &shot.bunches[bunch];
    if shot.t == *t {
        return profile.clone();
    }
    BunchProfile {
        current: interpolate(t, &shot.t, &profile.current),
        e_com_slice: interpolate(t, &shot.t, &profile.e_com_slice),
        e_rms_slice: interpolate(t, &shot.t, &profile.e_rms_slice),
        t_centroid: profile.t_centroid,
    }
}

/// Linear interpolation of `(xp, fp)` at `x`, zero outside `xp`.
/// `xp` must be ascending.
fn interpolate(x: &Array1<f64>, xp: &Array1<f64>, fp: &Array1<f64>) -> Array1<f64> {
    let n = xp.len();
    x.mapv(|xi| {
        if n == 0 || xi < xp[0] || xi > xp[n - 1] {
            return 0.0;
        }
        let hi = xp
            .as_slice()
            .map(|s| s.partition_point(|&v| v < xi))
            .unwrap_or_else(|| xp.iter().position(|&v| v >= xi).unwrap_or(n));
        if hi == 0 {
            return fp[0];
        }
        if hi >= n {
            return fp[n - 1];
        }
        let (x0, x1) = (xp[hi - 1], xp[hi]);
        if x1 == x0 {
            return fp[hi];
        }
        let frac = (xi - x0) / (x1 - x0);
        fp[hi - 1] + frac * (fp[hi] - fp[hi - 1])
    })
}

fn weighted_time(t: &Array1<f64>, current: &Array1<f64>) -> f64 {
    let total = current.sum();
    if !(total > 0.0) {
        return 0.0;
    }
    t.iter().zip(current.iter()).map(|(&t, &i)| t * i).sum::<f64>() / total
}
