#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use xtcav_core::average::{average_profiles, calibrate_shot};
use xtcav_core::consts::ELECTRON_CHARGE_C;
use xtcav_core::error::XtcavError;

use common::*;

#[test]
fn test_groups_keep_remainder() {
    let records = accepted_records(12);
    let profiles = average_profiles(&records, 5).expect("averaged");
    let sizes: Vec<usize> = profiles.iter().map(|p| p.shots).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
}

#[test]
fn test_exact_multiple_of_group_size() {
    let records = accepted_records(12);
    let profiles = average_profiles(&records, 4).expect("averaged");
    assert_eq!(profiles.len(), 3);
    assert!(profiles.iter().all(|p| p.shots == 4));
}

#[test]
fn test_group_of_one_reproduces_each_record() {
    let records = accepted_records(6);
    let profiles = average_profiles(&records, 1).expect("averaged");
    assert_eq!(profiles.len(), records.len());
    for (profile, record) in profiles.iter().zip(&records) {
        let calibrated = calibrate_shot(record);
        assert_eq!(profile.t, calibrated.t);
        assert_eq!(profile.bunches, calibrated.bunches);
        assert_eq!(profile.shots, 1);
    }
}

#[test]
fn test_group_order_is_preserved() {
    let records = accepted_records(6);
    let profiles = average_profiles(&records, 1).expect("averaged");
    let centroids: Vec<f64> = profiles.iter().map(|p| p.bunches[0].t_centroid).collect();
    let expected: Vec<f64> = records
        .iter()
        .map(|r| calibrate_shot(r).bunches[0].t_centroid)
        .collect();
    assert_eq!(centroids, expected);
}

#[test]
fn test_current_integrates_to_charge() {
    let record = &accepted_records(1)[0];
    let calibrated = calibrate_shot(record);
    let dt_s = record.physical_units.xfs_per_pix.abs() * 1e-15;
    let charge_c: f64 = calibrated.bunches[0].current.sum() * 1e3 * dt_s;
    assert_abs_diff_eq!(
        charge_c,
        record.shot_to_shot.dump_charge * ELECTRON_CHARGE_C,
        epsilon = 1e-15
    );
}

#[test]
fn test_identical_axes_average_without_resampling() {
    // Events 0, 3, 6 share the same jitter and hence the same time axis.
    let records: Vec<_> = accepted_records(7).into_iter().step_by(3).collect();
    assert_eq!(records.len(), 3);
    let profiles = average_profiles(&records, 3).expect("averaged");
    assert_eq!(profiles.len(), 1);
    let single = calibrate_shot(&records[0]);
    assert_eq!(profiles[0].t, single.t);
    for (avg, one) in profiles[0].bunches[0]
        .current
        .iter()
        .zip(single.bunches[0].current.iter())
    {
        assert_abs_diff_eq!(*avg, *one, epsilon = 1e-9);
    }
}

#[test]
fn test_jittered_axes_share_a_covering_grid() {
    let records = accepted_records(3);
    let profiles = average_profiles(&records, 3).expect("averaged");
    let t = &profiles[0].t;
    let starts = records.iter().map(|r| r.physical_units.xfs[0]);
    let ends = records
        .iter()
        .map(|r| r.physical_units.xfs[r.physical_units.xfs.len() - 1]);
    let min_start = starts.fold(f64::INFINITY, f64::min);
    let max_end = ends.fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(t[0], min_start, epsilon = 1e-9);
    assert_abs_diff_eq!(t[t.len() - 1], max_end, epsilon = 1e-9);
    assert!(t.iter().zip(t.iter().skip(1)).all(|(a, b)| a < b));
    assert_eq!(profiles[0].bunches[0].current.len(), t.len());
}

#[test]
fn test_zero_group_size_is_invalid() {
    let records = accepted_records(2);
    assert!(matches!(
        average_profiles(&records, 0),
        Err(XtcavError::InvalidConfig(_))
    ));
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(matches!(
        average_profiles(&[], 5),
        Err(XtcavError::EmptySequence)
    ));
}

#[test]
fn test_mixed_bunch_counts_are_inconsistent() {
    let mut records = accepted_records(3);
    let extra = records[1].image_stats[0].clone();
    records[1].image_stats.push(extra);
    assert!(matches!(
        average_profiles(&records, 2),
        Err(XtcavError::Inconsistent(_))
    ));
}
