use ndarray::{s, Array2, Axis};

use crate::frame::Roi;

/// Crop the image around the trace.
///
/// For each axis, the projected profile is searched for the first and last
/// samples at or above `waist_threshold * peak`. Their midpoint is the trace
/// centre and half their distance the waist; the crop spans
/// `centre +/- expand * waist`, clamped to the image. The ROI origin and
/// extent are updated to the cropped window.
pub fn find_roi(
    image: &Array2<f32>,
    roi: &Roi,
    waist_threshold: f64,
    expand: f64,
) -> (Array2<f32>, Roi) {
    let (h, w) = image.dim();
    if h == 0 || w == 0 {
        return (image.clone(), Roi::new(roi.x0, roi.y0, 0, 0));
    }

    let x_profile: Vec<f64> = image
        .sum_axis(Axis(0))
        .iter()
        .map(|&v| v as f64)
        .collect();
    let y_profile: Vec<f64> = image
        .sum_axis(Axis(1))
        .iter()
        .map(|&v| v as f64)
        .collect();

    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        crop_bounds(&x_profile, waist_threshold, expand),
        crop_bounds(&y_profile, waist_threshold, expand),
    ) else {
        return (Array2::zeros((0, 0)), Roi::new(roi.x0, roi.y0, 0, 0));
    };

    let cropped = image.slice(s![y_min..=y_max, x_min..=x_max]).to_owned();
    let new_roi = Roi::new(
        roi.x0 + x_min,
        roi.y0 + y_min,
        x_max - x_min + 1,
        y_max - y_min + 1,
    );
    (cropped, new_roi)
}

/// Inclusive crop bounds along one profile, `None` if the profile has no
/// positive peak.
fn crop_bounds(profile: &[f64], waist_threshold: f64, expand: f64) -> Option<(usize, usize)> {
    let peak = profile.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(peak > 0.0) {
        return None;
    }
    let level = waist_threshold * peak;
    let first = profile.iter().position(|&v| v >= level)?;
    let last = profile.iter().rposition(|&v| v >= level)?;

    let center = (first + last) as f64 / 2.0;
    let waist = (last - first + 1) as f64 / 2.0;
    let half = expand * waist;

    let lo = (center - half).floor().max(0.0) as usize;
    let hi = ((center + half).ceil() as usize).min(profile.len() - 1);
    if lo > hi {
        return None;
    }
    Some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_bounds_centered_trace() {
        let mut profile = vec![0.0; 40];
        for v in &mut profile[18..22] {
            *v = 1.0;
        }
        // centre 19.5, waist 2, expand 2 -> [15.5, 23.5]
        assert_eq!(crop_bounds(&profile, 0.5, 2.0), Some((15, 24)));
    }

    #[test]
    fn test_crop_bounds_clamped() {
        let mut profile = vec![0.0; 10];
        profile[0] = 1.0;
        profile[1] = 1.0;
        assert_eq!(crop_bounds(&profile, 0.5, 20.0), Some((0, 9)));
    }

    #[test]
    fn test_find_roi_updates_origin() {
        let mut image = Array2::<f32>::zeros((30, 40));
        image.slice_mut(s![10..14, 20..28]).fill(1.0);
        let roi = Roi::new(100, 50, 40, 30);
        let (cropped, new_roi) = find_roi(&image, &roi, 0.2, 1.0);
        // x: centre 23.5, waist 4 -> [19.5, 27.5]; y: centre 11.5, waist 2 -> [9.5, 13.5]
        assert_eq!(new_roi, Roi::new(119, 59, 10, 6));
        assert_eq!(cropped.dim(), (6, 10));
        assert_eq!(cropped.sum(), 32.0);
    }

    #[test]
    fn test_find_roi_empty_image() {
        let image = Array2::<f32>::zeros((10, 10));
        let (_, roi) = find_roi(&image, &Roi::full(10, 10), 0.2, 2.5);
        assert_eq!((roi.x_n, roi.y_n), (0, 0));
    }
}
