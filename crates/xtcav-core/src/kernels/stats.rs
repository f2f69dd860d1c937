use ndarray::{Array1, Array2, Axis};

use crate::shot::ImageStats;

/// Moments and per-column slices of one bunch image.
///
/// Coordinates are pixel indices relative to the image origin. Columns
/// without signal get zero centroid and spread.
pub fn bunch_stats(image: &Array2<f32>) -> ImageStats {
    let (h, w) = image.dim();
    let x_profile: Array1<f64> = image.sum_axis(Axis(0)).mapv(|v| v as f64);
    let y_profile: Array1<f64> = image.sum_axis(Axis(1)).mapv(|v| v as f64);
    let image_sum = x_profile.sum();

    let (x_com, x_rms) = weighted_moments(&x_profile);
    let (y_com, y_rms) = weighted_moments(&y_profile);

    let mut y_com_slice = Array1::<f64>::zeros(w);
    let mut y_rms_slice = Array1::<f64>::zeros(w);
    for col in 0..w {
        let weight = x_profile[col];
        if !(weight > 0.0) {
            continue;
        }
        let column = image.column(col);
        let mean = (0..h)
            .map(|row| row as f64 * column[row] as f64)
            .sum::<f64>()
            / weight;
        let var = (0..h)
            .map(|row| (row as f64 - mean).powi(2) * column[row] as f64)
            .sum::<f64>()
            / weight;
        y_com_slice[col] = mean;
        y_rms_slice[col] = var.max(0.0).sqrt();
    }

    ImageStats {
        image_sum,
        x_com,
        y_com,
        x_rms,
        y_rms,
        x_profile,
        y_profile,
        y_com_slice,
        y_rms_slice,
    }
}

/// Weighted mean and RMS of sample indices. (0, 0) for a zero-weight profile.
fn weighted_moments(profile: &Array1<f64>) -> (f64, f64) {
    let total = profile.sum();
    if !(total > 0.0) {
        return (0.0, 0.0);
    }
    let mean = profile
        .iter()
        .enumerate()
        .map(|(i, &v)| i as f64 * v)
        .sum::<f64>()
        / total;
    let var = profile
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 - mean).powi(2) * v)
        .sum::<f64>()
        / total;
    (mean, var.max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_stats_of_point() {
        let mut image = Array2::<f32>::zeros((5, 6));
        image[[2, 4]] = 1.0;
        let stats = bunch_stats(&image);
        assert_eq!(stats.image_sum, 1.0);
        assert_eq!(stats.x_com, 4.0);
        assert_eq!(stats.y_com, 2.0);
        assert_eq!(stats.x_rms, 0.0);
        assert_eq!(stats.y_com_slice[4], 2.0);
        assert_eq!(stats.y_com_slice[0], 0.0);
    }

    #[test]
    fn test_slice_spread() {
        let mut image = Array2::<f32>::zeros((5, 3));
        image[[1, 1]] = 1.0;
        image[[3, 1]] = 1.0;
        let stats = bunch_stats(&image);
        assert_abs_diff_eq!(stats.y_com_slice[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.y_rms_slice[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.x_profile[1], 2.0, epsilon = 1e-12);
        assert_eq!(stats.y_profile.len(), 5);
    }
}
