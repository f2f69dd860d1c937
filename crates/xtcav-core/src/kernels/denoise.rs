use ndarray::{s, Array2};
use rayon::prelude::*;

use crate::consts::{DENOISE_NOISE_REGION, PARALLEL_PIXEL_THRESHOLD};

/// Remove noise from a background-subtracted image.
///
/// Pipeline: square median filter -> noise mean/std from the top-left corner
/// -> keep pixels above `mean + snr_filter * std` (shifted by the mean) ->
/// normalize to unit sum.
///
/// Returns `None` if no pixel survives the threshold.
pub fn denoise_image(
    image: &Array2<f32>,
    median_filter: usize,
    snr_filter: f64,
) -> Option<Array2<f32>> {
    let (h, w) = image.dim();
    if h == 0 || w == 0 {
        return None;
    }

    let filtered = median_filter_2d(image, median_filter);

    let corner = filtered.slice(s![..DENOISE_NOISE_REGION.min(h), ..DENOISE_NOISE_REGION.min(w)]);
    let n = corner.len() as f64;
    let mean = corner.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = corner
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let threshold = mean + snr_filter * var.sqrt();

    let mut output = filtered.mapv(|v| {
        let v = v as f64;
        if v > threshold {
            (v - mean) as f32
        } else {
            0.0
        }
    });

    let total: f64 = output.iter().map(|&v| v as f64).sum();
    if !(total > 0.0) {
        return None;
    }
    output.mapv_inplace(|v| (v as f64 / total) as f32);
    Some(output)
}

/// Square median filter of side `size`, with edge pixels clamped.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_filter_2d(image: &Array2<f32>, size: usize) -> Array2<f32> {
    let (h, w) = image.dim();
    if size <= 1 || h == 0 || w == 0 {
        return image.clone();
    }

    let before = (size - 1) / 2;
    let after = size / 2;

    let filter_row = |row: usize, window: &mut Vec<f32>, out: &mut [f32]| {
        for (col, result) in out.iter_mut().enumerate() {
            window.clear();
            for r in row as isize - before as isize..=(row + after) as isize {
                let rr = r.clamp(0, h as isize - 1) as usize;
                for c in col as isize - before as isize..=(col + after) as isize {
                    let cc = c.clamp(0, w as isize - 1) as usize;
                    window.push(image[[rr, cc]]);
                }
            }
            *result = compute_median(window);
        }
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut window = Vec::with_capacity(size * size);
                let mut row_result = vec![0.0f32; w];
                filter_row(row, &mut window, &mut row_result);
                row_result
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        let mut result = Array2::<f32>::zeros((h, w));
        let mut window = Vec::with_capacity(size * size);
        let mut row_result = vec![0.0f32; w];
        for row in 0..h {
            filter_row(row, &mut window, &mut row_result);
            for (col, val) in row_result.iter().enumerate() {
                result[[row, col]] = *val;
            }
        }
        result
    }
}

/// Median of the window. Even-sized windows take the upper middle element,
/// matching a rank filter.
fn compute_median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
}
