use ndarray::{s, Array2};
use tracing::debug;

use crate::dark::DarkBackground;
use crate::frame::Roi;

/// Subtract the window of the dark background that matches the camera ROI.
///
/// The dark image must cover the camera ROI; otherwise the image is returned
/// unchanged. The returned ROI is always the camera ROI.
pub fn subtract_background(
    image: Array2<f32>,
    camera_roi: &Roi,
    dark: Option<&DarkBackground>,
) -> (Array2<f32>, Roi) {
    let Some(dark) = dark else {
        return (image, camera_roi.clone());
    };

    let (h, w) = image.dim();
    if (h, w) != (camera_roi.y_n, camera_roi.x_n)
        || !dark.roi.contains(camera_roi)
        || dark.validate().is_err()
    {
        debug!(
            camera_roi = ?camera_roi,
            dark_roi = ?dark.roi,
            "Dark background does not cover the camera ROI, skipping subtraction"
        );
        return (image, camera_roi.clone());
    }

    let min_x = camera_roi.x0 - dark.roi.x0;
    let min_y = camera_roi.y0 - dark.roi.y0;
    let window = dark
        .image
        .slice(s![min_y..min_y + camera_roi.y_n, min_x..min_x + camera_roi.x_n]);

    (image - &window, camera_roi.clone())
}
