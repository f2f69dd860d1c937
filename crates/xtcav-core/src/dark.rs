use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XtcavError};
use crate::frame::{Frame, Roi};

/// Averaged camera image taken without beam, subtracted from every shot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DarkBackground {
    pub image: Array2<f32>,
    /// Camera ROI the dark frames were recorded with.
    pub roi: Roi,
    /// Number of frames averaged.
    pub n: usize,
}

impl DarkBackground {
    /// Average dark frames pixel by pixel.
    pub fn from_frames(frames: &[Frame], roi: Roi) -> Result<Self> {
        if frames.is_empty() {
            return Err(XtcavError::EmptySequence);
        }

        let (h, w) = frames[0].data.dim();
        check_shape(h, w, &roi)?;

        let mut sum = Array2::<f32>::zeros((h, w));
        for frame in frames {
            if frame.data.dim() != (h, w) {
                return Err(XtcavError::InvalidDimensions {
                    width: frame.width() as u32,
                    height: frame.height() as u32,
                });
            }
            sum += &frame.data;
        }
        sum /= frames.len() as f32;

        Ok(Self {
            image: sum,
            roi,
            n: frames.len(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let dark: Self = serde_json::from_reader(reader)?;
        dark.validate()?;
        Ok(dark)
    }

    /// The image must have exactly the extent of its ROI.
    pub fn validate(&self) -> Result<()> {
        let (h, w) = self.image.dim();
        check_shape(h, w, &self.roi)
    }
}

fn check_shape(h: usize, w: usize, roi: &Roi) -> Result<()> {
    if (h, w) != (roi.y_n, roi.x_n) {
        return Err(XtcavError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        });
    }
    Ok(())
}
