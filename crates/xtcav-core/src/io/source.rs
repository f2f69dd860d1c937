use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XtcavError};
use crate::frame::{CameraSettings, Frame, ShotMetadata};
use crate::io::ser::SerReader;

/// Random-access view of the events of one run.
///
/// Implementations are read-only and shared by every worker.
pub trait EventSource: Send + Sync {
    fn event_count(&self) -> usize;

    /// Camera settings that hold for the whole run.
    fn camera_settings(&self) -> Result<CameraSettings>;

    /// Camera image of an event, `None` when the event has no image.
    fn image_at(&self, index: usize) -> Result<Option<Frame>>;

    fn metadata_at(&self, index: usize) -> Result<ShotMetadata>;
}

fn check_index(index: usize, total: usize) -> Result<()> {
    if index >= total {
        return Err(XtcavError::EventIndexOutOfRange { index, total });
    }
    Ok(())
}

/// One event held in memory.
#[derive(Clone, Debug)]
pub struct MemoryEvent {
    pub image: Option<Array2<f32>>,
    pub metadata: ShotMetadata,
}

/// Run whose events are held in memory.
#[derive(Clone, Debug)]
pub struct MemoryRun {
    camera: CameraSettings,
    events: Vec<MemoryEvent>,
}

impl MemoryRun {
    pub fn new(camera: CameraSettings) -> Self {
        Self {
            camera,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, image: Option<Array2<f32>>, metadata: ShotMetadata) {
        self.events.push(MemoryEvent { image, metadata });
    }
}

impl EventSource for MemoryRun {
    fn event_count(&self) -> usize {
        self.events.len()
    }

    fn camera_settings(&self) -> Result<CameraSettings> {
        Ok(self.camera.clone())
    }

    fn image_at(&self, index: usize) -> Result<Option<Frame>> {
        check_index(index, self.events.len())?;
        Ok(self.events[index]
            .image
            .as_ref()
            .map(|data| Frame::new(data.clone(), index)))
    }

    fn metadata_at(&self, index: usize) -> Result<ShotMetadata> {
        check_index(index, self.events.len())?;
        Ok(self.events[index].metadata.clone())
    }
}

/// One event of a [`RunManifest`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestEvent {
    /// Index of the event's frame in the SER file; absent when the camera
    /// did not deliver an image.
    #[serde(default)]
    pub frame: Option<usize>,
    #[serde(default)]
    pub metadata: ShotMetadata,
}

/// JSON sidecar describing the events recorded in a SER file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub camera: CameraSettings,
    pub events: Vec<ManifestEvent>,
}

impl RunManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Run stored as a SER recording plus its event manifest.
pub struct SerRun {
    reader: SerReader,
    manifest: RunManifest,
}

impl SerRun {
    pub fn open(ser_path: &Path, manifest_path: &Path) -> Result<Self> {
        let reader = SerReader::open(ser_path)?;
        let manifest = RunManifest::load(manifest_path)?;
        Self::new(reader, manifest)
    }

    /// Check the manifest against the recording.
    pub fn new(reader: SerReader, manifest: RunManifest) -> Result<Self> {
        let (width, height) = (reader.header.width as usize, reader.header.height as usize);
        let roi = &manifest.camera.roi;
        if (roi.x_n, roi.y_n) != (width, height) {
            return Err(XtcavError::EventSource(format!(
                "camera ROI {}x{} does not match recorded frames {}x{}",
                roi.x_n, roi.y_n, width, height
            )));
        }

        let frame_count = reader.frame_count();
        if let Some((event, frame)) = manifest
            .events
            .iter()
            .enumerate()
            .find_map(|(i, e)| e.frame.filter(|&f| f >= frame_count).map(|f| (i, f)))
        {
            return Err(XtcavError::EventSource(format!(
                "event {event} refers to frame {frame}, recording has {frame_count} frames"
            )));
        }

        Ok(Self { reader, manifest })
    }
}

impl EventSource for SerRun {
    fn event_count(&self) -> usize {
        self.manifest.events.len()
    }

    fn camera_settings(&self) -> Result<CameraSettings> {
        Ok(self.manifest.camera.clone())
    }

    fn image_at(&self, index: usize) -> Result<Option<Frame>> {
        check_index(index, self.manifest.events.len())?;
        match self.manifest.events[index].frame {
            Some(frame) => {
                let data = self.reader.read_frame(frame)?;
                Ok(Some(Frame::new(data, index)))
            }
            None => Ok(None),
        }
    }

    fn metadata_at(&self, index: usize) -> Result<ShotMetadata> {
        check_index(index, self.manifest.events.len())?;
        Ok(self.manifest.events[index].metadata.clone())
    }
}
