use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array2};
use xtcav_core::dark::DarkBackground;
use xtcav_core::filter::EventFilter;
use xtcav_core::frame::{
    CameraSettings, EbeamData, EventId, Frame, GasDetectorData, GlobalCalibration, Roi,
    ShotMetadata,
};
use xtcav_core::io::ser::SER_HEADER_SIZE;
use xtcav_core::io::MemoryRun;
use xtcav_core::kernels::{ShotKernels, StandardKernels};
use xtcav_core::pipeline::config::{IslandSplitMethod, ProcessingParams};
use xtcav_core::shot::{ImageStats, PhysicalUnits, ShotRecord, ShotToShot};

pub const IMAGE_HEIGHT: usize = 32;
pub const IMAGE_WIDTH: usize = 48;
pub const SATURATION: f32 = 4095.0;
pub const BLOB_VALUE: f32 = 100.0;

/// Event layout used by the end-to-end runs: 20 events, 5 saturated,
/// 3 without image, 12 good.
pub const SATURATED_EVENTS: [usize; 5] = [1, 4, 9, 14, 18];
pub const MISSING_EVENTS: [usize; 3] = [2, 11, 16];
pub const RUN_EVENTS: usize = 20;

pub fn calibration() -> GlobalCalibration {
    GlobalCalibration {
        um_per_pix: 10.0,
        str_strength: 50.0,
        rf_amp_calib: 20.0,
        rf_phase_calib: 90.0,
        dump_e: 4000.0,
        dump_disp: 500.0,
    }
}

pub fn camera() -> CameraSettings {
    CameraSettings {
        roi: Roi::full(IMAGE_HEIGHT, IMAGE_WIDTH),
        calibration: calibration(),
        saturation_value: SATURATION,
    }
}

/// Metadata of a shot that calibrates cleanly.
pub fn good_metadata(index: usize) -> ShotMetadata {
    ShotMetadata {
        event_id: EventId {
            seconds: 1_400_000_000 + index as u64,
            nanoseconds: 0,
            fiducial: index as u32,
        },
        ebeam: Some(EbeamData {
            dump_energy_mev: 4000.0,
            dump_charge: 1e9,
            xtcav_rf_amp: 20.0,
            xtcav_rf_phase: 90.0,
        }),
        gas_detector: Some(GasDetectorData {
            f_11: 0.0,
            f_12: 0.0,
            f_21: 0.0,
            f_22: 0.0,
        }),
    }
}

/// A streaked trace: a flat rectangle on a zero background, shifted right by
/// `shift` columns. The top-left noise corner stays empty.
pub fn trace_image(shift: usize) -> Array2<f32> {
    let mut image = Array2::<f32>::zeros((IMAGE_HEIGHT, IMAGE_WIDTH));
    image
        .slice_mut(s![12..20, 14 + shift..34 + shift])
        .fill(BLOB_VALUE);
    image
}

pub fn saturated_image() -> Array2<f32> {
    let mut image = trace_image(0);
    image[[15, 20]] = 5000.0;
    image
}

/// Two separated rectangles of equal size.
pub fn two_bunch_image() -> Array2<f32> {
    let mut image = Array2::<f32>::zeros((IMAGE_HEIGHT, IMAGE_WIDTH));
    image.slice_mut(s![12..20, 14..22]).fill(BLOB_VALUE);
    image.slice_mut(s![12..20, 28..36]).fill(BLOB_VALUE);
    image
}

pub fn frame(data: Array2<f32>) -> Frame {
    Frame::new(data, 0)
}

/// The standard 20-event run: saturated and missing events interleaved with
/// good shots whose trace jitters by up to two columns.
pub fn standard_run() -> MemoryRun {
    let mut run = MemoryRun::new(camera());
    for i in 0..RUN_EVENTS {
        let image = if SATURATED_EVENTS.contains(&i) {
            Some(saturated_image())
        } else if MISSING_EVENTS.contains(&i) {
            None
        } else {
            Some(trace_image(i % 3))
        };
        run.push(image, good_metadata(i));
    }
    run
}

/// A run where every event carries a good trace.
pub fn clean_run(events: usize) -> MemoryRun {
    let mut run = MemoryRun::new(camera());
    for i in 0..events {
        run.push(Some(trace_image(i % 3)), good_metadata(i));
    }
    run
}

/// Processing parameters that suit the synthetic traces.
pub fn params(max_shots: usize, group_size: usize) -> ProcessingParams {
    ProcessingParams {
        max_shots,
        group_size,
        ..Default::default()
    }
}

/// `count` records accepted by the real filter from jittered traces.
pub fn accepted_records(count: usize) -> Vec<ShotRecord> {
    let params = ProcessingParams::default();
    let camera = camera();
    let filter = EventFilter::new(&params, &camera, None, &StandardKernels);
    (0..count)
        .map(|i| {
            let frame = Frame::new(trace_image(i % 3), i);
            filter
                .process(Some(&frame), &good_metadata(i))
                .expect("synthetic trace passes the filter")
        })
        .collect()
}

/// Minimal record tagged by its fiducial, for order-sensitive tests.
pub fn tagged_record(tag: u32) -> ShotRecord {
    let profile = ndarray::Array1::from(vec![0.0, 1.0, 0.0]);
    ShotRecord {
        image_stats: vec![ImageStats {
            image_sum: 1.0,
            x_com: 1.0,
            y_com: 1.0,
            x_rms: 0.0,
            y_rms: 0.0,
            x_profile: profile.clone(),
            y_profile: profile.clone(),
            y_com_slice: profile.clone(),
            y_rms_slice: profile,
        }],
        shot_to_shot: ShotToShot {
            fiducial: tag,
            dump_charge: 1e9,
            valid: true,
            ..Default::default()
        },
        roi: Roi::new(0, 0, 3, 3),
        physical_units: PhysicalUnits {
            xfs: ndarray::Array1::from(vec![-1.0, 0.0, 1.0]),
            y_mev: ndarray::Array1::from(vec![-1.0, 0.0, 1.0]),
            xfs_per_pix: 1.0,
            y_mev_per_pix: 1.0,
            valid: true,
        },
    }
}

/// Standard kernels, except that the ROI always collapses to 2x2. Counts the
/// island splitting calls.
#[derive(Default)]
pub struct TinyRoiKernels {
    pub split_calls: AtomicUsize,
}

impl TinyRoiKernels {
    pub fn split_calls(&self) -> usize {
        self.split_calls.load(Ordering::SeqCst)
    }
}

impl ShotKernels for TinyRoiKernels {
    fn name(&self) -> &str {
        "tiny-roi"
    }

    fn shot_to_shot(&self, metadata: &ShotMetadata) -> ShotToShot {
        StandardKernels.shot_to_shot(metadata)
    }

    fn subtract_background(
        &self,
        image: Array2<f32>,
        camera_roi: &Roi,
        dark: Option<&DarkBackground>,
    ) -> (Array2<f32>, Roi) {
        StandardKernels.subtract_background(image, camera_roi, dark)
    }

    fn denoise(
        &self,
        image: &Array2<f32>,
        median_filter: usize,
        snr_filter: f64,
    ) -> Option<Array2<f32>> {
        StandardKernels.denoise(image, median_filter, snr_filter)
    }

    fn find_roi(
        &self,
        image: &Array2<f32>,
        roi: &Roi,
        _waist_threshold: f64,
        _expand: f64,
    ) -> (Array2<f32>, Roi) {
        let cropped = image.slice(s![..2, ..2]).to_owned();
        (cropped, Roi::new(roi.x0, roi.y0, 2, 2))
    }

    fn split_image(
        &self,
        image: &Array2<f32>,
        num_bunches: usize,
        method: IslandSplitMethod,
        par1: f64,
        par2: f64,
    ) -> Vec<Array2<f32>> {
        self.split_calls.fetch_add(1, Ordering::SeqCst);
        StandardKernels.split_image(image, num_bunches, method, par1, par2)
    }

    fn image_stats(&self, bunches: &[Array2<f32>], roi: &Roi) -> Vec<ImageStats> {
        StandardKernels.image_stats(bunches, roi)
    }

    fn physical_units(
        &self,
        roi: &Roi,
        center: (f64, f64),
        shot: &ShotToShot,
        calibration: &GlobalCalibration,
    ) -> PhysicalUnits {
        StandardKernels.physical_units(roi, center, shot, calibration)
    }
}

/// Build a SER file header for mono frames of the given bit depth.
pub fn build_ser_header(width: u32, height: u32, bit_depth: u32, num_frames: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID = MONO (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // LittleEndian = 0 (little-endian)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // Width
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    // Height
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    // PixelDepth
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    // FrameCount
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC (8 bytes each)
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete 16-bit mono SER file holding the given images as counts.
pub fn build_ser_u16(images: &[Array2<f32>]) -> Vec<u8> {
    let (height, width) = images.first().map(|i| i.dim()).unwrap_or((1, 1));
    let mut buf = build_ser_header(width as u32, height as u32, 16, images.len());
    for image in images {
        for &v in image.iter() {
            buf.extend_from_slice(&(v as u16).to_le_bytes());
        }
    }
    buf
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}
