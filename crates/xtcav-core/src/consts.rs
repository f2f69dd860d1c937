/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of consecutive events in one work block. Blocks are dealt to
/// workers round-robin.
pub const TASK_BLOCK_SIZE: usize = 4;

/// Accepted shots between two progress reports of a worker.
pub const PROGRESS_INTERVAL: usize = 5;

/// Smallest ROI extent (pixels, per axis) that still yields usable profiles.
pub const MIN_ROI_EXTENT: usize = 3;

/// Side of the top-left corner square used to estimate the noise level
/// during denoising.
pub const DENOISE_NOISE_REGION: usize = 10;

/// Fraction of the peak intensity that defines the contour level for
/// `contourLabel` island splitting.
pub const CONTOUR_LEVEL_FRACTION: f32 = 0.1;

/// Smallest |cos(phase difference)| between the bunch and the XTCAV RF for
/// which the time calibration is trusted.
pub const MIN_RF_PHASE_COSINE: f64 = 0.5;

/// Elementary charge in coulombs.
pub const ELECTRON_CHARGE_C: f64 = 1.602_176_634e-19;

/// Femtoseconds to seconds.
pub const FS_TO_S: f64 = 1e-15;

/// Version of the persisted reference format.
pub const REFERENCE_FORMAT_VERSION: u32 = 1;

/// Calibration store kind for dark backgrounds.
pub const PEDESTALS_KIND: &str = "pedestals";

/// Calibration store kind for lasing-off references.
pub const LASING_OFF_REFERENCE_KIND: &str = "lasingoffreference";

pub const DEFAULT_EXPERIMENT: &str = "amoc8114";
pub const DEFAULT_RUN: u32 = 86;
pub const DEFAULT_MAX_SHOTS: usize = 401;
pub const DEFAULT_NUM_BUNCHES: usize = 1;
pub const DEFAULT_GROUP_SIZE: usize = 5;
pub const DEFAULT_MEDIAN_FILTER: usize = 3;
pub const DEFAULT_SNR_FILTER: f64 = 10.0;
pub const DEFAULT_ROI_WAIST_THRESHOLD: f64 = 0.2;
pub const DEFAULT_ROI_EXPAND: f64 = 2.5;

/// Largest/second-largest island area ratio accepted by island splitting.
pub const DEFAULT_ISLAND_SPLIT_PAR1: f64 = 3.0;

/// Second/third-largest island area ratio required by island splitting.
pub const DEFAULT_ISLAND_SPLIT_PAR2: f64 = 5.0;
