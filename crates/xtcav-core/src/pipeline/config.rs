use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_EXPERIMENT, DEFAULT_GROUP_SIZE, DEFAULT_ISLAND_SPLIT_PAR1, DEFAULT_ISLAND_SPLIT_PAR2,
    DEFAULT_MAX_SHOTS, DEFAULT_MEDIAN_FILTER, DEFAULT_NUM_BUNCHES, DEFAULT_ROI_EXPAND,
    DEFAULT_ROI_WAIST_THRESHOLD, DEFAULT_RUN, DEFAULT_SNR_FILTER, REFERENCE_FORMAT_VERSION,
};
use crate::error::{Result, XtcavError};

/// User-facing configuration of a lasing-off reference run.
///
/// Fields that are derived at run time (dark reference, validity range) are
/// optional here; [`ReferenceConfig::resolve`] turns the config into a
/// [`ResolvedConfig`] once they are known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_experiment")]
    pub experiment: String,
    #[serde(default = "default_runs")]
    pub runs: RunSelector,
    #[serde(default)]
    pub validity_range: Option<ValidityRange>,
    #[serde(default)]
    pub dark_reference_path: Option<PathBuf>,
    /// Root of the calibration store. Falls back to `./calib`.
    #[serde(default)]
    pub calibration_path: Option<PathBuf>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub processing: ProcessingParams,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            experiment: default_experiment(),
            runs: default_runs(),
            validity_range: None,
            dark_reference_path: None,
            calibration_path: None,
            version: REFERENCE_FORMAT_VERSION,
            processing: ProcessingParams::default(),
        }
    }
}

impl ReferenceConfig {
    /// Validate the configuration and fill in the derived fields.
    ///
    /// `dark_reference_path` replaces the configured path (pass the configured
    /// one back when nothing better was found). An unset validity range
    /// becomes `<first run>-end`.
    pub fn resolve(&self, dark_reference_path: Option<PathBuf>) -> Result<ResolvedConfig> {
        self.processing.validate()?;
        check_format_version(self.version)?;
        let validity_range = self
            .validity_range
            .clone()
            .unwrap_or_else(|| ValidityRange::open_ended(self.runs.first()));
        Ok(ResolvedConfig {
            experiment: self.experiment.clone(),
            runs: self.runs.clone(),
            processing: self.processing.clone(),
            validity_range,
            dark_reference_path,
            calibration_path: self.calibration_path.clone(),
            version: self.version,
        })
    }
}

/// Versions this build can read and write: 1 up to [`REFERENCE_FORMAT_VERSION`].
pub fn check_format_version(version: u32) -> Result<()> {
    if version == 0 || version > REFERENCE_FORMAT_VERSION {
        return Err(XtcavError::InvalidConfig(format!(
            "unsupported format version {version}, supported 1..={REFERENCE_FORMAT_VERSION}"
        )));
    }
    Ok(())
}

/// Configuration with every derived value filled in. Immutable for the
/// duration of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub experiment: String,
    pub runs: RunSelector,
    pub validity_range: ValidityRange,
    pub dark_reference_path: Option<PathBuf>,
    pub calibration_path: Option<PathBuf>,
    pub version: u32,
    pub processing: ProcessingParams,
}

/// Parameters of the per-event filter pipeline and of the averaging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParams {
    /// Maximum number of valid shots kept for the reference.
    #[serde(default = "default_max_shots")]
    pub max_shots: usize,
    /// Number of bunches expected in every image.
    #[serde(default = "default_num_bunches")]
    pub num_bunches: usize,
    /// Number of consecutive shots averaged into one reference profile.
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    /// Median filter width, pixels.
    #[serde(default = "default_median_filter")]
    pub median_filter: usize,
    /// Noise threshold in standard deviations.
    #[serde(default = "default_snr_filter")]
    pub snr_filter: f64,
    /// Fraction of the profile peak that defines the trace waist.
    #[serde(default = "default_roi_waist_threshold")]
    pub roi_waist_threshold: f64,
    /// Number of waists the cropped ROI spans around the trace centre.
    #[serde(default = "default_roi_expand")]
    pub roi_expand: f64,
    #[serde(default)]
    pub island_split_method: IslandSplitMethod,
    /// Maximum area ratio between the largest and the smallest kept island.
    #[serde(default = "default_island_split_par1")]
    pub island_split_par1: f64,
    /// Minimum area ratio between the smallest kept island and the next one.
    #[serde(default = "default_island_split_par2")]
    pub island_split_par2: f64,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            max_shots: DEFAULT_MAX_SHOTS,
            num_bunches: DEFAULT_NUM_BUNCHES,
            group_size: DEFAULT_GROUP_SIZE,
            median_filter: DEFAULT_MEDIAN_FILTER,
            snr_filter: DEFAULT_SNR_FILTER,
            roi_waist_threshold: DEFAULT_ROI_WAIST_THRESHOLD,
            roi_expand: DEFAULT_ROI_EXPAND,
            island_split_method: IslandSplitMethod::default(),
            island_split_par1: DEFAULT_ISLAND_SPLIT_PAR1,
            island_split_par2: DEFAULT_ISLAND_SPLIT_PAR2,
        }
    }
}

impl ProcessingParams {
    pub fn validate(&self) -> Result<()> {
        let positive_counts = [
            ("max_shots", self.max_shots),
            ("num_bunches", self.num_bunches),
            ("group_size", self.group_size),
            ("median_filter", self.median_filter),
        ];
        for (name, value) in positive_counts {
            if value == 0 {
                return Err(XtcavError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if !(self.snr_filter >= 0.0) {
            return Err(XtcavError::InvalidConfig("snr_filter must be >= 0".into()));
        }
        if !(self.roi_waist_threshold > 0.0 && self.roi_waist_threshold <= 1.0) {
            return Err(XtcavError::InvalidConfig(
                "roi_waist_threshold must be in (0, 1]".into(),
            ));
        }
        let positive_ratios = [
            ("roi_expand", self.roi_expand),
            ("island_split_par1", self.island_split_par1),
            ("island_split_par2", self.island_split_par2),
        ];
        for (name, value) in positive_ratios {
            if !(value > 0.0) {
                return Err(XtcavError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Algorithm used to split the trace into one island per bunch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IslandSplitMethod {
    /// Connected non-zero pixels, 4-connectivity.
    #[default]
    #[serde(rename = "scipyLabel")]
    ScipyLabel,
    /// Pixels above a contour level, 8-connectivity.
    #[serde(rename = "contourLabel")]
    ContourLabel,
}

impl fmt::Display for IslandSplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScipyLabel => write!(f, "scipyLabel"),
            Self::ContourLabel => write!(f, "contourLabel"),
        }
    }
}

impl FromStr for IslandSplitMethod {
    type Err = XtcavError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scipylabel" => Ok(Self::ScipyLabel),
            "contourlabel" => Ok(Self::ContourLabel),
            other => Err(XtcavError::InvalidConfig(format!(
                "unknown island split method '{other}'"
            ))),
        }
    }
}

/// Inclusive span of run numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RunSpan {
    first: u32,
    last: u32,
}

/// Selection of runs, written as `"123"`, `"134-156"` or `"145,136"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunSelector {
    spans: Vec<RunSpan>,
}

impl RunSelector {
    pub fn single(run: u32) -> Self {
        Self {
            spans: vec![RunSpan {
                first: run,
                last: run,
            }],
        }
    }

    /// The first run listed; this is the run that gets processed.
    pub fn first(&self) -> u32 {
        self.spans[0].first
    }

    /// All selected runs, in the order they were listed.
    pub fn runs(&self) -> impl Iterator<Item = u32> + '_ {
        self.spans.iter().flat_map(|span| span.first..=span.last)
    }
}

impl FromStr for RunSelector {
    type Err = XtcavError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| XtcavError::InvalidRunSelector(s.to_string()))
        };
        let mut spans = Vec::new();
        for part in s.split(',') {
            let span = match part.split_once('-') {
                Some((first, last)) => RunSpan {
                    first: parse(first)?,
                    last: parse(last)?,
                },
                None => {
                    let run = parse(part)?;
                    RunSpan {
                        first: run,
                        last: run,
                    }
                }
            };
            if span.first > span.last {
                return Err(XtcavError::InvalidRunSelector(s.to_string()));
            }
            spans.push(span);
        }
        Ok(Self { spans })
    }
}

impl fmt::Display for RunSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if span.first == span.last {
                write!(f, "{}", span.first)?;
            } else {
                write!(f, "{}-{}", span.first, span.last)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for RunSelector {
    type Error = XtcavError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<RunSelector> for String {
    fn from(selector: RunSelector) -> Self {
        selector.to_string()
    }
}

/// Upper end of a validity range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunBound {
    Run(u32),
    /// Valid for every later run.
    End,
}

/// Runs for which a reference is valid, written as `"86-120"` or `"86-end"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidityRange {
    pub begin: u32,
    pub end: RunBound,
}

impl ValidityRange {
    pub fn open_ended(begin: u32) -> Self {
        Self {
            begin,
            end: RunBound::End,
        }
    }

    pub fn contains(&self, run: u32) -> bool {
        run >= self.begin
            && match self.end {
                RunBound::Run(end) => run <= end,
                RunBound::End => true,
            }
    }
}

impl FromStr for ValidityRange {
    type Err = XtcavError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || XtcavError::InvalidValidityRange(s.to_string());
        let (begin, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let begin: u32 = begin.trim().parse().map_err(|_| invalid())?;
        let end = match end.trim() {
            "end" => RunBound::End,
            run => {
                let run: u32 = run.parse().map_err(|_| invalid())?;
                if run < begin {
                    return Err(invalid());
                }
                RunBound::Run(run)
            }
        };
        Ok(Self { begin, end })
    }
}

impl fmt::Display for ValidityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            RunBound::Run(end) => write!(f, "{}-{}", self.begin, end),
            RunBound::End => write!(f, "{}-end", self.begin),
        }
    }
}

impl TryFrom<String> for ValidityRange {
    type Error = XtcavError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ValidityRange> for String {
    fn from(range: ValidityRange) -> Self {
        range.to_string()
    }
}

fn default_experiment() -> String {
    DEFAULT_EXPERIMENT.to_string()
}
fn default_runs() -> RunSelector {
    RunSelector::single(DEFAULT_RUN)
}
fn default_version() -> u32 {
    REFERENCE_FORMAT_VERSION
}
fn default_max_shots() -> usize {
    DEFAULT_MAX_SHOTS
}
fn default_num_bunches() -> usize {
    DEFAULT_NUM_BUNCHES
}
fn default_group_size() -> usize {
    DEFAULT_GROUP_SIZE
}
fn default_median_filter() -> usize {
    DEFAULT_MEDIAN_FILTER
}
fn default_snr_filter() -> f64 {
    DEFAULT_SNR_FILTER
}
fn default_roi_waist_threshold() -> f64 {
    DEFAULT_ROI_WAIST_THRESHOLD
}
fn default_roi_expand() -> f64 {
    DEFAULT_ROI_EXPAND
}
fn default_island_split_par1() -> f64 {
    DEFAULT_ISLAND_SPLIT_PAR1
}
fn default_island_split_par2() -> f64 {
    DEFAULT_ISLAND_SPLIT_PAR2
}
