use std::path::PathBuf;

use xtcav_core::consts::{DEFAULT_MAX_SHOTS, REFERENCE_FORMAT_VERSION};
use xtcav_core::error::XtcavError;
use xtcav_core::pipeline::config::{
    check_format_version, IslandSplitMethod, ProcessingParams, ReferenceConfig, RunBound,
    RunSelector, ValidityRange,
};
use xtcav_core::pipeline::PipelineStage;

// ---------------------------------------------------------------------------
// RunSelector
// ---------------------------------------------------------------------------

#[test]
fn test_run_selector_single() {
    let runs: RunSelector = "123".parse().unwrap();
    assert_eq!(runs.first(), 123);
    assert_eq!(runs.runs().collect::<Vec<_>>(), vec![123]);
    assert_eq!(runs.to_string(), "123");
}

#[test]
fn test_run_selector_range() {
    let runs: RunSelector = "134-137".parse().unwrap();
    assert_eq!(runs.first(), 134);
    assert_eq!(runs.runs().collect::<Vec<_>>(), vec![134, 135, 136, 137]);
    assert_eq!(runs.to_string(), "134-137");
}

#[test]
fn test_run_selector_list_keeps_order() {
    let runs: RunSelector = "145,136".parse().unwrap();
    assert_eq!(runs.first(), 145);
    assert_eq!(runs.runs().collect::<Vec<_>>(), vec![145, 136]);
    assert_eq!(runs.to_string(), "145,136");
}

#[test]
fn test_run_selector_rejects_garbage() {
    for bad in ["", "abc", "5-3", "1,,2", "7-"] {
        assert!(
            matches!(bad.parse::<RunSelector>(), Err(XtcavError::InvalidRunSelector(_))),
            "{bad:?} should not parse"
        );
    }
}

// ---------------------------------------------------------------------------
// ValidityRange
// ---------------------------------------------------------------------------

#[test]
fn test_validity_open_ended() {
    let range: ValidityRange = "86-end".parse().unwrap();
    assert_eq!(range, ValidityRange::open_ended(86));
    assert!(range.contains(86));
    assert!(range.contains(10_000));
    assert!(!range.contains(85));
    assert_eq!(range.to_string(), "86-end");
}

#[test]
fn test_validity_closed() {
    let range: ValidityRange = "86-120".parse().unwrap();
    assert_eq!(range.end, RunBound::Run(120));
    assert!(range.contains(120));
    assert!(!range.contains(121));
    assert_eq!(range.to_string(), "86-120");
}

#[test]
fn test_validity_rejects_reversed_range() {
    assert!("120-86".parse::<ValidityRange>().is_err());
    assert!("86".parse::<ValidityRange>().is_err());
    assert!("x-end".parse::<ValidityRange>().is_err());
}

// ---------------------------------------------------------------------------
// IslandSplitMethod
// ---------------------------------------------------------------------------

#[test]
fn test_island_split_method_names() {
    assert_eq!(IslandSplitMethod::default(), IslandSplitMethod::ScipyLabel);
    assert_eq!(format!("{}", IslandSplitMethod::ContourLabel), "contourLabel");
    assert_eq!(
        "CONTOURLABEL".parse::<IslandSplitMethod>().unwrap(),
        IslandSplitMethod::ContourLabel
    );
    assert!("watershed".parse::<IslandSplitMethod>().is_err());
}

#[test]
fn test_island_split_method_serde_name() {
    let json = serde_json::to_string(&IslandSplitMethod::ScipyLabel).unwrap();
    assert_eq!(json, "\"scipyLabel\"");
}

// ---------------------------------------------------------------------------
// ReferenceConfig
// ---------------------------------------------------------------------------

#[test]
fn test_defaults() {
    let config = ReferenceConfig::default();
    assert_eq!(config.experiment, "amoc8114");
    assert_eq!(config.runs.first(), 86);
    assert_eq!(config.processing.max_shots, DEFAULT_MAX_SHOTS);
    assert_eq!(config.processing.group_size, 5);
    assert_eq!(config.processing.num_bunches, 1);
    assert_eq!(config.version, REFERENCE_FORMAT_VERSION);
    assert!(config.validity_range.is_none());
}

#[test]
fn test_resolve_fills_validity_from_first_run() {
    let config = ReferenceConfig {
        runs: "91,88".parse().unwrap(),
        ..Default::default()
    };
    let resolved = config.resolve(None).unwrap();
    assert_eq!(resolved.validity_range.to_string(), "91-end");
    assert!(resolved.dark_reference_path.is_none());
}

#[test]
fn test_resolve_keeps_explicit_validity_and_dark_path() {
    let config = ReferenceConfig {
        validity_range: Some("80-90".parse().unwrap()),
        ..Default::default()
    };
    let dark = PathBuf::from("calib/amoc8114/pedestals/80-end.json");
    let resolved = config.resolve(Some(dark.clone())).unwrap();
    assert_eq!(resolved.validity_range.to_string(), "80-90");
    assert_eq!(resolved.dark_reference_path, Some(dark));
    // The user-facing config is untouched.
    assert!(config.dark_reference_path.is_none());
}

#[test]
fn test_resolve_validates_processing() {
    let config = ReferenceConfig {
        processing: ProcessingParams {
            group_size: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        config.resolve(None),
        Err(XtcavError::InvalidConfig(_))
    ));
}

#[test]
fn test_resolve_rejects_unknown_version() {
    let config = ReferenceConfig {
        version: REFERENCE_FORMAT_VERSION + 1,
        ..Default::default()
    };
    assert!(config.resolve(None).is_err());
}

#[test]
fn test_format_version_bounds() {
    assert!(check_format_version(0).is_err());
    assert!(check_format_version(1).is_ok());
    assert!(check_format_version(REFERENCE_FORMAT_VERSION).is_ok());
    assert!(check_format_version(REFERENCE_FORMAT_VERSION + 1).is_err());
    let config = ReferenceConfig {
        version: 0,
        ..Default::default()
    };
    assert!(config.resolve(None).is_err());
}

#[test]
fn test_processing_validation() {
    assert!(ProcessingParams::default().validate().is_ok());
    let bad_waist = ProcessingParams {
        roi_waist_threshold: 1.5,
        ..Default::default()
    };
    assert!(bad_waist.validate().is_err());
    let bad_snr = ProcessingParams {
        snr_filter: f64::NAN,
        ..Default::default()
    };
    assert!(bad_snr.validate().is_err());
}

#[test]
fn test_toml_round_trip() {
    let config = ReferenceConfig {
        runs: "134-156".parse().unwrap(),
        validity_range: Some("134-end".parse().unwrap()),
        calibration_path: Some(PathBuf::from("/data/calib")),
        ..Default::default()
    };
    let text = toml::to_string_pretty(&config).unwrap();
    let restored: ReferenceConfig = toml::from_str(&text).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_toml_partial_file_uses_defaults() {
    let text = r#"
experiment = "xppc0114"
runs = "12"

[processing]
num_bunches = 2
island_split_method = "contourLabel"
"#;
    let config: ReferenceConfig = toml::from_str(text).unwrap();
    assert_eq!(config.experiment, "xppc0114");
    assert_eq!(config.runs.first(), 12);
    assert_eq!(config.processing.num_bunches, 2);
    assert_eq!(
        config.processing.island_split_method,
        IslandSplitMethod::ContourLabel
    );
    assert_eq!(config.processing.group_size, 5);
    assert_eq!(config.version, REFERENCE_FORMAT_VERSION);
}

// ---------------------------------------------------------------------------
// PipelineStage Display
// ---------------------------------------------------------------------------

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(format!("{}", PipelineStage::Processing), "Processing shots");
    assert_eq!(format!("{}", PipelineStage::Averaging), "Averaging profiles");
}
