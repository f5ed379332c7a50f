use std::fs;
use std::path::Path;

use quilt_display::calibration::{CalibrationProfile, FIELDS, Provenance, SCHEMA_VERSION};
use quilt_display::error::Error;

#[test]
fn defaults_come_from_the_descriptor_table() {
    let profile = CalibrationProfile::default();
    assert_eq!(profile.version, SCHEMA_VERSION);
    assert_eq!(profile.pitch, 49.91);
    assert_eq!(profile.slope, 5.8);
    assert_eq!(profile.center, 0.0);
    assert_eq!(profile.view_cone, 40.0);
    assert_eq!(profile.dpi, 338.0);
    assert_eq!(profile.screen_w, 2560.0);
    assert_eq!(profile.screen_h, 1600.0);
    assert_eq!(profile.provenance, Provenance::Defaults);

    for spec in FIELDS {
        assert!(
            spec.min <= spec.default && spec.default <= spec.max,
            "{} default {} outside [{}, {}]",
            spec.name,
            spec.default,
            spec.min,
            spec.max
        );
    }
}

#[test]
fn missing_file_is_an_error_and_load_or_default_recovers() {
    let path = Path::new("/nonexistent/visual.json");
    let err = CalibrationProfile::load_from_file(path).unwrap_err();
    assert!(matches!(err, Error::MissingCalibration(_)));

    let profile = CalibrationProfile::load_or_default(path);
    assert_eq!(profile, CalibrationProfile::default());
    assert_eq!(profile.provenance, Provenance::Defaults);
}

#[test]
fn file_without_json_braces_is_rejected_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    for contents in ["", "   \n", "calibration pending"] {
        fs::write(&path, contents).unwrap();
        let err = CalibrationProfile::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::EmptyCalibration(_)), "contents {contents:?}");
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    fs::write(&path, "{\"pitch\": }").unwrap();
    let err = CalibrationProfile::load_from_file(&path).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn bare_numbers_parse_and_missing_fields_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    fs::write(&path, r#"{"pitch": 47.5, "slope": -6.2}"#).unwrap();

    let profile = CalibrationProfile::load_from_file(&path).unwrap();
    assert_eq!(profile.pitch, 47.5);
    assert_eq!(profile.slope, -6.2);
    assert_eq!(profile.center, 0.0);
    assert_eq!(profile.view_cone, 40.0);
    assert_eq!(profile.provenance, Provenance::File(path));
}

#[test]
fn wrapped_values_parse_like_device_written_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    fs::write(
        &path,
        r#"{
            "configVersion": {"value": 0.4},
            "pitch": {"value": 52.3},
            "viewCone": {"value": 35.0},
            "DPI": {"value": 324.0},
            "screenW": {"value": 3840.0},
            "screenH": {"value": 2160.0},
            "flipSubp": {"value": 1.0}
        }"#,
    )
    .unwrap();

    let profile = CalibrationProfile::load_from_file(&path).unwrap();
    assert_eq!(profile.pitch, 52.3);
    assert_eq!(profile.view_cone, 35.0);
    assert_eq!(profile.dpi, 324.0);
    assert_eq!(profile.screen_w, 3840.0);
    assert_eq!(profile.screen_h, 2160.0);
    assert_eq!(profile.flip_subpixels, 1.0);
}

#[test]
fn negative_view_cone_is_stored_as_magnitude() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    fs::write(&path, r#"{"viewCone": -35.0}"#).unwrap();

    let profile = CalibrationProfile::load_from_file(&path).unwrap();
    assert_eq!(profile.view_cone, 35.0);
}

#[test]
fn out_of_range_values_are_clamped_and_integers_rounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");
    fs::write(
        &path,
        r#"{"pitch": 1000.0, "slope": -50.0, "center": 3.0, "DPI": 338.4, "flipImageX": 0.9}"#,
    )
    .unwrap();

    let profile = CalibrationProfile::load_from_file(&path).unwrap();
    assert_eq!(profile.pitch, 200.0);
    assert_eq!(profile.slope, -30.0);
    assert_eq!(profile.center, 1.0);
    assert_eq!(profile.dpi, 338.0);
    assert_eq!(profile.flip_x, 1.0);
}

#[test]
fn device_memory_requires_an_exact_schema_version() {
    let mut stale = CalibrationProfile::default();
    stale.version = 0.3;
    let err = CalibrationProfile::from_device_memory(stale).unwrap_err();
    assert!(matches!(
        err,
        Error::VersionMismatch { found, expected }
            if found == 0.3 && expected == SCHEMA_VERSION
    ));

    let mut current = CalibrationProfile::default();
    current.view_cone = -50.0;
    let adopted = CalibrationProfile::from_device_memory(current).unwrap();
    assert_eq!(adopted.provenance, Provenance::DeviceMemory);
    assert_eq!(adopted.view_cone, 50.0);
}

#[test]
fn save_and_reload_round_trips_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visual.json");

    let mut original = CalibrationProfile::default();
    original.pitch = 51.2;
    original.slope = -4.4;
    original.center = 0.12;
    original.view_cone = 50.0;
    original.vertical_angle = -2.0;
    original.flip_y = 1.0;
    original.save_to_file(&path).unwrap();

    let loaded = CalibrationProfile::load_from_file(&path).unwrap();
    let mut expected = original;
    expected.provenance = Provenance::File(path);
    assert_eq!(loaded, expected);
}

#[test]
fn aspect_is_width_over_height() {
    let profile = CalibrationProfile::default();
    assert!((profile.aspect() - 1.6).abs() < 1e-6);
}
