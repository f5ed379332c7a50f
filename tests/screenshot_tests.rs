use std::fs;
use std::path::Path;

use quilt_display::error::Error;
use quilt_display::screenshot::next_numbered_filename;

#[test]
fn empty_directory_yields_suffix_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = next_numbered_filename(dir.path(), "screenshot", "png").unwrap();
    assert_eq!(path, dir.path().join("screenshot_000.png"));
}

#[test]
fn existing_files_are_skipped_in_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quilt_000.png"), []).unwrap();
    fs::write(dir.path().join("quilt_001.png"), []).unwrap();

    let path = next_numbered_filename(dir.path(), "quilt", "png").unwrap();
    assert_eq!(path, dir.path().join("quilt_002.png"));
}

#[test]
fn gaps_are_filled_with_the_smallest_free_suffix() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quilt_000.png"), []).unwrap();
    fs::write(dir.path().join("quilt_002.png"), []).unwrap();

    let path = next_numbered_filename(dir.path(), "quilt", "png").unwrap();
    assert_eq!(path, dir.path().join("quilt_001.png"));
}

#[test]
fn different_stems_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("other_000.png"), []).unwrap();

    let path = next_numbered_filename(dir.path(), "quilt", "png").unwrap();
    assert_eq!(path, dir.path().join("quilt_000.png"));
}

#[test]
fn missing_directory_is_an_error() {
    let err = next_numbered_filename(Path::new("/nonexistent/shots"), "quilt", "png").unwrap_err();
    assert!(matches!(err, Error::BadScreenshotDir(_)));
}
