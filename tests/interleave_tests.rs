use quilt_display::calibration::CalibrationProfile;
use quilt_display::interleave::{LenticularParams, LenticularUniform};
use quilt_display::tiling::{PRESETS, QuiltLayout};

fn derive_default(preset: usize) -> LenticularParams {
    let profile = CalibrationProfile::default();
    let tiling = PRESETS[preset].tiling;
    let layout = QuiltLayout::new(tiling);
    LenticularParams::derive(&profile, tiling, &layout)
}

#[test]
fn pitch_converts_to_pixels_with_tilt_correction() {
    let params = derive_default(0);
    // 49.91 lenticules/inch over a 2560 px / 338 dpi panel, foreshortened by
    // the lenticule tilt angle atan(1/5.8)
    assert!((params.pitch - 372.52).abs() < 0.1, "pitch {}", params.pitch);
}

#[test]
fn tilt_and_subpixel_match_the_panel_geometry() {
    let params = derive_default(0);
    assert!((params.tilt - 1600.0 / (2560.0 * 5.8)).abs() < 1e-6);
    assert!((params.subpixel - 1.0 / (2560.0 * 3.0)).abs() < 1e-9);
    assert_eq!(params.red_index, 0);
    assert_eq!(params.blue_index, 2);
}

#[test]
fn horizontal_flip_negates_tilt_and_subpixel() {
    let mut profile = CalibrationProfile::default();
    profile.flip_x = 1.0;
    let tiling = PRESETS[0].tiling;
    let layout = QuiltLayout::new(tiling);

    let flipped = LenticularParams::derive(&profile, tiling, &layout);
    let straight = derive_default(0);

    assert_eq!(flipped.tilt, -straight.tilt);
    assert_eq!(flipped.subpixel, -straight.subpixel);
    assert_eq!(flipped.pitch, straight.pitch);
    assert_eq!(flipped.flip_x, 1.0);
}

#[test]
fn subpixel_flip_swaps_red_and_blue() {
    let mut profile = CalibrationProfile::default();
    profile.flip_subpixels = 1.0;
    let tiling = PRESETS[0].tiling;
    let layout = QuiltLayout::new(tiling);

    let params = LenticularParams::derive(&profile, tiling, &layout);
    assert_eq!(params.red_index, 2);
    assert_eq!(params.blue_index, 0);
}

#[test]
fn tiling_portion_feeds_through_to_the_uniform() {
    let params = derive_default(1); // 5x9 @ 4096, one padding pixel per axis
    let uniform = params.to_uniform();

    assert_eq!(uniform.tile[0], 5.0);
    assert_eq!(uniform.tile[1], 9.0);
    assert!((uniform.tile[2] - 4095.0 / 4096.0).abs() < 1e-6);
    assert!((uniform.tile[3] - 4095.0 / 4096.0).abs() < 1e-6);
    assert_eq!(uniform.num_views, 45.0);
}

#[test]
fn uniform_is_sixteen_byte_aligned_for_the_gpu() {
    assert_eq!(std::mem::size_of::<LenticularUniform>(), 64);
    assert_eq!(std::mem::size_of::<LenticularUniform>() % 16, 0);
}

#[test]
fn single_tile_preset_degenerates_to_one_view() {
    let params = derive_default(3); // 2D preset
    assert_eq!(params.num_views, 1.0);
    assert_eq!(params.tiles_x, 1.0);
    assert_eq!(params.tiles_y, 1.0);
}
