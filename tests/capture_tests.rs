use glam::{Mat4, Vec3};
use quilt_display::capture::{MIN_PERSPECTIVE_NEAR, RENDER_FOV_DEG, ViewCapture};

const EPS: f32 = 1e-4;

fn assert_mat_close(a: Mat4, b: Mat4, context: &str) {
    let a = a.to_cols_array();
    let b = b.to_cols_array();
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!((x - y).abs() < EPS, "{context}: element {i}: {x} vs {y}");
    }
}

#[test]
fn adjusted_distance_inverts_the_fov_relation() {
    let capture = ViewCapture::new();
    let d = capture.adjusted_distance();
    assert!(d > 0.0);
    // distance * tan(fov/2) recovers the focal-plane half-height
    let half = d * (capture.fov_deg * 0.5).to_radians().tan();
    assert!((half - capture.size).abs() < 1e-3);
}

#[test]
fn adjusted_distance_is_zero_for_orthographic() {
    let mut capture = ViewCapture::new();
    capture.orthographic = true;
    assert_eq!(capture.adjusted_distance(), 0.0);
}

#[test]
fn adjusted_distance_grows_with_size() {
    let mut capture = ViewCapture::new();
    let mut last = 0.0;
    for size in [1.0, 2.0, 5.0, 10.0] {
        capture.size = size;
        let d = capture.adjusted_distance();
        assert!(d > last, "distance not monotonic at size {size}");
        last = d;
    }
}

#[test]
fn configure_is_idempotent() {
    let mut capture = ViewCapture::new();
    capture.configure(1.6, 3.0, true);
    let first = *capture.rig().unwrap();
    capture.configure(1.6, 3.0, true);
    let second = *capture.rig().unwrap();
    assert_eq!(first, second);
}

#[test]
fn zero_offset_matches_reset_configuration() {
    let mut capture = ViewCapture::new();
    capture.configure(1.6, 0.0, true);
    let reset = *capture.rig().unwrap();

    capture.apply_off_axis_offset(0.0, 0.0);
    let explicit = *capture.rig().unwrap();

    assert_eq!(reset.view, explicit.view);
    assert_eq!(reset.proj, explicit.proj);
    assert_eq!(capture.current_offset(), (0.0, 0.0));
}

#[test]
fn off_axis_offset_shifts_view_and_shears_projection() {
    let aspect = 1.6;
    let mut capture = ViewCapture::new();
    capture.configure(aspect, 0.0, true);
    let base = *capture.rig().unwrap();

    let (h, v) = (10.0f32, 4.0f32);
    capture.apply_off_axis_offset(h, v);
    let rig = *capture.rig().unwrap();

    let d = capture.adjusted_distance();
    let offset_x = d * h.to_radians().tan();
    let offset_y = d * v.to_radians().tan();
    assert_eq!(capture.current_offset(), (offset_x, offset_y));

    // view matrix translates, projection shears; everything else is untouched
    assert!((rig.view.w_axis.x - (base.view.w_axis.x - offset_x)).abs() < EPS);
    assert!((rig.view.w_axis.y - (base.view.w_axis.y - offset_y)).abs() < EPS);
    assert!((rig.view.w_axis.z - base.view.w_axis.z).abs() < EPS);
    assert_mat_close(
        Mat4::from_cols(rig.view.x_axis, rig.view.y_axis, rig.view.z_axis, base.view.w_axis),
        Mat4::from_cols(base.view.x_axis, base.view.y_axis, base.view.z_axis, base.view.w_axis),
        "view rotation changed",
    );

    let shear_x = offset_x / (capture.size * aspect);
    let shear_y = offset_y / capture.size;
    assert!((rig.proj.z_axis.x - (base.proj.z_axis.x - shear_x)).abs() < EPS);
    assert!((rig.proj.z_axis.y - (base.proj.z_axis.y - shear_y)).abs() < EPS);
    assert!((rig.proj.x_axis.x - base.proj.x_axis.x).abs() < EPS);
    assert!((rig.proj.y_axis.y - base.proj.y_axis.y).abs() < EPS);
}

#[test]
fn orthographic_offset_rotates_without_translating() {
    let mut capture = ViewCapture::new();
    capture.orthographic = true;
    capture.configure(1.6, 0.0, true);
    let base_proj = capture.rig().unwrap().proj;

    capture.apply_off_axis_offset(15.0, 0.0);
    let rig = *capture.rig().unwrap();

    assert_eq!(capture.current_offset(), (0.0, 0.0));
    assert!(rig.view.w_axis.truncate().length() < EPS, "view translated");
    assert_mat_close(rig.proj, base_proj, "orthographic projection changed with angle");
    assert_mat_close(
        rig.view,
        Mat4::from_rotation_y((-15.0f32).to_radians()),
        "orthographic view is not a pure rotation",
    );
}

#[test]
fn perspective_near_is_clamped_positive() {
    let mut capture = ViewCapture::new();
    // fov 90 puts the camera at distance == size; this near factor would
    // push the near plane behind the eye
    capture.fov_deg = 90.0;
    capture.near_factor = 2.0;
    capture.configure(1.0, 0.0, true);

    let rig = capture.rig().unwrap();
    assert_eq!(rig.near, MIN_PERSPECTIVE_NEAR);
    assert!(rig.far > rig.near);
}

#[test]
fn far_plane_is_kept_in_front_of_near() {
    let mut capture = ViewCapture::new();
    capture.fov_deg = 90.0;
    capture.near_factor = 0.0;
    capture.far_factor = -2.0;
    capture.configure(1.0, 0.0, true);

    let rig = capture.rig().unwrap();
    assert!(rig.far > rig.near);
    assert!((rig.far - (rig.near + MIN_PERSPECTIVE_NEAR)).abs() < EPS);
}

#[test]
fn detached_capture_skips_all_work() {
    let mut capture = ViewCapture::detached();
    assert!(!capture.has_rig());

    capture.configure(1.6, 0.0, true);
    capture.apply_off_axis_offset(10.0, 0.0);
    assert!(capture.rig().is_none());

    capture.render_view(10.0, 0.0, |_| panic!("draw must not run without a rig"));
}

#[test]
fn render_view_forces_neutral_fov_and_restores_it() {
    let mut capture = ViewCapture::new();
    capture.configure(1.6, 0.0, true);
    let configured = capture.fov_deg;

    let mut seen_fov = 0.0;
    let mut seen_proj = Mat4::ZERO;
    capture.render_view(5.0, 0.0, |rig| {
        seen_fov = rig.fov_deg;
        seen_proj = rig.proj;
    });

    assert_eq!(seen_fov, RENDER_FOV_DEG);
    let rig = capture.rig().unwrap();
    assert_eq!(rig.fov_deg, configured);
    // the override touches the advertised fov only, never the matrix
    assert_eq!(rig.proj, seen_proj);
}

#[test]
fn frustum_corners_at_focal_distance_match_the_size() {
    let mut capture = ViewCapture::new();
    capture.configure(1.0, 0.0, true);
    let d = capture.adjusted_distance();

    let corners = capture.frustum_corners(d).unwrap();
    let expected = [
        Vec3::new(-5.0, -5.0, 0.0),
        Vec3::new(5.0, -5.0, 0.0),
        Vec3::new(5.0, 5.0, 0.0),
        Vec3::new(-5.0, 5.0, 0.0),
    ];
    for (got, want) in corners.iter().zip(expected.iter()) {
        assert!(
            got.distance(*want) < 1e-2,
            "corner {got:?} expected near {want:?}"
        );
    }
}

#[test]
fn frustum_corners_require_a_rig() {
    let capture = ViewCapture::detached();
    assert!(capture.frustum_corners(1.0).is_none());
}
