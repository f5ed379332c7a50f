//! Per-view capture: one rig-mounted camera rendered with a perspective
//! offset for each slice of the multi-view fan.
//!
//! The off-axis trick is a dual adjustment. The view matrix slides the
//! eyepoint sideways without rotating it, which keeps the focal plane fixed
//! in world space; the projection matrix shears the frustum by the matching
//! amount so the same focal window stays framed. Either half alone is wrong:
//! translation shifts the rendered frame, shear alone never moves the eye.

use glam::{Mat4, Vec3};

/// Neutral field of view forced during the actual render call. Decoupled from
/// the per-view projection (which is set explicitly as a matrix); it only
/// feeds shadow/culling heuristics downstream.
pub const RENDER_FOV_DEG: f32 = 60.0;

/// Perspective cameras are never handed a frustum with near <= 0.
pub const MIN_PERSPECTIVE_NEAR: f32 = 1.0e-3;

/// The rendering-camera resource a capture exclusively owns and reconfigures
/// per view. Plain data: matrices plus the scalar state a scene renderer
/// needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub aspect: f32,
    pub fov_deg: f32,
    pub orthographic: bool,
    pub ortho_size: f32,
    pub near: f32,
    pub far: f32,
    pub view: Mat4,
    pub proj: Mat4,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            aspect: 1.0,
            fov_deg: 13.5,
            orthographic: false,
            ortho_size: 5.0,
            near: 0.1,
            far: 100.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        }
    }
}

/// Renders a single viewpoint of the scene. One capture maps to exactly one
/// camera rig; while the rig is absent (setup in progress) every
/// configuration call is a no-op rather than an error.
#[derive(Debug, Clone)]
pub struct ViewCapture {
    /// Focal-plane half-height equivalent. Resizing the capture goes through
    /// this, not through the transform.
    pub size: f32,
    /// Configured field of view in degrees. Determined by calibration;
    /// changing it desyncs touch input from the visual.
    pub fov_deg: f32,
    /// Fraction of `size` rendered in front of the focal plane.
    pub near_factor: f32,
    /// Fraction of `size` rendered behind the focal plane.
    pub far_factor: f32,
    pub orthographic: bool,
    /// Rig-to-world transform; the focal plane sits at this frame's origin.
    pub world_from_rig: Mat4,
    /// Inactive captures are skipped by the compositor without being removed
    /// from the list.
    pub enabled: bool,
    rig: Option<CameraRig>,
    aspect: f32,
    vertical_angle: f32,
    offset: (f32, f32),
}

impl Default for ViewCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCapture {
    pub fn new() -> Self {
        Self {
            size: 5.0,
            fov_deg: 13.5,
            near_factor: 0.5,
            far_factor: 0.5,
            orthographic: false,
            world_from_rig: Mat4::IDENTITY,
            enabled: true,
            rig: Some(CameraRig::default()),
            aspect: 1.0,
            vertical_angle: 0.0,
            offset: (0.0, 0.0),
        }
    }

    /// A capture whose camera has not been attached yet.
    pub fn detached() -> Self {
        Self {
            rig: None,
            ..Self::new()
        }
    }

    pub fn attach_rig(&mut self, rig: CameraRig) {
        self.rig = Some(rig);
    }

    pub fn has_rig(&self) -> bool {
        self.rig.is_some()
    }

    pub fn rig(&self) -> Option<&CameraRig> {
        self.rig.as_ref()
    }

    /// Horizontal/vertical view-space offsets applied by the last
    /// [`Self::apply_off_axis_offset`]. Read accessor for external
    /// visualization.
    pub fn current_offset(&self) -> (f32, f32) {
        self.offset
    }

    /// Camera distance from the focal plane after adjusting for FOV.
    /// Orthographic cameras have no distance-based offset and report 0.
    pub fn adjusted_distance(&self) -> f32 {
        if self.orthographic {
            return 0.0;
        }
        self.size / (self.fov_deg * 0.5).to_radians().tan()
    }

    /// Absolute reconfiguration of the owned camera. Callable every frame
    /// without accumulating drift: pose, clip planes and projection are reset
    /// from scratch on each call.
    pub fn configure(&mut self, aspect: f32, vertical_angle_deg: f32, reset_offset: bool) {
        self.aspect = aspect;
        self.vertical_angle = vertical_angle_deg;

        let distance = self.adjusted_distance();
        let mut near = distance - self.near_factor * self.size;
        if !self.orthographic {
            near = near.max(MIN_PERSPECTIVE_NEAR);
        }
        let mut far = distance + self.far_factor * self.size;
        if far <= near {
            far = near + MIN_PERSPECTIVE_NEAR;
        }

        let Some(rig) = self.rig.as_mut() else {
            return;
        };
        rig.aspect = aspect;
        rig.fov_deg = self.fov_deg;
        rig.orthographic = self.orthographic;
        rig.ortho_size = self.size;
        rig.near = near;
        rig.far = far;

        if reset_offset {
            self.apply_off_axis_offset(0.0, vertical_angle_deg);
        }
    }

    /// Canonical un-offset view matrix: the camera sits `adjusted_distance`
    /// behind the focal plane along the rig's local +Z, looking down -Z at
    /// the rig origin.
    fn canonical_view(&self) -> Mat4 {
        let camera_world =
            self.world_from_rig * Mat4::from_translation(Vec3::new(0.0, 0.0, self.adjusted_distance()));
        camera_world.inverse()
    }

    fn canonical_proj(&self, near: f32, far: f32) -> Mat4 {
        if self.orthographic {
            Mat4::orthographic_rh(
                -self.size * self.aspect,
                self.size * self.aspect,
                -self.size,
                self.size,
                near,
                far,
            )
        } else {
            Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, near, far)
        }
    }

    /// Re-derive the camera's view and projection from their canonical state,
    /// then apply the off-axis offset for the given fan angles.
    pub fn apply_off_axis_offset(&mut self, horizontal_deg: f32, vertical_deg: f32) {
        let Some(rig) = self.rig else {
            return;
        };
        let (near, far) = (rig.near, rig.far);

        if self.orthographic {
            // Parallel projection: multi-view uses rotation only, no
            // translation offset.
            let view =
                Mat4::from_rotation_y((-horizontal_deg).to_radians()) * self.world_from_rig.inverse();
            let proj = self.canonical_proj(near, far);
            self.offset = (0.0, 0.0);
            if let Some(rig) = self.rig.as_mut() {
                rig.view = view;
                rig.proj = proj;
            }
            return;
        }

        let distance = self.adjusted_distance();
        // Similar triangles between the pivot, the camera, and the camera's
        // shifted position: tan(angle) = offset / distance.
        let offset_x = distance * horizontal_deg.to_radians().tan();
        let offset_y = distance * vertical_deg.to_radians().tan();

        let mut view = self.canonical_view();
        view.w_axis.x -= offset_x;
        view.w_axis.y -= offset_y;

        let mut proj = self.canonical_proj(near, far);
        proj.z_axis.x -= offset_x / (self.size * self.aspect);
        proj.z_axis.y -= offset_y / self.size;

        self.offset = (offset_x, offset_y);
        if let Some(rig) = self.rig.as_mut() {
            rig.view = view;
            rig.proj = proj;
        }
    }

    /// Apply the offset for one view and hand the rig to `draw`. The rig's
    /// advertised FOV is forced to [`RENDER_FOV_DEG`] for the duration of the
    /// call and restored afterwards; the off-axis projection matrix itself is
    /// untouched by the override.
    pub fn render_view<F>(&mut self, horizontal_deg: f32, vertical_deg: f32, draw: F)
    where
        F: FnOnce(&CameraRig),
    {
        if self.rig.is_none() {
            return;
        }
        self.apply_off_axis_offset(horizontal_deg, vertical_deg);
        let configured = self.fov_deg;
        if let Some(rig) = self.rig.as_mut() {
            rig.fov_deg = RENDER_FOV_DEG;
        }
        if let Some(rig) = self.rig.as_ref() {
            draw(rig);
        }
        if let Some(rig) = self.rig.as_mut() {
            rig.fov_deg = configured;
        }
    }

    /// World-space corners of the (symmetric) frustum cross-section at the
    /// given view-space distance, counterclockwise from bottom-left. Read
    /// accessor for an external visualization layer.
    pub fn frustum_corners(&self, distance: f32) -> Option<[Vec3; 4]> {
        let rig = self.rig.as_ref()?;
        let half_h = if self.orthographic {
            self.size
        } else {
            distance * (self.fov_deg * 0.5).to_radians().tan()
        };
        let half_w = half_h * self.aspect;
        let camera_world = rig.view.inverse();
        let corner = |x: f32, y: f32| camera_world.transform_point3(Vec3::new(x, y, -distance));
        Some([
            corner(-half_w, -half_h),
            corner(half_w, -half_h),
            corner(half_w, half_h),
            corner(-half_w, half_h),
        ])
    }
}
