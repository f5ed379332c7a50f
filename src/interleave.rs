//! Derivation of the interleaving-pass parameters from a calibration profile
//! and the active tiling. Recomputed on every profile or tiling change, not
//! only at startup, because the profile can be hot-reloaded.

use bytemuck::{Pod, Zeroable};

use crate::calibration::CalibrationProfile;
use crate::tiling::{QuiltLayout, Tiling};

/// Parameters bound to the lenticular interleaving pass before every
/// composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LenticularParams {
    /// Lenticular pitch converted from physical units to a pixel pitch,
    /// corrected for the lenticule tilt angle.
    pub pitch: f32,
    pub tilt: f32,
    pub center: f32,
    pub invert_view: f32,
    pub flip_x: f32,
    pub flip_y: f32,
    /// Width of one color subpixel in screen UV units (three per pixel
    /// column).
    pub subpixel: f32,
    pub red_index: u32,
    pub blue_index: u32,
    pub tiles_x: f32,
    pub tiles_y: f32,
    pub portion_x: f32,
    pub portion_y: f32,
    pub num_views: f32,
}

impl LenticularParams {
    pub fn derive(profile: &CalibrationProfile, tiling: Tiling, layout: &QuiltLayout) -> Self {
        let flip_x = profile.flip_x >= 0.5;

        let screen_inches = profile.screen_w / profile.dpi;
        let pitch = profile.pitch * screen_inches * (1.0 / profile.slope).atan().cos();

        let mut tilt = profile.screen_h / (profile.screen_w * profile.slope);
        if flip_x {
            tilt = -tilt;
        }

        let mut subpixel = 1.0 / (profile.screen_w * 3.0);
        if flip_x {
            subpixel = -subpixel;
        }

        let (red_index, blue_index) = if profile.flip_subpixels >= 0.5 {
            (2, 0)
        } else {
            (0, 2)
        };

        Self {
            pitch,
            tilt,
            center: profile.center,
            invert_view: profile.invert_view,
            flip_x: profile.flip_x,
            flip_y: profile.flip_y,
            subpixel,
            red_index,
            blue_index,
            tiles_x: tiling.tiles_x as f32,
            tiles_y: tiling.tiles_y as f32,
            portion_x: layout.portion_x,
            portion_y: layout.portion_y,
            num_views: layout.num_views as f32,
        }
    }

    pub fn to_uniform(self) -> LenticularUniform {
        LenticularUniform {
            pitch: self.pitch,
            tilt: self.tilt,
            center: self.center,
            invert_view: self.invert_view,
            flip_x: self.flip_x,
            flip_y: self.flip_y,
            subpixel: self.subpixel,
            num_views: self.num_views,
            tile: [self.tiles_x, self.tiles_y, self.portion_x, self.portion_y],
            red_index: self.red_index,
            blue_index: self.blue_index,
            _pad: [0; 2],
        }
    }
}

/// GPU-side layout of the interleaving parameters; matches the WGSL struct
/// in `render/shaders/lenticular.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LenticularUniform {
    pub pitch: f32,
    pub tilt: f32,
    pub center: f32,
    pub invert_view: f32,
    pub flip_x: f32,
    pub flip_y: f32,
    pub subpixel: f32,
    pub num_views: f32,
    pub tile: [f32; 4],
    pub red_index: u32,
    pub blue_index: u32,
    pub _pad: [u32; 2],
}
