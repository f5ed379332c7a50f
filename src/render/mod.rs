//! GPU backend: device setup, the quilt compositor and the demo scene.

pub mod compositor;
pub mod gpu;
pub mod scene;

use crate::capture::CameraRig;

/// Texture format of the quilt and of every tile target; tiles are copied
/// into the quilt pixel-exactly, so the formats must match.
pub const QUILT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Anything able to draw the scene for one view. The compositor calls this
/// once per view per capture with the capture's off-axis camera; the
/// implementation must clear its targets itself.
pub trait ViewRenderer {
    fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        camera: &CameraRig,
    );
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Fullscreen quad for the blit and interleave passes, drawn as a triangle
/// strip.
pub const QUAD: [QuadVertex; 4] = [
    //   NDC pos         UV
    QuadVertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    QuadVertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    QuadVertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    QuadVertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}
