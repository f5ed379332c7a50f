//! Minimal demo scene: a slowly turning colored cube over a ground plane,
//! framed by the capture's focal plane. Exists to exercise the full
//! capture-to-quilt pipeline; any [`ViewRenderer`] can stand in for it.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::capture::CameraRig;
use crate::render::{DEPTH_FORMAT, QUILT_FORMAT, ViewRenderer};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneVertex {
    pos: [f32; 3],
    color: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SceneUniform {
    mvp: [[f32; 4]; 4],
}

const fn v(pos: [f32; 3], color: [f32; 3]) -> SceneVertex {
    SceneVertex { pos, color }
}

fn cube_face(verts: &mut Vec<SceneVertex>, corners: [[f32; 3]; 4], color: [f32; 3]) {
    let [a, b, c, d] = corners;
    for p in [a, b, c, a, c, d] {
        verts.push(v(p, color));
    }
}

fn build_geometry() -> Vec<SceneVertex> {
    let s = 1.2;
    let mut verts = Vec::with_capacity(42);
    // +X red, -X teal, +Y green, -Y purple, +Z blue, -Z yellow
    cube_face(
        &mut verts,
        [[s, -s, -s], [s, s, -s], [s, s, s], [s, -s, s]],
        [0.9, 0.2, 0.2],
    );
    cube_face(
        &mut verts,
        [[-s, -s, s], [-s, s, s], [-s, s, -s], [-s, -s, -s]],
        [0.2, 0.8, 0.8],
    );
    cube_face(
        &mut verts,
        [[-s, s, -s], [-s, s, s], [s, s, s], [s, s, -s]],
        [0.2, 0.8, 0.2],
    );
    cube_face(
        &mut verts,
        [[-s, -s, s], [-s, -s, -s], [s, -s, -s], [s, -s, s]],
        [0.6, 0.2, 0.8],
    );
    cube_face(
        &mut verts,
        [[-s, -s, s], [s, -s, s], [s, s, s], [-s, s, s]],
        [0.2, 0.3, 0.9],
    );
    cube_face(
        &mut verts,
        [[s, -s, -s], [-s, -s, -s], [-s, s, -s], [s, s, -s]],
        [0.9, 0.8, 0.2],
    );
    // ground plane just under the cube
    let g = 4.0;
    let y = -s - 0.01;
    cube_face(
        &mut verts,
        [[-g, y, g], [g, y, g], [g, y, -g], [-g, y, -g]],
        [0.25, 0.25, 0.3],
    );
    verts
}

pub struct DemoScene {
    pipeline: wgpu::RenderPipeline,
    vertex_buf: wgpu::Buffer,
    vertex_count: u32,
    uniform_buf: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    spin: f32,
}

impl DemoScene {
    pub fn new(device: &wgpu::Device) -> Self {
        let verts = build_geometry();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_verts"),
            contents: bytemuck::cast_slice(&verts),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bind_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &bind_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipe_layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: QUILT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buf,
            vertex_count: verts.len() as u32,
            uniform_buf,
            bind_group,
            spin: 0.0,
        }
    }

    pub fn advance(&mut self, dt_secs: f32) {
        self.spin = (self.spin + dt_secs * 0.4) % (std::f32::consts::TAU);
    }
}

impl ViewRenderer for DemoScene {
    fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        camera: &CameraRig,
    ) {
        let model = Mat4::from_rotation_y(self.spin);
        let mvp = camera.proj * camera.view * model;
        let uniform = SceneUniform {
            mvp: mvp.to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniform));

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}
