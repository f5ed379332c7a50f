//! Quilt compositing. Drives the configured captures through every view of
//! the fan, packs the rendered tiles into the quilt texture, and composites
//! the quilt through the calibrated lenticular pass to the output target.
//!
//! Strictly frame-synchronous: views are rendered sequentially, one submit
//! per view, so the temporary tile targets can be reused safely.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::calibration::CalibrationProfile;
use crate::capture::ViewCapture;
use crate::error::Error;
use crate::interleave::LenticularParams;
use crate::render::{DEPTH_FORMAT, QUAD, QUILT_FORMAT, ViewRenderer, quad_vertex_layout};
use crate::screenshot::next_numbered_filename;
use crate::tiling::{
    PRESETS, QuiltLayout, TileRect, Tiling, angle_at_view, serialize_tag, tile_rect,
};

/// Observer invoked once per rendered view with `(view, num_views)`, plus one
/// final sentinel call with `view == num_views` after the loop completes.
pub type ViewObserver = Box<dyn FnMut(u32, u32)>;

/// One entry of the per-frame view loop: which view to render, at which fan
/// angle, into which packed rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewStep {
    pub view: u32,
    pub horizontal_deg: f32,
    pub rect: TileRect,
}

/// The full view loop for one composite, in execution order. Pure; the
/// compositor walks this schedule verbatim.
pub fn view_schedule(tiling: Tiling, layout: &QuiltLayout, view_cone_deg: f32) -> Vec<ViewStep> {
    (0..layout.num_views)
        .map(|view| ViewStep {
            view,
            horizontal_deg: angle_at_view(view, layout.num_views, view_cone_deg),
            rect: tile_rect(view, tiling, layout),
        })
        .collect()
}

/// The exact `(view, num_views)` observer call sequence one composite emits:
/// one call per view in view order, then the `(num_views, num_views)`
/// sentinel. The override path renders no views and emits nothing.
pub fn observer_calls(num_views: u32, overridden: bool) -> Vec<(u32, u32)> {
    if overridden {
        return Vec::new();
    }
    (0..num_views)
        .map(|view| (view, num_views))
        .chain(std::iter::once((num_views, num_views)))
        .collect()
}

/// Fan the call out to every observer in subscription order.
pub fn notify_observers(observers: &mut [ViewObserver], view: u32, num_views: u32) {
    for observer in observers {
        observer(view, num_views);
    }
}

struct QuiltTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl QuiltTarget {
    fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("quilt"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: QUILT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

struct TileTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Temporary per-view render targets, acquired and released once per view per
/// capture and never retained across frames beyond reuse by size.
struct TilePool {
    free: Vec<TileTarget>,
}

impl TilePool {
    fn new() -> Self {
        Self { free: Vec::new() }
    }

    fn acquire(&mut self, device: &wgpu::Device, width: u32, height: u32) -> TileTarget {
        if let Some(at) = self
            .free
            .iter()
            .position(|t| t.width == width && t.height == height)
        {
            return self.free.swap_remove(at);
        }
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile_color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: QUILT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile_depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        TileTarget {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            width,
            height,
        }
    }

    fn release(&mut self, target: TileTarget) {
        self.free.push(target);
    }

    fn clear(&mut self) {
        self.free.clear();
    }
}

struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl BlitPipeline {
    fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bind_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit_pipe_layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[quad_vertex_layout()],
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
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            bind_layout,
            sampler,
        }
    }

    fn bind(&self, device: &wgpu::Device, texture: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

struct LenticularPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    params_buf: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

impl LenticularPipeline {
    fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        quilt_view: &wgpu::TextureView,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lenticular_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lenticular.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lenticular_bind_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lenticular_pipe_layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lenticular_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[quad_vertex_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // the quilt is sampled point-exact; filtering would smear adjacent
        // views into each other
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quilt_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lenticular_params"),
            size: std::mem::size_of::<crate::interleave::LenticularUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = Self::make_bind_group(device, &bind_layout, quilt_view, &sampler, &params_buf);

        Self {
            pipeline,
            bind_layout,
            bind_group,
            params_buf,
            sampler,
        }
    }

    fn make_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        quilt_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        params_buf: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lenticular_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(quilt_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        })
    }

    fn rebind(&mut self, device: &wgpu::Device, quilt_view: &wgpu::TextureView) {
        self.bind_group =
            Self::make_bind_group(device, &self.bind_layout, quilt_view, &self.sampler, &self.params_buf);
    }
}

/// Owns the quilt buffer and everything needed to fill and composite it.
/// Exactly one quilt buffer exists at a time, sized to the current tiling;
/// it is fully rewritten every composite.
pub struct QuiltCompositor {
    tiling: Tiling,
    layout: QuiltLayout,
    profile: CalibrationProfile,
    params: LenticularParams,
    quilt: QuiltTarget,
    tile_pool: TilePool,
    quad_buf: wgpu::Buffer,
    blit: BlitPipeline,
    lenticular: LenticularPipeline,
    override_bind: Option<wgpu::BindGroup>,
    observers: Vec<ViewObserver>,
}

impl QuiltCompositor {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        profile: CalibrationProfile,
        tiling: Tiling,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let layout = QuiltLayout::new(tiling);
        let params = LenticularParams::derive(&profile, tiling, &layout);
        let quilt = QuiltTarget::new(device, tiling.quilt_size);

        let quad_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let blit = BlitPipeline::new(device);
        let lenticular = LenticularPipeline::new(device, output_format, &quilt.view);
        queue.write_buffer(
            &lenticular.params_buf,
            0,
            bytemuck::bytes_of(&params.to_uniform()),
        );

        info!(
            tiling = %serialize_tag(tiling),
            views = layout.num_views,
            "quilt compositor ready"
        );

        Self {
            tiling,
            layout,
            profile,
            params,
            quilt,
            tile_pool: TilePool::new(),
            quad_buf,
            blit,
            lenticular,
            override_bind: None,
            observers: Vec::new(),
        }
    }

    pub fn tiling(&self) -> Tiling {
        self.tiling
    }

    pub fn layout(&self) -> &QuiltLayout {
        &self.layout
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn params(&self) -> &LenticularParams {
        &self.params
    }

    /// Register an on-view-render observer. Observers fire in subscription
    /// order.
    pub fn subscribe(&mut self, observer: ViewObserver) {
        self.observers.push(observer);
    }

    /// Set or clear a manual override image. While set, compositing draws it
    /// full-frame into the quilt instead of rendering views.
    pub fn set_override(&mut self, device: &wgpu::Device, texture: Option<&wgpu::TextureView>) {
        self.override_bind = texture.map(|view| self.blit.bind(device, view));
    }

    /// Rebuild the quilt buffer and derived parameters for a new tiling.
    pub fn set_tiling(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, tiling: Tiling) {
        self.tiling = tiling;
        self.layout = QuiltLayout::new(tiling);
        if self.quilt.size != tiling.quilt_size {
            self.quilt = QuiltTarget::new(device, tiling.quilt_size);
            self.lenticular.rebind(device, &self.quilt.view);
        }
        self.tile_pool.clear();
        self.write_params(queue);
        debug!(tiling = %serialize_tag(tiling), "tiling changed");
    }

    /// Replace the calibration profile wholesale and rebind the derived
    /// shader parameters. Must be called from the frame-synchronous context,
    /// never during a composite.
    pub fn reload_calibration(&mut self, queue: &wgpu::Queue, profile: CalibrationProfile) {
        self.profile = profile;
        self.write_params(queue);
        info!(provenance = ?self.profile.provenance, "calibration reloaded");
    }

    fn write_params(&mut self, queue: &wgpu::Queue) {
        self.params = LenticularParams::derive(&self.profile, self.tiling, &self.layout);
        queue.write_buffer(
            &self.lenticular.params_buf,
            0,
            bytemuck::bytes_of(&self.params.to_uniform()),
        );
    }

    fn notify(&mut self, view: u32, num_views: u32) {
        notify_observers(&mut self.observers, view, num_views);
    }

    /// Fill the quilt for the current frame: clear, then either the override
    /// image or one off-axis render per view per active capture, packed by
    /// [`tile_rect`].
    fn render_quilt(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut dyn ViewRenderer,
        captures: &mut [ViewCapture],
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quilt_clear"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quilt_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.quilt.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // override path: draw the manual quilt full-frame and skip the
            // view loop entirely
            if let Some(bind) = &self.override_bind {
                rpass.set_pipeline(&self.blit.pipeline);
                rpass.set_bind_group(0, bind, &[]);
                rpass.set_vertex_buffer(0, self.quad_buf.slice(..));
                rpass.draw(0..4, 0..1);
            }
        }
        queue.submit([encoder.finish()]);

        if self.override_bind.is_some() {
            return;
        }

        let aspect = self.profile.aspect();
        let vertical = self.profile.vertical_angle;
        let view_cone = self.profile.view_cone;
        let num_views = self.layout.num_views;

        for step in view_schedule(self.tiling, &self.layout, view_cone) {
            self.notify(step.view, num_views);

            // captures composite in array order; later entries draw on top
            for capture in captures.iter_mut() {
                if !capture.enabled || !capture.has_rig() {
                    continue;
                }
                // offset is applied explicitly by render_view below
                capture.configure(aspect, vertical, false);

                let tile = self
                    .tile_pool
                    .acquire(device, self.layout.tile_size_x, self.layout.tile_size_y);
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("view_render"),
                });
                capture.render_view(step.horizontal_deg, vertical, |rig| {
                    scene.render(queue, &mut encoder, &tile.color_view, &tile.depth_view, rig);
                });
                // pixel-exact copy into the packed location; a filtered blit
                // here would blur tile seams
                encoder.copy_texture_to_texture(
                    tile.color.as_image_copy(),
                    wgpu::ImageCopyTexture {
                        texture: &self.quilt.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d {
                            x: step.rect.x,
                            y: step.rect.y,
                            z: 0,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::Extent3d {
                        width: step.rect.width,
                        height: step.rect.height,
                        depth_or_array_layers: 1,
                    },
                );
                queue.submit([encoder.finish()]);
                self.tile_pool.release(tile);
            }
        }

        // final sentinel call after the loop completes
        self.notify(num_views, num_views);

        // reset cameras so scene inspection and the next frame start neutral
        for capture in captures.iter_mut() {
            capture.configure(aspect, vertical, true);
        }
    }

    /// Render one full frame: fill the quilt, then composite it through the
    /// lenticular pass onto `output`.
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut dyn ViewRenderer,
        captures: &mut [ViewCapture],
        output: &wgpu::TextureView,
    ) {
        self.render_quilt(device, queue, scene, captures);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("interleave"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("interleave_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.lenticular.pipeline);
            rpass.set_bind_group(0, &self.lenticular.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_buf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        queue.submit([encoder.finish()]);
    }

    /// Composite a quilt using the first ("Standard") preset regardless of
    /// the active tiling, encode it as PNG, and write it to the next free
    /// numbered filename derived from `stem` and the serialized tiling tag.
    /// The active tiling is restored afterwards.
    ///
    /// # Errors
    /// Fails on readback, encode or filesystem errors; the active tiling is
    /// still restored in those cases before returning.
    pub fn screenshot(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut dyn ViewRenderer,
        captures: &mut [ViewCapture],
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, Error> {
        let previous = self.tiling;
        self.set_tiling(device, queue, PRESETS[0].tiling);
        self.render_quilt(device, queue, scene, captures);

        let result = self.export_quilt_png(device, queue, dir, stem);

        self.set_tiling(device, queue, previous);
        result
    }

    fn export_quilt_png(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, Error> {
        let size = self.quilt.size;
        let pixels = read_back_rgba(device, queue, &self.quilt.texture, size, size)
            .map_err(Error::Render)?;
        let image = image::RgbaImage::from_raw(size, size, pixels)
            .ok_or_else(|| Error::Render(anyhow::anyhow!("quilt readback size mismatch")))?;

        let tagged_stem = format!("{stem}_{}", serialize_tag(self.tiling));
        let path = next_numbered_filename(dir, &tagged_stem, "png")?;
        image.save(&path)?;
        info!(path = %path.display(), "wrote quilt screenshot");
        Ok(path)
    }
}

/// Copy a texture into host memory as tightly packed RGBA8 rows.
fn read_back_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> anyhow::Result<Vec<u8>> {
    const ROW_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let unpadded = width * 4;
    let padded = unpadded.div_ceil(ROW_ALIGN) * ROW_ALIGN;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit([encoder.finish()]);

    let slice = buffer.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()??;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in 0..height {
        let start = (row * padded) as usize;
        pixels.extend_from_slice(&mapped[start..start + unpadded as usize]);
    }
    drop(mapped);
    buffer.unmap();
    Ok(pixels)
}
