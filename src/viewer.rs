//! Application shell: fullscreen window on the lenticular display, one quilt
//! composite per redraw, calibration hot-reload between frames.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use notify::RecommendedWatcher;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::calibration::CalibrationProfile;
use crate::capture::ViewCapture;
use crate::render::compositor::QuiltCompositor;
use crate::render::gpu::Gpu;
use crate::render::scene::DemoScene;
use crate::tiling::{Tiling, serialize_tag};
use crate::watch::{CalibrationChanged, start_watcher};

pub struct ViewerOptions {
    pub calibration_path: PathBuf,
    pub tiling: Tiling,
    pub screenshot_dir: PathBuf,
    pub screenshot_name: String,
}

/// Run the viewer until the window is closed.
///
/// # Errors
/// Returns an error if the event loop or the rendering backend fails to
/// initialize.
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;
    Ok(())
}

struct Gfx {
    surface: wgpu::Surface<'static>,
    gpu: Gpu,
    config: wgpu::SurfaceConfiguration,
    compositor: QuiltCompositor,
    scene: DemoScene,
    captures: Vec<ViewCapture>,
}

struct App {
    options: ViewerOptions,
    window: Option<Arc<Window>>,
    gfx: Option<Gfx>,
    rx_calibration: xchan::Receiver<CalibrationChanged>,
    _watcher: Option<RecommendedWatcher>,
    last_frame: Instant,
}

impl App {
    fn new(options: ViewerOptions) -> Self {
        let (_tx_dummy, rx_calibration) = xchan::unbounded();
        Self {
            options,
            window: None,
            gfx: None,
            rx_calibration,
            _watcher: None,
            last_frame: Instant::now(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // ----- window -----
        let attrs = Window::default_attributes().with_title("quilt display");
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        let monitor = window.current_monitor();
        window.set_fullscreen(Some(Fullscreen::Borderless(monitor)));
        window.set_cursor_visible(false);
        self.window = Some(window.clone());

        // ----- calibration + watcher -----
        let profile = CalibrationProfile::load_or_default(&self.options.calibration_path);
        let (tx, rx) = xchan::unbounded();
        match start_watcher(&self.options.calibration_path, tx) {
            Ok(watcher) => self._watcher = Some(watcher),
            Err(err) => warn!(%err, "calibration watcher unavailable"),
        }
        self.rx_calibration = rx;

        // ----- GPU init -----
        let tiling = self.options.tiling;
        let gfx_init = async move {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
            let surface = instance
                .create_surface(window.clone())
                .context("create surface")?;
            let gpu = Gpu::new(&instance, Some(&surface)).await?;

            let caps = surface.get_capabilities(&gpu.adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(wgpu::TextureFormat::is_srgb)
                .unwrap_or(caps.formats[0]);
            let PhysicalSize { width, height } = window.inner_size();
            let config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode: caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 1,
            };
            surface.configure(&gpu.device, &config);

            let compositor =
                QuiltCompositor::new(&gpu.device, &gpu.queue, profile, tiling, format);
            let scene = DemoScene::new(&gpu.device);
            let mut captures = vec![ViewCapture::new()];
            let aspect = compositor.profile().aspect();
            let vertical = compositor.profile().vertical_angle;
            for capture in &mut captures {
                capture.configure(aspect, vertical, true);
            }

            Ok::<Gfx, anyhow::Error>(Gfx {
                surface,
                gpu,
                config,
                compositor,
                scene,
                captures,
            })
        };

        self.gfx = Some(pollster::block_on(gfx_init).expect("GPU init"));
        self.last_frame = Instant::now();
        info!("viewer initialized");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(win) = &self.window else { return };
        if win.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Released {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) => event_loop.exit(),
                        PhysicalKey::Code(KeyCode::F9) => self.log_calibration(),
                        PhysicalKey::Code(KeyCode::F10) => self.take_screenshot(),
                        _ => {}
                    }
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gfx) = &mut self.gfx {
                    if width > 0 && height > 0 {
                        gfx.config.width = width;
                        gfx.config.height = height;
                        gfx.surface.configure(&gfx.gpu.device, &gfx.config);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // hot-reload calibration between frames, never mid-composite
        let mut changed = false;
        while self.rx_calibration.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            if let Some(gfx) = &mut self.gfx {
                let profile = CalibrationProfile::load_or_default(&self.options.calibration_path);
                gfx.compositor.reload_calibration(&gfx.gpu.queue, profile);
            }
        }

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        if let Some(gfx) = &mut self.gfx {
            gfx.scene.advance(dt);
        }

        if let Some(win) = &self.window {
            win.request_redraw();
        }
    }
}

impl App {
    fn draw(&mut self) {
        let Some(gfx) = &mut self.gfx else { return };
        let Ok(frame) = gfx.surface.get_current_texture() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gfx.compositor.render_frame(
            &gfx.gpu.device,
            &gfx.gpu.queue,
            &mut gfx.scene,
            &mut gfx.captures,
            &view,
        );
        frame.present();
    }

    fn log_calibration(&self) {
        let Some(gfx) = &self.gfx else { return };
        let profile = gfx.compositor.profile();
        info!(
            provenance = ?profile.provenance,
            pitch = profile.pitch,
            slope = profile.slope,
            center = profile.center,
            view_cone = profile.view_cone,
            tiling = %serialize_tag(gfx.compositor.tiling()),
            views = gfx.compositor.layout().num_views,
            "active calibration"
        );
    }

    fn take_screenshot(&mut self) {
        let Some(gfx) = &mut self.gfx else { return };
        let result = gfx.compositor.screenshot(
            &gfx.gpu.device,
            &gfx.gpu.queue,
            &mut gfx.scene,
            &mut gfx.captures,
            &self.options.screenshot_dir,
            &self.options.screenshot_name,
        );
        if let Err(err) = result {
            error!(%err, "screenshot failed");
        }
    }
}
