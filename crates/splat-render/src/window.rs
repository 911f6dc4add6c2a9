//! Window management and input handling

use crate::camera::OrbitCamera;
use crate::point_cloud::PointCloud;
use crate::renderer::{get_renderer, GaussianRenderer};

use splat_data::GaussianCloud;
use splat_raster::CameraUniform;

use anyhow::{Context, Result};
use glam::Vec3;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Factor applied to the Gaussian multiplier per `+`/`-` press
const MULTIPLIER_STEP: f32 = 1.1;

/// Viewer start-up options
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub gaussian_multiplier: f32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "splatview".to_string(),
            width: 1280,
            height: 720,
            gaussian_multiplier: 1.0,
        }
    }
}

/// Everything that exists once a window and device are up
struct Viewer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    renderer: GaussianRenderer,
    camera: OrbitCamera,
    // Kept alive for the renderer's bind groups
    _point_cloud: PointCloud,
}

impl Viewer {
    async fn new(window: Arc<Window>, cloud: &GaussianCloud, options: &ViewerOptions) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter found"))?;

        // Trained scenes easily exceed the default 128 MiB storage binding
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default().using_resolution(adapter_limits.clone())
        };
        tracing::debug!(
            "Storage binding limit {} MB, buffer limit {} MB",
            required_limits.max_storage_buffer_binding_size / (1024 * 1024),
            required_limits.max_buffer_size / (1024 * 1024)
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Splat Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("Failed to create device")?;
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no formats")?;

        // Premultiplied output composites correctly when the compositor allows it
        let alpha_mode = if surface_caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        tracing::info!("Configuring surface: {}x{} {:?}", config.width, config.height, surface_format);
        surface.configure(&device, &config);

        let camera = match cloud.bounds() {
            Some((min, max)) => OrbitCamera::framing(min, max),
            None => OrbitCamera::new(Vec3::ZERO, 3.0),
        };

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: CameraUniform::SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &camera_buffer,
            0,
            bytemuck::bytes_of(&camera.uniform(config.width, config.height)),
        );

        let point_cloud = PointCloud::upload(&device, cloud).context("Failed to upload point cloud")?;
        let mut renderer = get_renderer(&point_cloud, &device, Arc::clone(&queue), surface_format, camera_buffer)
            .context("Failed to create Gaussian renderer")?;
        renderer.set_gaussian_multiplier(options.gaussian_multiplier);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            camera,
            _point_cloud: point_cloud,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            tracing::debug!("Resizing to {}x{}", new_size.width, new_size.height);
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn render(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("Surface out of memory");
            }
            Err(e) => {
                return Err(anyhow::anyhow!(e));
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = self.camera.uniform(self.config.width, self.config.height);
        self.queue
            .write_buffer(self.renderer.camera_buffer(), 0, bytemuck::bytes_of(&uniform));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Splat Frame Encoder"),
        });
        self.renderer.frame(&mut encoder, &view);

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn scale_multiplier(&mut self, factor: f32) {
        let value = self.renderer.settings().gaussian_multiplier * factor;
        self.renderer.set_gaussian_multiplier(value);
        tracing::info!("Gaussian multiplier: {:.3}", value);
    }
}

struct App {
    cloud: GaussianCloud,
    options: ViewerOptions,
    viewer: Option<Viewer>,
    error: Option<anyhow::Error>,

    // Input state
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl App {
    fn new(cloud: GaussianCloud, options: ViewerOptions) -> Self {
        Self {
            cloud,
            options,
            viewer: None,
            error: None,
            dragging: false,
            last_cursor: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.options.title.as_str())
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match pollster::block_on(Viewer::new(Arc::clone(&window), &self.cloud, &self.options)) {
            Ok(viewer) => {
                window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                viewer.resize(size);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    match key {
                        KeyCode::Escape => event_loop.exit(),
                        KeyCode::Equal | KeyCode::NumpadAdd => viewer.scale_multiplier(MULTIPLIER_STEP),
                        KeyCode::Minus | KeyCode::NumpadSubtract => viewer.scale_multiplier(1.0 / MULTIPLIER_STEP),
                        _ => {}
                    }
                }
            }

            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = state == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging {
                    if let Some((x, y)) = self.last_cursor {
                        viewer.camera.rotate((position.x - x) as f32, (position.y - y) as f32);
                    }
                    self.last_cursor = Some((position.x, position.y));
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                viewer.camera.zoom(steps);
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = viewer.render() {
                    return self.fail(event_loop, e);
                }
                viewer.window.request_redraw();
            }

            _ => {}
        }
    }
}

/// Open a window and render `cloud` until it is closed
pub fn run(cloud: GaussianCloud, options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(cloud, options);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
