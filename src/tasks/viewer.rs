use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::{
    config::Configuration,
    events::{FeederCommand, RendererStatus, ViewerEvent, ViewerNotifier},
    render::{
        draw::DrawList,
        focus::SharedFocusViewports,
        gpu::GpuRenderer,
        loader::{LoadWorker, Waker},
        pipeline::{PicturePipeline, PipelineContext, PipelineOptions, RenderCallbacks},
        preferences::{SharedPreferences, UserParameters},
        prepare::MAX_BLUR_AMOUNT,
        queue::{RenderQueue, RenderQueueHandle},
    },
    source::FileImageSource,
};

const PAN_STEP: f32 = 0.1;
const BLUR_STEP: u32 = 25;

/// Forwards wake-ups and feeder events into the winit event loop.
pub struct ProxyNotifier {
    proxy: Mutex<EventLoopProxy<ViewerEvent>>,
}

impl ProxyNotifier {
    #[must_use]
    pub fn new(proxy: EventLoopProxy<ViewerEvent>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }
}

impl ViewerNotifier for ProxyNotifier {
    fn notify(&self, event: ViewerEvent) -> bool {
        self.proxy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_event(event)
            .is_ok()
    }
}

impl RenderCallbacks for ProxyNotifier {
    fn request_render(&self) {
        self.notify(ViewerEvent::Wake);
    }
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    renderer: Option<GpuRenderer>,
    pipeline: PicturePipeline,
    render_queue: RenderQueue,
    tasks: RenderQueueHandle,
    preferences: SharedPreferences,
    draw_list: DrawList,
    status: Receiver<RendererStatus>,
    to_feeder: mpsc::Sender<FeederCommand>,
    pending_redraw: bool,
}

impl ViewerApp {
    fn new(
        cfg: Configuration,
        cancel: CancellationToken,
        proxy: EventLoopProxy<ViewerEvent>,
        to_feeder: mpsc::Sender<FeederCommand>,
    ) -> Result<Self> {
        let notifier = Arc::new(ProxyNotifier::new(proxy));
        let waker: Waker = {
            let notifier = Arc::clone(&notifier);
            Arc::new(move || notifier.request_render())
        };
        let loader = LoadWorker::spawn(Some(waker)).context("failed to spawn picture loader")?;

        let (status_tx, status) = bounded::<RendererStatus>(16);
        let preferences = SharedPreferences::new(UserParameters::from(&cfg));
        let ctx = PipelineContext {
            preferences: Arc::new(preferences.clone()),
            focus: Arc::new(SharedFocusViewports::new()),
            status: Arc::new(status_tx),
            callbacks: notifier,
        };
        let pipeline = PicturePipeline::new(PipelineOptions::from_config(&cfg), ctx, loader);
        let render_queue = RenderQueue::new();
        let tasks = render_queue.handle();

        Ok(Self {
            cfg,
            cancel,
            window: None,
            instance: wgpu::Instance::default(),
            surface: None,
            surface_config: None,
            device: None,
            queue: None,
            renderer: None,
            pipeline,
            render_queue,
            tasks,
            preferences,
            draw_list: DrawList::new(),
            status,
            to_feeder,
            pending_redraw: false,
        })
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title("Blur Wallpaper");
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let surface = self
            .instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        if self.device.is_none() {
            let adapter =
                pollster::block_on(self.instance.request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::LowPower,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                }))
                .context("failed to acquire GPU adapter")?;

            let caps = surface.get_capabilities(&adapter);
            let format = caps
                .formats
                .iter()
                .copied()
                .find(|fmt| fmt.is_srgb())
                .or_else(|| caps.formats.first().copied())
                .context("surface reports no formats")?;
            let alpha_mode = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto);

            let (device, queue) =
                pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                    label: Some("wallpaper-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                    trace: wgpu::Trace::default(),
                }))
                .context("failed to acquire GPU device")?;

            let size = window.inner_size();
            self.surface_config = Some(wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.width.max(1),
                height: size.height.max(1),
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode,
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            });
            self.renderer = Some(GpuRenderer::new(&device, &queue, format));
            self.device = Some(device);
            self.queue = Some(queue);
        }

        let (Some(device), Some(config)) = (self.device.as_ref(), self.surface_config.as_mut())
        else {
            return Ok(());
        };
        let size = window.inner_size();
        config.width = size.width.max(1);
        config.height = size.height.max(1);
        surface.configure(device, config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );
        let (width, height) = (config.width, config.height);
        self.surface = Some(surface);

        self.pipeline.on_surface_created();
        self.pipeline.on_surface_changed(width, height);
        self.pending_redraw = true;
        Ok(())
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let (Some(surface), Some(device), Some(config)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return;
        };

        config.width = new_size.width.max(1);
        config.height = new_size.height.max(1);
        surface.configure(device, config);
        debug!(
            width = config.width,
            height = config.height,
            "viewer surface resized",
        );
        let (width, height) = (config.width, config.height);
        self.pipeline.on_surface_changed(width, height);
        self.request_redraw();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        self.render_queue.drain(&mut self.pipeline, now);

        let (Some(surface), Some(device), Some(queue), Some(renderer), Some(window)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.queue.as_ref(),
            self.renderer.as_mut(),
            self.window.as_ref(),
        ) else {
            return;
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                let size = window.inner_size();
                self.handle_resize(size);
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                let size = window.inner_size();
                self.handle_resize(size);
                return;
            }
        };

        self.draw_list.clear();
        let animating = match self.pipeline.on_draw_frame(renderer, &mut self.draw_list, now) {
            Ok(animating) => animating,
            Err(err) => {
                error!(error = %err, "frame failed; exiting event loop");
                event_loop.exit();
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("viewer-encoder"),
        });
        renderer.render(&self.draw_list, &view, &mut encoder);
        queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        self.pending_redraw = animating;
    }

    fn request_redraw(&mut self) {
        self.pending_redraw = true;
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn post(&mut self, task: impl FnOnce(&mut PicturePipeline, Instant) + Send + 'static) {
        self.tasks.post(task);
        self.request_redraw();
    }

    fn tell_feeder(&self, command: FeederCommand) {
        if let Err(err) = self.to_feeder.try_send(command) {
            debug!(?command, error = %err, "feeder did not take command");
        }
    }

    fn show_artwork(&mut self, path: &std::path::Path) {
        match FileImageSource::open(path, self.cfg.max_decode_bytes) {
            Ok(source) => {
                info!(path = %path.display(), "showing artwork");
                let source = Arc::new(source);
                self.post(move |pipeline, _| pipeline.set_image(source));
            }
            Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable artwork"),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => {
                info!("escape pressed; exiting");
                event_loop.exit();
            }
            Key::Named(NamedKey::ArrowLeft) => self.post(|p, _| {
                let offset = p.normal_offset_x() - PAN_STEP;
                p.set_normal_offset_x(offset);
            }),
            Key::Named(NamedKey::ArrowRight) => self.post(|p, _| {
                let offset = p.normal_offset_x() + PAN_STEP;
                p.set_normal_offset_x(offset);
            }),
            Key::Character(c) => match c.to_ascii_lowercase().as_str() {
                "b" => self.post(|p, now| {
                    let blurred = !p.is_blurred();
                    let linked = p.is_focus_linked();
                    p.set_blurred(blurred, linked, now);
                }),
                "f" => self.post(|p, now| {
                    let blurred = p.is_blurred();
                    let linked = !p.is_focus_linked();
                    p.set_blurred(blurred, linked, now);
                }),
                "n" => self.tell_feeder(FeederCommand::Advance),
                "[" => self.change_blur_amount(|amount| amount.saturating_sub(BLUR_STEP)),
                "]" => self.change_blur_amount(|amount| (amount + BLUR_STEP).min(MAX_BLUR_AMOUNT)),
                _ => {}
            },
            _ => {}
        }
    }

    fn change_blur_amount(&mut self, change: impl FnOnce(u32) -> u32) {
        let params = self
            .preferences
            .update(|params| params.blur_amount = change(params.blur_amount));
        info!(blur_amount = params.blur_amount, "blur amount changed");
        self.tell_feeder(FeederCommand::ParametersChanged);
    }

    fn log_status(&self) {
        for status in self.status.try_iter() {
            info!(?status, "renderer status");
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.surface.is_none()
            && let Err(err) = self.init_gpu(window)
        {
            error!(error = ?err, "failed to initialize GPU state");
            event_loop.exit();
            return;
        }

        self.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_mut() {
            self.pipeline.on_surface_destroyed(renderer);
        }
        self.surface = None;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.log_status();
        if self.pending_redraw
            && let Some(window) = self.window.as_ref()
        {
            window.request_redraw();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
            ViewerEvent::ShowArtwork(path) => self.show_artwork(&path),
            ViewerEvent::ReloadArtwork => {
                self.post(|pipeline, _| pipeline.reload_current_artwork());
            }
            ViewerEvent::Wake => self.request_redraw(),
        }
    }
}

/// Build the event loop up front so other tasks can hold a proxy to it.
///
/// # Errors
/// Fails when the platform has no display.
pub fn event_loop() -> Result<EventLoop<ViewerEvent>> {
    EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")
}

pub fn run_windowed(
    event_loop: EventLoop<ViewerEvent>,
    cfg: Configuration,
    cancel: CancellationToken,
    to_feeder: mpsc::Sender<FeederCommand>,
) -> Result<()> {
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = proxy.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, cancel.clone(), proxy, to_feeder)?;
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    cancel.cancel();

    run_result.context("viewer event loop failed")
}
