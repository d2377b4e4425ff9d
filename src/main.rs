use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

// Import from the library crate
use keyroam::{
    controller::{input, output_bank, FrameLoopContext, InputEvent},
    logging,
    ui::{self, UiState},
    view::{GpuContext, RenderState, SurfaceRecovery, UiFrame},
    RoamConfig,
};

#[derive(Debug, Parser)]
#[command(name = "keyroam", version, about = "Roam a small world with the keyboard")]
struct Args {
    /// JSON config file (falls back to KEYROAM_CONFIG, then ./keyroam.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the world seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log file (falls back to RUST_LOG_FILE, then logs/keyroam.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Everything that exists once the window is up.
struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    render: RenderState,
    frame: FrameLoopContext,
    ui_state: UiState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    last_frame_time: Instant,
}

struct App {
    config: RoamConfig,
    running: Option<Running>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: RoamConfig) -> Self {
        Self { config, running: None, error: None }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Running> {
        let attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(self.config.window.width, self.config.window.height));
        let window = Arc::new(event_loop.create_window(attributes).context("creating window")?);

        let gpu = pollster::block_on(GpuContext::new_native(window.clone())).context("initialising GPU")?;
        let (width, height) = (gpu.width(), gpu.height());

        let mut frame = FrameLoopContext::new(&self.config, width, height);
        frame.sounds = output_bank(&self.config.audio);
        let render = RenderState::new(gpu.device.as_ref(), gpu.queue.as_ref(), gpu.format, width, height, &frame.environment);
        let ui_state = UiState::new(render.has_wireframe());

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(egui_ctx.clone(), egui::ViewportId::ROOT, window.as_ref(), None, None, None);

        Ok(Running {
            window,
            gpu,
            render,
            frame,
            ui_state,
            egui_ctx,
            egui_state,
            last_frame_time: Instant::now(),
        })
    }
}

impl Running {
    fn resize(&mut self, width: u32, height: u32) {
        if self.gpu.resize(width, height) {
            self.render.resize(self.gpu.device.as_ref(), width, height);
            self.frame.resize(width, height);
        }
    }

    fn key_input(&mut self, event: &winit::event::KeyEvent) {
        let Some(input) = input::native::key_event_to_input(event) else {
            return;
        };
        if let InputEvent::KeyDown(key) = &input {
            if self.ui_state.handle_key(key) {
                return;
            }
        }
        self.frame.handle_input(&input);
    }

    fn render_ui(&mut self, dt: f32) -> UiFrame {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut output = self.egui_ctx.run(raw_input, |ctx| ui::build_ui(ctx, &mut self.ui_state, &self.frame, dt));
        self.render.wireframe_mode = self.ui_state.wireframe;
        self.egui_state.handle_platform_output(&self.window, output.platform_output);
        let pixels_per_point = self.window.scale_factor() as f32;
        UiFrame {
            primitives: self.egui_ctx.tessellate(std::mem::take(&mut output.shapes), pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point,
        }
    }

    /// One frame: simulate, build UI, draw. Returns false when the app should exit.
    fn redraw(&mut self) -> bool {
        let now = Instant::now();
        let dt = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let report = self.frame.update(dt);
        if report.quit {
            tracing::info!("quit requested");
            return false;
        }

        let ui_frame = self.render_ui(dt);
        self.render.update_scene(self.gpu.device.as_ref(), self.gpu.queue.as_ref(), &self.frame);
        match self.render.draw_frame(self.gpu.device.as_ref(), self.gpu.queue.as_ref(), &self.gpu.surface, Some(ui_frame)) {
            Ok(()) => true,
            Err(err) => self.gpu.recover(&err) == SurfaceRecovery::Retry,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(err) => {
                tracing::error!("{err:#}");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if window_id != running.window.id() {
            return;
        }
        let _ = running.egui_state.on_window_event(&running.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => running.resize(size.width, size.height),
            WindowEvent::Focused(false) => {
                running.frame.handle_input(&InputEvent::FocusLost);
            }
            WindowEvent::Occluded(occluded) => {
                running.frame.handle_input(&InputEvent::VisibilityChanged { visible: !occluded });
            }
            WindowEvent::KeyboardInput { event, .. } => running.key_input(&event),
            WindowEvent::RedrawRequested => {
                if !running.redraw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref());

    let mut config = RoamConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }

    let event_loop = EventLoop::new().context("creating event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("running event loop")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
