//! Window, event loop and frame loop.
//!
//! [`GameApp`] drives a winit event loop. The window, renderer and debug
//! overlay are created together on the first `resumed` call inside a
//! [`Lifecycle`]; any failure there is fatal and ends the loop. Each redraw
//! asks the [`FrameLimiter`] for a frame, advances the camera unless paused,
//! and renders.

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::{
    config::AppConfig,
    error::{RenderError, Result},
    gfx::{
        camera::{CameraController, FpsCamera, KeyBindings},
        rendering::{FrameStatus, RenderEngine},
        scene::{load_model, Scene},
    },
    lifecycle::{Lifecycle, LifecycleError},
    timing::{FpsCounter, FrameLimiter, FrameTick},
    ui::{debug_panel, DebugStats, UiManager},
};

/// Keys handled by the application itself rather than the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePause,
    Quit,
}

fn command_for(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Escape => Some(Command::TogglePause),
        KeyCode::F1 => Some(Command::Quit),
        _ => None,
    }
}

/// Everything that only exists while the window is open. Fields drop in
/// declaration order, so the overlay and renderer go before the window.
struct Runtime {
    ui: UiManager,
    engine: RenderEngine,
    window: Arc<Window>,
}

impl Runtime {
    fn create(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        scene: &mut Scene,
        model_paths: &[PathBuf],
    ) -> Result<Self> {
        let mut attributes = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        if config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| RenderError::Window(err.to_string()))?,
        );
        log::debug!("Created window '{}'", config.title);

        let shader_dir = config.shaders_from_disk.then(|| config.shader_dir());
        let mut engine = pollster::block_on(RenderEngine::new(
            Arc::clone(&window),
            config.render.clone(),
            shader_dir.as_deref(),
        ))?;

        for path in model_paths {
            let model = load_model(engine.device(), engine.queue(), path, true)?;
            log::info!("Loaded model '{}' ({} meshes)", model.name(), model.meshes().len());
            scene.add_model(model);
        }

        let skybox_dir = config.texture_dir().join("skybox");
        if skybox_dir.is_dir() {
            scene.load_skybox(engine.device(), engine.queue(), &skybox_dir)?;
        }
        engine.prepare_scene(scene)?;

        let ui = UiManager::new(engine.device(), engine.queue(), engine.surface_format(), &window);

        Ok(Self { ui, engine, window })
    }
}

pub struct GameApp {
    config: AppConfig,
    scene: Scene,
    model_paths: Vec<PathBuf>,
    camera: FpsCamera,
    controller: CameraController,
    lifecycle: Lifecycle<Runtime>,
    limiter: FrameLimiter,
    fps: FpsCounter,
    paused: bool,
    fatal: Option<RenderError>,
}

impl GameApp {
    pub fn new(config: AppConfig, scene: Scene) -> Self {
        let limiter = FrameLimiter::from_millis(config.min_frame_ms);
        Self {
            config,
            scene,
            model_paths: Vec::new(),
            camera: FpsCamera::spawn(),
            controller: CameraController::new(KeyBindings::default()),
            lifecycle: Lifecycle::new(),
            limiter,
            fps: FpsCounter::new(Instant::now()),
            paused: false,
            fatal: None,
        }
    }

    /// OBJ files loaded into the scene once the renderer exists.
    pub fn with_models(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.model_paths.extend(paths);
        self
    }

    /// Runs the event loop until the player quits. A fatal renderer error
    /// is returned after everything has been released.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self)
            .context("event loop terminated abnormally")?;

        self.lifecycle.cleanup();
        match self.fatal.take() {
            Some(err) => Err(err).context("fatal renderer error"),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        log::error!("{err}");
        self.lifecycle.cleanup();
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.controller.keyboard.clear();
        if !paused {
            self.limiter.reset();
        }
        if let Some(runtime) = self.lifecycle.get() {
            capture_cursor(&runtime.window, !paused);
        }
        log::info!("{}", if paused { "Paused" } else { "Resumed" });
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            if let Some(command) = command_for(code) {
                if event.state == ElementState::Pressed && !event.repeat {
                    match command {
                        Command::TogglePause => self.set_paused(!self.paused),
                        Command::Quit => event_loop.exit(),
                    }
                }
                return;
            }
        }
        if !self.paused {
            self.controller.process_key(event);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = match self.limiter.tick(now) {
            FrameTick::Ready { dt } => dt,
            FrameTick::TooEarly(wait) => {
                std::thread::sleep(wait);
                if let Some(runtime) = self.lifecycle.get() {
                    runtime.window.request_redraw();
                }
                return;
            }
        };

        if !self.paused {
            self.camera.translate(&self.controller.keyboard, dt);
            self.camera.finalize();
        }

        let Some(Runtime { ui, engine, window }) = self.lifecycle.get_mut() else {
            return;
        };

        let window = Arc::clone(window);
        let stats = DebugStats::capture(&self.camera, self.fps.fps(), self.paused);
        let overlay = |device: &wgpu::Device,
                       queue: &wgpu::Queue,
                       encoder: &mut wgpu::CommandEncoder,
                       view: &wgpu::TextureView| {
            ui.draw(device, queue, encoder, &window, view, |frame| {
                debug_panel(frame, &stats)
            });
        };

        match engine.render_frame(&self.camera, &self.scene, self.paused.then_some(overlay)) {
            Ok(FrameStatus::Presented) => {
                if let Some(fps) = self.fps.record(now) {
                    if self.config.print_fps {
                        log::info!("FPS: {fps:.0}");
                    }
                }
            }
            Ok(FrameStatus::Skipped) => {}
            Err(err) => self.fail(event_loop, err),
        }
    }
}

impl ApplicationHandler for GameApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.lifecycle.is_running() || self.fatal.is_some() {
            return;
        }

        let result = self.lifecycle.start(|| {
            Runtime::create(event_loop, &self.config, &mut self.scene, &self.model_paths)
        });
        match result {
            Ok(runtime) => {
                capture_cursor(&runtime.window, true);
                runtime.window.request_redraw();
            }
            Err(err) => {
                let err = match err {
                    LifecycleError::Init(err) => err,
                    other => RenderError::Window(other.to_string()),
                };
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.paused {
            if let Some(Runtime { ui, window, .. }) = self.lifecycle.get_mut() {
                if ui.handle_window_event(window, window_id, &event) {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !self.paused => log::info!("shoot"),
            WindowEvent::Focused(false) => self.controller.keyboard.clear(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let resized = match self.lifecycle.get_mut() {
                    Some(runtime) => runtime.engine.resize(width, height),
                    None => Ok(()),
                };
                if let Err(err) = resized {
                    self.fail(event_loop, err);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if !self.paused {
            self.controller.process_device_event(&event, &mut self.camera);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(runtime) = self.lifecycle.get() {
            runtime.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.lifecycle.cleanup();
    }
}

/// Grabs and hides the cursor for mouse look, or releases it.
fn capture_cursor(window: &Window, captured: bool) {
    let result = if captured {
        window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(err) = result {
        log::warn!("Could not change cursor grab: {err}");
    }
    window.set_cursor_visible(!captured);
}
