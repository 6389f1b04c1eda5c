use std::{sync::Arc, time::Instant};

use anyhow::Context as _;
use log::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    command::Command,
    config::{Backend, LifeConfig},
    error::LifeResult,
    gfx::{ui::panel, RenderEngine, UiManager},
    input::InputInjector,
    simulation::{cpu_factory, GpuKernel, KernelFactory, SimulationStepper, TransitionKernel},
};

pub struct LifeApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

/// Window-bound resources, created once the event loop resumes
struct Graphics {
    window: Arc<Window>,
    render_engine: RenderEngine,
    ui_manager: UiManager,
}

struct AppState {
    config: LifeConfig,
    graphics: Option<Graphics>,
    stepper: Option<SimulationStepper>,
    injector: InputInjector,
    last_frame: Instant,
    fps: f32,
    fatal: Option<anyhow::Error>,
}

impl LifeApp {
    pub fn new(config: LifeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                injector: InputInjector::from_config(&config),
                config,
                graphics: None,
                stepper: None,
                last_frame: Instant::now(),
                fps: 0.0,
                fatal: None,
            },
        })
    }

    /// Run the application (consumes self and starts the event loop)
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .context("event loop terminated with an error")?;

        match self.app_state.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn create_graphics(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.config.initial_size;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.config.window_title.clone())
                    .with_inner_size(LogicalSize::new(width, height)),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);

        let (width, height) = window.inner_size().into();
        let grid_size = self.config.grid_size(width, height);

        let target = window.clone();
        let render_engine = pollster::block_on(async move {
            RenderEngine::new(target, width, height, grid_size).await
        })?;

        let mut ui_manager = UiManager::new(
            render_engine.device(),
            render_engine.queue(),
            render_engine.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);

        let factory = match self.config.backend {
            Backend::Gpu => gpu_factory(&render_engine),
            Backend::Cpu => cpu_factory(),
        };
        let mut stepper =
            SimulationStepper::from_config(&self.config, grid_size.0, grid_size.1, factory)?;

        // A failed initialize leaves the stepper Failed; the overlay reports it
        if stepper.initialize().is_ok() {
            if let Err(e) = stepper.request_pattern(self.config.initial_pattern) {
                debug!("Initial pattern not applied: {}", e);
            }
        }

        self.stepper = Some(stepper);
        self.graphics = Some(Graphics {
            window,
            render_engine,
            ui_manager,
        });
        self.last_frame = Instant::now();
        Ok(())
    }

    fn execute(&mut self, command: Command, event_loop: &ActiveEventLoop) {
        if command == Command::Quit {
            event_loop.exit();
            return;
        }

        let Some(stepper) = self.stepper.as_mut() else {
            return;
        };
        debug!("Executing {:?}", command);

        // Failures already halt the stepper and are logged there
        let result = match command {
            Command::Generate(kind) => stepper.request_pattern(kind),
            Command::Clear => {
                stepper.clear();
                Ok(())
            }
            Command::Restart => stepper.restart(),
            Command::TogglePause => {
                stepper.toggle_pause();
                Ok(())
            }
            Command::Step => {
                stepper.request_step();
                Ok(())
            }
            Command::Quit => Ok(()),
        };
        if let Err(e) = result {
            debug!("{:?} failed: {}", command, e);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }

        graphics.render_engine.resize(width, height);
        graphics.ui_manager.update_display_size(width, height);
        self.injector.discard_pending();

        if let Some(stepper) = self.stepper.as_mut() {
            let (grid_width, grid_height) = self.config.grid_size(width, height);
            if let Err(e) = stepper.resize(grid_width, grid_height) {
                stepper.halt(&e);
            }
        }
    }

    /// Step, upload and draw one frame. Returns the command picked in the overlay.
    fn redraw(&mut self) -> Option<Command> {
        let (Some(graphics), Some(stepper)) = (self.graphics.as_mut(), self.stepper.as_mut())
        else {
            return None;
        };

        let now = Instant::now();
        let delta = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        if delta > 0.0 {
            let instant_fps = 1.0 / delta;
            self.fps = if self.fps > 0.0 {
                self.fps * 0.9 + instant_fps * 0.1
            } else {
                instant_fps
            };
        }

        let writes = self.injector.take_pending();
        if !writes.is_empty() {
            stepper.queue_writes(writes);
        }
        if let Err(e) = stepper.tick(delta) {
            debug!("Tick failed: {}", e);
        }

        graphics.render_engine.upload_grid(stepper.current());

        let Graphics {
            window,
            render_engine,
            ui_manager,
        } = graphics;
        let fps = self.fps;
        let mut command = None;
        let mut overlay_result: LifeResult<()> = Ok(());

        let frame = render_engine.render_frame_with_ui(|device, queue, encoder, view| {
            overlay_result = ui_manager.draw(device, queue, encoder, window, view, |ui| {
                command = panel::status_panel(ui, stepper, fps);
            });
        });

        if let Err(e) = frame.and(overlay_result) {
            stepper.halt(&e);
        }

        command
    }
}

fn gpu_factory(render_engine: &RenderEngine) -> KernelFactory {
    let device = render_engine.device_handle();
    let queue = render_engine.queue_handle();
    Box::new(move || {
        GpuKernel::new(device.clone(), queue.clone())
            .map(|kernel| Box::new(kernel) as Box<dyn TransitionKernel>)
    })
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }

        if let Err(e) = self.create_graphics(event_loop) {
            error!("Startup failed: {:#}", e);
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        // Handle UI input first
        let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        let window = graphics.window.clone();
        let capture = graphics.ui_manager.handle_input(&window, &ui_event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if capture.passes_keys() => {
                if let Some(command) = Command::from_key(key_code) {
                    self.execute(command, event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if capture.passes_motion(self.injector.is_drawing()) {
                    self.injector.cursor_moved(position.x, position.y);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed if capture.passes_press() => self.injector.pointer_down(),
                ElementState::Pressed => {}
                ElementState::Released => self.injector.pointer_up(),
            },
            WindowEvent::CursorLeft { .. } => self.injector.cursor_left(),
            WindowEvent::Resized(PhysicalSize { width, height }) => self.resize(width, height),
            WindowEvent::RedrawRequested => {
                if let Some(command) = self.redraw() {
                    self.execute(command, event_loop);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(graphics) = &self.graphics {
            graphics.window.request_redraw();
        }
    }
}
