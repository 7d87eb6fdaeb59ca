use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::animation::SurfaceControl;
use crate::gfx::WgpuRenderer;
use crate::ui::{ControlPanel, UiManager};
use crate::world::{World, WorldConfig};

/// The windowed application: owns the event loop and drives the world once
/// per redraw.
pub struct GoalmouthApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

/// Host-surface state the engine is allowed to drive.
struct HostState {
    input_enabled: bool,
    close_requested: bool,
}

impl SurfaceControl for HostState {
    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }
}

struct AppState {
    window: Option<Arc<Window>>,
    renderer: Option<WgpuRenderer>,
    ui_manager: Option<UiManager>,
    panel: ControlPanel,
    world: Option<World>,
    host: HostState,
    config: WorldConfig,
}

impl GoalmouthApp {
    /// Creates the application around a world configuration.
    pub fn new(config: WorldConfig) -> Self {
        let event_loop = EventLoop::new().expect("Failed to create event loop");
        let initial_model = config.model_dir.join(&config.model_file);

        Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                window: None,
                renderer: None,
                ui_manager: None,
                panel: ControlPanel::new(initial_model.display().to_string()),
                world: None,
                host: HostState {
                    input_enabled: true,
                    close_requested: false,
                },
                config,
            },
        }
    }

    /// Runs the application (consumes self and starts the event loop).
    pub fn run(mut self) {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .expect("Failed to run event loop");
    }
}

impl AppState {
    /// Builds and initializes a replacement world for a user-supplied model
    /// path. On failure the current world stays active and visible.
    fn replace_model(&mut self, path: String) {
        let (Some(renderer), Some(world)) = (self.renderer.as_mut(), self.world.as_mut()) else {
            return;
        };

        let path = PathBuf::from(path);
        let (Some(dir), Some(file)) = (path.parent(), path.file_name()) else {
            self.panel
                .set_status(format!("Not a model path: {}", path.display()));
            return;
        };

        let config = self
            .config
            .clone()
            .with_model(dir, file.to_string_lossy().into_owned());
        let mut replacement = World::new(config, world.width(), world.height());
        match replacement.initialize(renderer) {
            Ok(()) => {
                world.dispose();
                *world = replacement;
                self.panel.set_status(format!("Loaded {}", path.display()));
            }
            Err(err) => {
                log::error!("keeping current model: {err}");
                self.panel.set_status(format!("Load failed: {err}"));
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let Some(world) = self.world.as_mut() else {
            return;
        };

        match code {
            KeyCode::F2 => event_loop.exit(),
            KeyCode::KeyE => world.tilt_up(),
            KeyCode::KeyD => world.tilt_down(),
            KeyCode::KeyS => world.yaw_left(),
            KeyCode::KeyF => world.yaw_right(),
            KeyCode::NumpadAdd => world.zoom_in(),
            KeyCode::NumpadSubtract => world.zoom_out(),
            KeyCode::KeyC => {
                // Toggling the bounce resets the ball height; the engine
                // leaves that to the host.
                if world.animation.toggle_bounce() {
                    world.animation.ball.height = 0.0;
                }
            }
            KeyCode::KeyV => {
                world.animation.start_scoring(&mut self.host);
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let Ok(window) = event_loop.create_window(
            WindowAttributes::default()
                .with_title("goalmouth")
                .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
        ) else {
            return;
        };

        let window_handle = Arc::new(window);
        self.window = Some(window_handle.clone());

        let (width, height) = window_handle.inner_size().into();

        let window_clone = window_handle.clone();
        let mut renderer = match pollster::block_on(async move {
            WgpuRenderer::new(window_clone, width, height).await
        }) {
            Ok(renderer) => renderer,
            Err(err) => {
                // Context setup failures are fatal to the session.
                log::error!("{err}");
                event_loop.exit();
                return;
            }
        };

        let mut world = World::new(self.config.clone(), width, height);
        if let Err(err) = world.initialize(&mut renderer) {
            log::error!("failed to load the scene asset: {err}");
            event_loop.exit();
            return;
        }
        world.resize(&mut renderer, width, height);

        let ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window_handle,
        );

        self.world = Some(world);
        self.ui_manager = Some(ui_manager);
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // The UI gets first refusal on input events, unless the scoring
        // animation has interaction blocked.
        let is_input = matches!(
            event,
            WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
                | WindowEvent::KeyboardInput { .. }
                | WindowEvent::Focused(_)
        );
        if is_input {
            if let Some(ui_manager) = self.ui_manager.as_mut() {
                let wrapped: winit::event::Event<()> = winit::event::Event::WindowEvent {
                    window_id,
                    event: event.clone(),
                };
                if ui_manager.handle_input(&window, &wrapped) && self.host.input_enabled {
                    window.request_redraw();
                    return;
                }
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if self.host.input_enabled {
                    self.handle_key(event_loop, code);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if width == 0 || height == 0 {
                    return;
                }
                if let (Some(renderer), Some(world)) =
                    (self.renderer.as_mut(), self.world.as_mut())
                {
                    renderer.resize(width, height);
                    world.resize(renderer, width, height);
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let (Some(renderer), Some(world)) =
                    (self.renderer.as_mut(), self.world.as_mut())
                else {
                    return;
                };

                // Dropdown selections apply before the frame, so a goal
                // height change is visible in the same draw.
                world.select_goal_height(self.panel.goal_height_index);
                world.select_ball_scale(self.panel.ball_scale_index);
                world.select_spin_speed(self.panel.spin_speed_index);

                world.draw(renderer, &mut self.host);
                if self.host.close_requested {
                    event_loop.exit();
                    return;
                }

                let overlay = renderer.take_overlay_text();
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    let interactive = self.host.input_enabled;
                    let panel = &mut self.panel;
                    ui_manager.update(&window, |ui| panel.draw(ui, &overlay, interactive));
                    renderer.present_with_ui(|device, queue, encoder, view| {
                        ui_manager.render(device, queue, encoder, view);
                    });
                } else {
                    renderer.present_with_ui(|_, _, _, _| {});
                }

                if let Some(path) = self.panel.take_model_request() {
                    self.replace_model(path);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
