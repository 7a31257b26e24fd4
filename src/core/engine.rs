//! Engine struct and main frame loop
//!
//! Owns the window, the renderer, and the per-frame sequence: tick the
//! clock, run game logic, advance the scene (`update`), record the draw
//! traversal (`draw`), and execute the recorded commands. Window events
//! are forwarded to the input tracker and the observer hub; resizes
//! rebuild the renderer's framebuffer before observers hear about them.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::core::observer::ObserverHub;
use crate::core::time::Time;
use crate::input::Input;
use crate::render::{Camera, Materials, RenderError, RenderQueue, Renderer};
use crate::scene::SceneGraph;

/// Errors that abort engine startup or the event loop.
///
/// These are unrecoverable setup failures; a missing window or device
/// has no degraded mode.
#[derive(Debug)]
pub enum EngineError {
    /// The event loop could not be created or exited abnormally
    EventLoop(String),
    /// Window creation failed
    WindowCreation(String),
    /// Renderer acquisition failed
    Renderer(RenderError),
    /// Configuration file could not be read or parsed
    Config(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventLoop(e) => write!(f, "event loop failure: {e}"),
            Self::WindowCreation(e) => write!(f, "failed to create window: {e}"),
            Self::Renderer(e) => write!(f, "failed to initialize renderer: {e}"),
            Self::Config(e) => write!(f, "invalid engine configuration: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RenderError> for EngineError {
    fn from(e: RenderError) -> Self {
        Self::Renderer(e)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("sceneforge"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable VSync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the file cannot be read or
    /// parsed.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let content =
            fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        ron::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Save the configuration to a RON file
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the file cannot be written.
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| EngineError::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once after the renderer exists
    fn init(&mut self, context: &mut EngineContext);

    /// Called every frame before the scene updates
    fn update(&mut self, context: &mut EngineContext);

    /// Called when the window is resized
    fn on_resize(&mut self, _context: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called when the engine is shutting down
    fn shutdown(&mut self, _context: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    /// Frame clock
    pub time: Time,
    /// Input state
    pub input: Input,
    /// The scene graph
    pub scene: SceneGraph,
    /// Material arena shared by scene parts
    pub materials: Materials,
    /// Window event observers
    pub observers: ObserverHub,
    /// Active camera
    pub camera: Camera,
    /// Recorded draw commands for the current frame
    queue: RenderQueue,
    /// Renderer (available after initialization)
    renderer: Option<Renderer>,
    /// Window size
    window_size: PhysicalSize<u32>,
    /// Should the engine quit
    should_quit: bool,
}

impl EngineContext {
    fn new(width: u32, height: u32) -> Self {
        Self {
            time: Time::new(),
            input: Input::new(),
            scene: SceneGraph::new(),
            materials: Materials::new(),
            observers: ObserverHub::new(),
            camera: Camera::new(),
            queue: RenderQueue::new(),
            renderer: None,
            window_size: PhysicalSize::new(width, height),
            should_quit: false,
        }
    }

    /// Get the renderer
    pub fn renderer(&self) -> &Renderer {
        self.renderer.as_ref().expect("Renderer not initialized")
    }

    /// Get the renderer mutably
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        self.renderer.as_mut().expect("Renderer not initialized")
    }

    /// Check if the renderer is available
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Get window width
    pub fn width(&self) -> u32 {
        self.window_size.width
    }

    /// Get window height
    pub fn height(&self) -> u32 {
        self.window_size.height
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if shutdown was requested
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    window: Option<Arc<Window>>,
    initialized: bool,
    startup_error: Option<EngineError>,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        let context = EngineContext::new(config.width, config.height);
        Self {
            config,
            game,
            context,
            window: None,
            initialized: false,
            startup_error: None,
        }
    }

    /// Run the engine until the window closes or the game quits.
    ///
    /// # Errors
    ///
    /// Startup failures (event loop, window, renderer) are returned as
    /// hard errors; they terminate this call, not the whole process.
    pub fn run(mut self) -> Result<(), EngineError> {
        env_logger::init();
        log::info!("Starting engine: {}", self.config.title);

        let event_loop = EventLoop::new().map_err(|e| EngineError::EventLoop(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self)
            .map_err(|e| EngineError::EventLoop(e.to_string()))?;

        match self.startup_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Per-frame sequence: game logic, scene update, draw recording,
    /// command execution.
    fn frame(&mut self) {
        self.context.time.tick();
        let dt = self.context.time.delta();

        self.game.update(&mut self.context);
        self.context.scene.update_all(dt);

        let view_projection = self.context.camera.view_projection_matrix();
        self.context.queue.clear();
        let EngineContext {
            scene,
            materials,
            queue,
            ..
        } = &mut self.context;
        scene.draw_all(materials, view_projection, queue);
        self.context.queue.sort_for_batching();

        if let Some(renderer) = &mut self.context.renderer {
            let camera = self.context.camera.clone();
            renderer.update_camera(&camera);
            renderer.execute(&self.context.queue, &self.context.materials);
        }

        self.context.input.end_frame();
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                self.startup_error = Some(EngineError::WindowCreation(e.to_string()));
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Renderer::new(Arc::clone(&window), self.config.vsync)) {
            Ok(renderer) => {
                self.context.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Failed to initialize renderer: {e}");
                self.startup_error = Some(EngineError::Renderer(e));
                event_loop.exit();
                return;
            }
        }

        if !self.initialized {
            self.game.init(&mut self.context);
            self.initialized = true;
            log::info!("Engine initialized successfully");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.game.shutdown(&mut self.context);
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    self.context.window_size = new_size;
                    // Rebuild the framebuffer before anyone observes the
                    // new size
                    if let Some(renderer) = &mut self.context.renderer {
                        renderer.resize(new_size.width, new_size.height);
                    }
                    self.context
                        .camera
                        .set_aspect(new_size.width, new_size.height);
                    self.context
                        .observers
                        .notify_resize(new_size.width, new_size.height);
                    self.game
                        .on_resize(&mut self.context, new_size.width, new_size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key_code) = event.physical_key {
                    self.context.input.record_key(key_code, event.state);
                    self.context.observers.notify_key(key_code, event.state);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.context.input.record_mouse_button(button, state);
                self.context.observers.notify_mouse_button(button, state);
            }

            WindowEvent::CursorMoved { position, .. } => {
                let position = glam::Vec2::new(position.x as f32, position.y as f32);
                self.context.input.record_cursor(position);
                self.context.observers.notify_cursor_moved(position);
            }

            WindowEvent::RedrawRequested => {
                self.frame();

                if self.context.should_quit() {
                    self.game.shutdown(&mut self.context);
                    event_loop.exit();
                    return;
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
