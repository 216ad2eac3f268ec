//! Window bootstrap and the per-frame event loop.
//!
//! One thread owns everything: the window, the GL context, the oracle,
//! and the event queue. Each displayed frame walks the same linear cycle:
//! poll input, resolve the quality tier (manual override first, oracle
//! otherwise), render the geometry pass into the tier's framebuffer, run
//! the pixelation pass into the default framebuffer, and present.
//!
//! Key bindings:
//!
//! | Key            | Action                                   |
//! |----------------|------------------------------------------|
//! | `1` / `2` / `3`| Force Low / Medium / High quality        |
//! | `0`            | Clear the override (back to automatic)   |
//! | Arrow keys     | Rotate the cube                          |
//! | PageUp/PageDown| Move the camera closer / farther         |
//! | `R`            | Hot-reload shaders from `shaders/`       |
//! | Escape         | Quit                                     |

use std::num::NonZeroU32;
use std::time::Instant;

use glow::HasContext;
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasWindowHandle;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::SetupError;
use crate::oracle::{resolve_tier, OverrideState, QualityOracle};
use crate::policy::{Tier, DISPLAY_SIZE};
use crate::render::{CameraState, Renderer};
use crate::telemetry::TelemetrySampler;

/// Cube auto-rotation speed in degrees per second.
const AUTO_SPIN_DEG_PER_SEC: f32 = 30.0;

/// Rotation applied per arrow-key press, in degrees.
const ROTATE_STEP_DEG: f32 = 5.0;

/// Camera distance change per PageUp/PageDown press.
const ZOOM_STEP: f32 = 0.5;

/// Driver notification ids that are known-benign chatter (buffer usage
/// hints, texture residency notes) and never worth a log line.
const BENIGN_MESSAGE_IDS: [u32; 4] = [131_169, 131_185, 131_204, 131_218];

/// Process-wide configuration, assembled once in `main` and handed to the
/// components that need conditional diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppConfig {
    /// Whether `--verbose` was passed.
    pub verbose: bool,
}

/// Run the demo session to completion.
///
/// The oracle is constructed by the caller before any GL state exists and
/// is dropped only after the event loop returns and every GPU resource
/// has been released, which keeps a subprocess oracle's lifetime strictly
/// outside the rendering context's.
///
/// # Errors
///
/// Returns the startup error that aborted the session, if any.
pub fn run(config: AppConfig, oracle: Box<dyn QualityOracle>) -> Result<(), SetupError> {
    let event_loop =
        EventLoop::new().map_err(|err| SetupError::Context(format!("event loop: {err}")))?;

    let mut app = App {
        config,
        oracle,
        state: None,
        fatal: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|err| SetupError::Context(format!("event loop: {err}")))?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Top-level winit application.
struct App {
    config: AppConfig,
    oracle: Box<dyn QualityOracle>,
    state: Option<AppState>,
    fatal: Option<SetupError>,
}

/// Everything that exists only while the window is alive.
struct AppState {
    win: GlWindow,
    renderer: Renderer,
    camera: CameraState,
    override_state: OverrideState,
    sampler: TelemetrySampler,
    last_frame: Instant,
    /// Degrees of key-driven rotation queued since the last frame; feeds
    /// the motion-intensity reading.
    pending_rotation: f32,
    current_tier: Tier,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let mut win = match GlWindow::new(event_loop, "Adaptive Cube", DISPLAY_SIZE) {
            Ok(win) => win,
            Err(err) => {
                self.fatal = Some(err);
                event_loop.exit();
                return;
            }
        };

        install_debug_callback(&mut win.gl);
        if self.config.verbose {
            let version = unsafe { win.gl.get_parameter_string(glow::VERSION) };
            info!("OpenGL version: {version}");
        }

        let renderer = match unsafe { Renderer::new(&win.gl) } {
            Ok(renderer) => renderer,
            Err(err) => {
                self.fatal = Some(err);
                event_loop.exit();
                return;
            }
        };

        let now = Instant::now();
        self.state = Some(AppState {
            win,
            renderer,
            camera: CameraState::default(),
            override_state: OverrideState::default(),
            sampler: TelemetrySampler::new(now),
            last_frame: now,
            pending_rotation: 0.0,
            current_tier: Tier::Medium,
        });
        info!("session started (1/2/3 force quality, 0 returns to automatic)");
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    state.win.resize_surface(new_size);
                    state.win.window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.state.is_pressed() {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match code {
                    KeyCode::Escape => event_loop.exit(),
                    KeyCode::Digit1 => {
                        state.override_state.force(Tier::Low);
                        info!("manual override: low");
                    }
                    KeyCode::Digit2 => {
                        state.override_state.force(Tier::Medium);
                        info!("manual override: medium");
                    }
                    KeyCode::Digit3 => {
                        state.override_state.force(Tier::High);
                        info!("manual override: high");
                    }
                    KeyCode::Digit0 => {
                        state.override_state.clear();
                        info!("manual override cleared; back to automatic selection");
                    }
                    KeyCode::KeyR => {
                        unsafe { state.renderer.reload_shaders(&state.win.gl) };
                    }
                    KeyCode::ArrowLeft => {
                        state.camera.rotate(0.0, -ROTATE_STEP_DEG);
                        state.pending_rotation += ROTATE_STEP_DEG;
                    }
                    KeyCode::ArrowRight => {
                        state.camera.rotate(0.0, ROTATE_STEP_DEG);
                        state.pending_rotation += ROTATE_STEP_DEG;
                    }
                    KeyCode::ArrowUp => {
                        state.camera.rotate(-ROTATE_STEP_DEG, 0.0);
                        state.pending_rotation += ROTATE_STEP_DEG;
                    }
                    KeyCode::ArrowDown => {
                        state.camera.rotate(ROTATE_STEP_DEG, 0.0);
                        state.pending_rotation += ROTATE_STEP_DEG;
                    }
                    KeyCode::PageUp => state.camera.zoom(-ZOOM_STEP),
                    KeyCode::PageDown => state.camera.zoom(ZOOM_STEP),
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now
                    .duration_since(state.last_frame)
                    .as_secs_f32()
                    .max(1.0e-4);
                state.last_frame = now;

                state.camera.rotation_y += AUTO_SPIN_DEG_PER_SEC * dt;

                let manual_rate = state.pending_rotation.abs() / dt;
                state.pending_rotation = 0.0;
                let motion_intensity =
                    ((AUTO_SPIN_DEG_PER_SEC + manual_rate) / 180.0 * 100.0).clamp(0.0, 100.0);

                state.sampler.note_frame(now);
                let telemetry = state.sampler.sample(now, motion_intensity);
                let tier = resolve_tier(state.override_state, self.oracle.as_mut(), &telemetry);

                if tier != state.current_tier {
                    let source = if state.override_state.current().is_some() {
                        "manual"
                    } else {
                        "auto"
                    };
                    info!("quality tier -> {} ({source})", tier.label());
                    state.current_tier = tier;
                }
                debug!(
                    "frame: tier={} fps={:.1} temp={:.1} load={:.1} vram={:.1} motion={:.1}",
                    tier.label(),
                    telemetry.frame_rate,
                    telemetry.temperature,
                    telemetry.gpu_load,
                    telemetry.vram_usage,
                    telemetry.motion_intensity,
                );

                let size = state.win.window.inner_size();
                let display = (size.width.max(1), size.height.max(1));
                unsafe {
                    state
                        .renderer
                        .render_frame(&state.win.gl, tier, &state.camera, display);
                }
                state.win.swap_buffers();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_ref() {
            state.win.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            unsafe { state.renderer.destroy(&state.win.gl) };
            debug!("GPU resources released");
        }
    }
}

/// The window plus the GL plumbing that keeps it drawable.
struct GlWindow {
    window: Window,
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    gl: glow::Context,
}

impl GlWindow {
    /// Create the window, pick a GL config, and make a 3.3 core context
    /// current on a fresh window surface.
    fn new(
        event_loop: &ActiveEventLoop,
        title: &str,
        size: (u32, u32),
    ) -> Result<Self, SetupError> {
        let window_attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(LogicalSize::new(size.0, size.1))
            .with_resizable(false);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(window_attrs))
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|best, config| {
                        if config.num_samples() > best.num_samples() {
                            config
                        } else {
                            best
                        }
                    })
                    .expect("glutin offered no GL configs")
            })
            .map_err(|err| SetupError::Context(format!("display creation failed: {err}")))?;

        let window =
            window.ok_or_else(|| SetupError::Context("no window was created".to_owned()))?;
        let gl_display = gl_config.display();

        let raw_handle = window
            .window_handle()
            .map_err(|err| SetupError::Context(format!("window handle: {err}")))?
            .into();

        let context_attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_handle));

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attrs) }
            .map_err(|err| SetupError::Context(format!("context creation failed: {err}")))?;

        let inner = window.inner_size();
        let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_handle,
            NonZeroU32::new(inner.width.max(1)).expect("width is at least 1"),
            NonZeroU32::new(inner.height.max(1)).expect("height is at least 1"),
        );

        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attrs) }
            .map_err(|err| SetupError::Context(format!("surface creation failed: {err}")))?;

        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(|err| SetupError::Context(format!("make_current failed: {err}")))?;

        // VSync; failure only means the demo runs uncapped.
        let _ = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN));

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };

        Ok(Self {
            window,
            gl_context,
            gl_surface,
            gl,
        })
    }

    fn resize_surface(&self, new_size: PhysicalSize<u32>) {
        if let (Some(width), Some(height)) =
            (NonZeroU32::new(new_size.width), NonZeroU32::new(new_size.height))
        {
            self.gl_surface.resize(&self.gl_context, width, height);
        }
    }

    fn swap_buffers(&self) {
        if let Err(err) = self.gl_surface.swap_buffers(&self.gl_context) {
            error!("swap_buffers failed: {err}");
        }
    }
}

/// Install the driver debug callback when `GL_KHR_debug` is available.
///
/// Messages are diagnostic-only: known-benign vendor notification ids are
/// dropped, everything else is logged by severity, and nothing here ever
/// affects control flow.
fn install_debug_callback(gl: &mut glow::Context) {
    if !gl.supported_extensions().contains("GL_KHR_debug") {
        debug!("GL_KHR_debug unavailable; driver diagnostics disabled");
        return;
    }
    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.debug_message_callback(|source, message_type, id, severity, message: &str| {
            if BENIGN_MESSAGE_IDS.contains(&id) {
                return;
            }
            match severity {
                glow::DEBUG_SEVERITY_HIGH => {
                    error!("GL [source {source:#x} type {message_type:#x} id {id}]: {message}");
                }
                glow::DEBUG_SEVERITY_MEDIUM => {
                    warn!("GL [source {source:#x} type {message_type:#x} id {id}]: {message}");
                }
                _ => {
                    debug!("GL [source {source:#x} type {message_type:#x} id {id}]: {message}");
                }
            }
        });
    }
}
