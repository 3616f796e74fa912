use std::any::Any;
use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use pollster::block_on;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use lit_pyramid::{
    print_final_state, Action, DemoState, FrameClock, InputEvent, RenderError, Renderer,
    SceneConfig, TextureImage, SUMMARY_STEP,
};

/// Pixels per wheel notch when the platform reports pixel deltas.
const PIXELS_PER_LINE: f64 = 120.0;

const USAGE: &str = "Usage: lit-pyramid [--scene <file.xml>] [--texture <image>] \
                     [--summary-only] [--frames <n>] [--hold <action>]...";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let mut scene = match &options.scene {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(texture) = &options.texture {
        scene.pyramid.texture = texture.clone();
    }

    // Decode before any window exists so a bad asset fails fast.
    let texture = TextureImage::load(&scene.pyramid.texture)?;
    info!(
        "loaded texture {} ({}x{}, {} channels)",
        scene.pyramid.texture.display(),
        texture.width(),
        texture.height(),
        texture.source_channels()
    );

    if options.summary_only {
        run_headless(&scene, &texture, &options)
    } else {
        run_interactive(&scene, texture)
    }
}

fn run_headless(scene: &SceneConfig, texture: &TextureImage, options: &CliOptions) -> Result<()> {
    let mut state = DemoState::from_scene(scene);
    for action in &options.hold {
        state.queue_event(InputEvent::Pressed(*action));
    }

    let mut simulated = 0;
    while simulated < options.frames {
        state.advance(SUMMARY_STEP);
        simulated += 1;
        if state.quit_requested() {
            break;
        }
    }
    print_final_state(scene, &state, texture, simulated);
    Ok(())
}

fn run_interactive(scene: &SceneConfig, texture: TextureImage) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp {
        scene: scene.clone(),
        texture: Some(texture),
        state: DemoState::from_scene(scene),
        clock: FrameClock::new(),
        renderer: None,
        cursor_captured: false,
        last_error: None,
    };
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    let camera = app.state.camera();
    info!(
        "exiting with camera at ({:.2}, {:.2}, {:.2})",
        camera.position.x, camera.position.y, camera.position.z
    );
    // GPU resources go before the window handle they were created from.
    drop(app.renderer.take());
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct DemoApp {
    scene: SceneConfig,
    texture: Option<TextureImage>,
    state: DemoState,
    clock: FrameClock,
    renderer: Option<Renderer>,
    /// Grabbed cursors only report motion through device events.
    cursor_captured: bool,
    last_error: Option<anyhow::Error>,
}

impl DemoApp {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(texture) = self.texture.take() else {
            return Ok(());
        };
        let attributes = Window::default_attributes()
            .with_title(self.scene.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.scene.window.width as f64,
                self.scene.window.height as f64,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        self.cursor_captured = capture_cursor(&window);

        let renderer = block_on(Renderer::new(
            Arc::clone(&window),
            self.state.mesh(),
            texture,
            self.state.lights().len(),
        ))?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let elapsed = self.clock.tick();
        self.state.advance(elapsed);
        if self.state.quit_requested() {
            event_loop.exit();
            return Ok(());
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let frame = self.state.frame_params(renderer.aspect());
        match renderer.render(&frame) {
            Ok(()) => Ok(()),
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                info!("surface lost; reconfiguring");
                renderer.reconfigure();
                Ok(())
            }
            Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                warn!("surface timeout; skipping frame");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn handle_keyboard(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(action) = map_key(code) else {
            return;
        };
        let event = match event.state {
            ElementState::Pressed => InputEvent::Pressed(action),
            ElementState::Released => InputEvent::Released(action),
        };
        self.state.queue_event(event);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => renderer.resize(size),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event),
            WindowEvent::CursorMoved { position, .. } if !self.cursor_captured => {
                self.state.queue_event(InputEvent::CursorMoved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::Focused(false) => {
                self.state.queue_event(InputEvent::FocusLost);
            }
            WindowEvent::CursorEntered { .. } => {
                debug!("cursor entered window");
                self.state.queue_event(InputEvent::CursorEntered);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                self.state.queue_event(InputEvent::Scroll { y });
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (x, y) } = event {
            if self.cursor_captured {
                self.state.queue_event(InputEvent::MouseDelta { x, y });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window().request_redraw();
        }
    }
}

/// Hides and grabs the cursor. Returns whether the grab took effect, in which
/// case mouse-look switches to relative device motion.
fn capture_cursor(window: &Window) -> bool {
    window.set_cursor_visible(false);
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => true,
        Err(err) => {
            warn!("unable to grab cursor, using absolute cursor positions: {err}");
            false
        }
    }
}

fn map_key(code: KeyCode) -> Option<Action> {
    Some(match code {
        KeyCode::KeyW => Action::MoveForward,
        KeyCode::KeyS => Action::MoveBackward,
        KeyCode::KeyA => Action::MoveLeft,
        KeyCode::KeyD => Action::MoveRight,
        KeyCode::KeyE => Action::MoveUp,
        KeyCode::KeyQ => Action::MoveDown,
        KeyCode::KeyK => Action::StopOrbit,
        KeyCode::KeyL => Action::StartOrbit,
        KeyCode::Escape => Action::Quit,
        _ => return None,
    })
}

#[derive(Debug, Error)]
#[error("failed to initialize {stage}: {message}")]
struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &'static str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            stage,
            message: panic_message(panic),
        }
    }

    fn from_error(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    scene: Option<PathBuf>,
    texture: Option<PathBuf>,
    summary_only: bool,
    frames: u32,
    hold: Vec<Action>,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--scene" => options.scene = Some(PathBuf::from(value_for(&mut args, &arg)?)),
                "--texture" => options.texture = Some(PathBuf::from(value_for(&mut args, &arg)?)),
                "--summary-only" => options.summary_only = true,
                "--frames" => {
                    let value = value_for(&mut args, &arg)?;
                    options.frames = value
                        .parse()
                        .map_err(|_| anyhow!("invalid frame count `{value}`. {USAGE}"))?;
                }
                "--hold" => {
                    let value = value_for(&mut args, &arg)?;
                    let action = Action::from_name(&value)
                        .ok_or_else(|| anyhow!("unknown action `{value}`. {USAGE}"))?;
                    options.hold.push(action);
                }
                "-h" | "--help" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_every_flag() {
        let options = parse(&[
            "--scene",
            "demo.xml",
            "--texture",
            "wall.png",
            "--summary-only",
            "--frames",
            "30",
            "--hold",
            "forward",
            "--hold",
            "stop-orbit",
        ])
        .unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("demo.xml")));
        assert_eq!(options.texture, Some(PathBuf::from("wall.png")));
        assert!(options.summary_only);
        assert_eq!(options.frames, 30);
        assert_eq!(options.hold, vec![Action::MoveForward, Action::StopOrbit]);
    }

    #[test]
    fn rejects_unknown_arguments() {
        let err = parse(&["--fullscreen"]).unwrap_err();
        assert!(err.to_string().contains("Unknown argument: --fullscreen"));
        assert!(parse(&["--hold", "jump"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--frames", "-3"]).is_err());
    }

    #[test]
    fn maps_demo_keys() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Action::MoveForward));
        assert_eq!(map_key(KeyCode::KeyK), Some(Action::StopOrbit));
        assert_eq!(map_key(KeyCode::KeyL), Some(Action::StartOrbit));
        assert_eq!(map_key(KeyCode::Escape), Some(Action::Quit));
        assert_eq!(map_key(KeyCode::Space), None);
    }
}
