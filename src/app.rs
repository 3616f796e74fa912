use std::time::Instant;

use glam::{Mat3, Mat4, Vec2, Vec3};
use log::debug;

use crate::camera::Camera;
use crate::input::{self, Action, CursorTracker, InputEvent, InputQueue, InputState};
use crate::lighting::{self, PhongParams};
use crate::lights::LightRegistry;
use crate::mesh::Mesh;
use crate::render::{FrameParams, LightParams};
use crate::scene::SceneConfig;
use crate::texture::TextureImage;

/// Fixed step used by the headless simulation.
pub const SUMMARY_STEP: f32 = 1.0 / 60.0;

/// Measures the time between frames.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick. The first tick reports zero.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let elapsed = self
            .last
            .and_then(|last| now.checked_duration_since(last))
            .map(|duration| duration.as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        elapsed
    }
}

/// Mutable state of the running demo, shared by the window loop and the
/// headless simulation.
#[derive(Debug)]
pub struct DemoState {
    camera: Camera,
    lights: LightRegistry,
    mesh: Mesh,
    pyramid_model: Mat4,
    uv_scale: Vec2,
    events: InputQueue,
    held: InputState,
    cursor: CursorTracker,
    quit: bool,
}

impl DemoState {
    pub fn from_scene(scene: &SceneConfig) -> Self {
        let camera = Camera::new(scene.camera.position)
            .with_speed(scene.camera.speed)
            .with_sensitivity(scene.camera.sensitivity)
            .with_zoom(scene.camera.zoom);
        let mut lights =
            LightRegistry::new(scene.lights.clone()).with_orbit_speed(scene.orbit.speed);
        lights.set_orbiting(scene.orbit.enabled);
        let pyramid = &scene.pyramid;
        let pyramid_model = Mat4::from_translation(pyramid.position)
            * Mat4::from_rotation_y(pyramid.rotation)
            * Mat4::from_scale(Vec3::splat(pyramid.scale));

        Self {
            camera,
            lights,
            mesh: Mesh::pyramid(),
            pyramid_model,
            uv_scale: pyramid.uv_scale,
            events: InputQueue::new(),
            held: InputState::new(),
            cursor: CursorTracker::new(),
            quit: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn pyramid_model(&self) -> Mat4 {
        self.pyramid_model
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Queues an event for the next [`DemoState::advance`].
    pub fn queue_event(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Runs one frame of simulation.
    ///
    /// Queued events are applied in arrival order first, then every held
    /// action acts for `elapsed` seconds, then the lights orbit.
    pub fn advance(&mut self, elapsed: f32) {
        for event in self.events.drain() {
            match event {
                InputEvent::Pressed(action) => self.held.set_down(action),
                InputEvent::Released(action) => self.held.set_up(action),
                InputEvent::CursorMoved { x, y } => {
                    let (x_offset, y_offset) = self.cursor.offset(x, y);
                    self.camera.process_mouse_movement(x_offset, y_offset);
                }
                InputEvent::MouseDelta { x, y } => {
                    let (x_offset, y_offset) = input::motion_offset(x, y);
                    self.camera.process_mouse_movement(x_offset, y_offset);
                }
                InputEvent::CursorEntered => self.cursor.reset(),
                InputEvent::FocusLost => {
                    debug!("focus lost; releasing held keys");
                    self.held.clear();
                    self.cursor.reset();
                }
                InputEvent::Scroll { y } => self.camera.process_mouse_scroll(y),
            }
        }

        let held: Vec<Action> = self.held.held().collect();
        for action in held {
            if let Some(direction) = action.movement() {
                self.camera.process_keyboard(direction, elapsed);
                continue;
            }
            match action {
                Action::StartOrbit => self.lights.set_orbiting(true),
                Action::StopOrbit => self.lights.set_orbiting(false),
                Action::Quit => {
                    debug!("quit requested");
                    self.quit = true;
                }
                _ => {}
            }
        }

        self.lights.update(elapsed);
    }

    /// Transforms and light state for drawing the current frame.
    pub fn frame_params(&self, aspect: f32) -> FrameParams {
        FrameParams {
            model: self.pyramid_model,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(aspect),
            camera_position: self.camera.position,
            uv_scale: self.uv_scale,
            lights: self
                .lights
                .iter()
                .map(|light| LightParams {
                    position: light.position,
                    color: light.color,
                    intensity: light.intensity,
                    model: light.model_matrix(),
                })
                .collect(),
        }
    }

    /// Color of each pyramid face at its centroid under a white texel, as the
    /// fragment shader would compute it.
    pub fn face_colors(&self) -> Vec<Vec3> {
        let normal_matrix = Mat3::from_mat4(self.pyramid_model);
        self.mesh
            .triangles()
            .map(|[a, b, c]| {
                let centroid = (a.position + b.position + c.position) / 3.0;
                let world = self.pyramid_model.transform_point3(centroid);
                let normal = normal_matrix * a.normal;
                lighting::shade(
                    &PhongParams::DEFAULT,
                    self.lights.lights(),
                    normal,
                    world,
                    self.camera.position,
                    Vec3::ONE,
                )
            })
            .collect()
    }
}

/// Prints the scene summary and the final simulated state to stdout.
pub fn print_final_state(
    scene: &SceneConfig,
    state: &DemoState,
    texture: &TextureImage,
    frames: u32,
) {
    println!(
        "Scene \"{}\" {}x{}: {} vertices, texture {} ({}x{}, {} channels)",
        scene.window.title,
        scene.window.width,
        scene.window.height,
        state.mesh().vertex_count(),
        scene.pyramid.texture.display(),
        texture.width(),
        texture.height(),
        texture.source_channels()
    );
    println!("Simulated {frames} frames");

    let camera = state.camera();
    println!(
        "Camera pos={} yaw={:.2} pitch={:.2} zoom={:.2}",
        format_vec3(camera.position),
        camera.yaw(),
        camera.pitch(),
        camera.zoom()
    );

    let lights = state.lights();
    println!(
        "Orbit {} at {:.1} deg/s",
        if lights.is_orbiting() { "on" } else { "off" },
        lights.orbit_speed()
    );
    for (index, light) in lights.iter().enumerate() {
        println!(
            "Light {} pos={} color={} intensity={:.2}",
            index + 1,
            format_vec3(light.position),
            format_vec3(light.color),
            light.intensity
        );
    }

    println!("Face colors:");
    for (index, color) in state.face_colors().iter().enumerate() {
        println!(
            " - face {} rgb=({:.3}, {:.3}, {:.3})",
            index + 1,
            color.x,
            color.y,
            color.z
        );
    }
}

/// Two decimals per component; values that round to zero print as `0.00`.
fn format_vec3(value: Vec3) -> String {
    let [x, y, z] = value
        .to_array()
        .map(|component| (component * 100.0).round() / 100.0 + 0.0);
    format!("({x:.2}, {y:.2}, {z:.2})")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const EPS: f32 = 1e-3;

    fn run_frames(state: &mut DemoState, frames: u32) {
        for _ in 0..frames {
            state.advance(SUMMARY_STEP);
        }
    }

    #[test]
    fn first_clock_tick_is_zero() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick_at(start), 0.0);
        let elapsed = clock.tick_at(start + Duration::from_millis(250));
        assert!((elapsed - 0.25).abs() < 1e-6);
    }

    #[test]
    fn clock_going_backwards_reports_zero() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::new();
        clock.tick_at(start);
        assert_eq!(clock.tick_at(start - Duration::from_millis(10)), 0.0);
    }

    #[test]
    fn first_mouse_sample_does_not_rotate() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::CursorMoved { x: 1000.0, y: 20.0 });
        state.advance(0.0);
        assert_eq!(state.camera().yaw(), -90.0);
        assert_eq!(state.camera().pitch(), 0.0);

        state.queue_event(InputEvent::CursorMoved { x: 1010.0, y: 10.0 });
        state.advance(0.0);
        assert!((state.camera().yaw() - -89.0).abs() < EPS);
        assert!((state.camera().pitch() - 1.0).abs() < EPS);
    }

    #[test]
    fn cursor_reentry_reseeds() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        state.queue_event(InputEvent::CursorEntered);
        state.queue_event(InputEvent::CursorMoved { x: 400.0, y: 300.0 });
        state.advance(0.0);
        assert_eq!(state.camera().yaw(), -90.0);
    }

    #[test]
    fn relative_motion_turns_past_half_a_circle() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        // 400 px per sample at 0.1 deg/px is 40 degrees, well beyond any
        // window-bounded cursor range after five samples.
        for _ in 0..5 {
            state.queue_event(InputEvent::MouseDelta { x: 400.0, y: 0.0 });
        }
        state.advance(0.0);
        assert!((state.camera().yaw() - 110.0).abs() < EPS);
        assert!(state.camera().yaw() - -90.0 > 180.0);

        state.queue_event(InputEvent::MouseDelta { x: 0.0, y: 50.0 });
        state.advance(0.0);
        assert!((state.camera().pitch() - -5.0).abs() < EPS);
    }

    #[test]
    fn first_relative_motion_is_applied_without_seeding() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::MouseDelta { x: 10.0, y: 0.0 });
        state.advance(0.0);
        assert!((state.camera().yaw() - -89.0).abs() < EPS);
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::Pressed(Action::MoveForward));
        state.advance(SUMMARY_STEP);
        let position = state.camera().position;

        state.queue_event(InputEvent::FocusLost);
        run_frames(&mut state, 30);
        assert_eq!(state.camera().position, position);
    }

    #[test]
    fn holding_forward_for_one_second() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::Pressed(Action::MoveForward));
        run_frames(&mut state, 60);
        let position = state.camera().position;
        assert!((position - Vec3::new(0.0, 0.5, 4.5)).length() < EPS);

        state.queue_event(InputEvent::Released(Action::MoveForward));
        run_frames(&mut state, 10);
        assert!((state.camera().position - position).length() < 1e-6);
    }

    #[test]
    fn orbit_keys_set_and_clear() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::Pressed(Action::StopOrbit));
        state.advance(SUMMARY_STEP);
        let frozen = state.lights().lights().to_vec();

        state.queue_event(InputEvent::Released(Action::StopOrbit));
        state.queue_event(InputEvent::Pressed(Action::StopOrbit));
        run_frames(&mut state, 30);
        assert!(!state.lights().is_orbiting());
        assert_eq!(state.lights().lights(), frozen.as_slice());

        state.queue_event(InputEvent::Pressed(Action::StartOrbit));
        state.queue_event(InputEvent::Released(Action::StopOrbit));
        state.advance(SUMMARY_STEP);
        assert!(state.lights().is_orbiting());
        assert_ne!(state.lights().lights(), frozen.as_slice());
    }

    #[test]
    fn key_released_within_the_frame_has_no_effect() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::Pressed(Action::MoveLeft));
        state.queue_event(InputEvent::Released(Action::MoveLeft));
        state.advance(1.0);
        assert_eq!(state.camera().position, Vec3::new(0.0, 0.5, 7.0));
    }

    #[test]
    fn scroll_zooms_in() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        state.queue_event(InputEvent::Scroll { y: 5.0 });
        state.advance(0.0);
        assert_eq!(state.camera().zoom(), 40.0);
    }

    #[test]
    fn quit_sets_flag() {
        let mut state = DemoState::from_scene(&SceneConfig::default());
        assert!(!state.quit_requested());
        state.queue_event(InputEvent::Pressed(Action::Quit));
        state.advance(SUMMARY_STEP);
        assert!(state.quit_requested());
    }

    #[test]
    fn frame_params_carry_every_light() {
        let state = DemoState::from_scene(&SceneConfig::default());
        let frame = state.frame_params(800.0 / 600.0);
        assert_eq!(frame.lights.len(), 2);
        assert_eq!(frame.model, Mat4::from_rotation_y(8.3));
        assert_eq!(frame.camera_position, Vec3::new(0.0, 0.5, 7.0));
        assert_eq!(frame.lights[0].model, state.lights().lights()[0].model_matrix());
    }

    #[test]
    fn tiny_negative_components_print_as_zero() {
        assert_eq!(
            format_vec3(Vec3::new(-1.1e-7, 0.5, -0.7071)),
            "(0.00, 0.50, -0.71)"
        );
    }

    #[test]
    fn faces_are_lit_at_least_by_the_diffuse_floor() {
        let state = DemoState::from_scene(&SceneConfig::default());
        let colors = state.face_colors();
        assert_eq!(colors.len(), 6);
        // Every light adds at least ambient plus 0.2 of its color on green.
        let floor = (1.0 + 0.2) * 0.8 + (0.1 + 0.2) * 0.1;
        for color in colors {
            assert!(color.y >= floor - EPS, "{color:?}");
        }
    }
}
