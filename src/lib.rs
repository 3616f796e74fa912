//! A textured pyramid lit by two orbiting point lights, viewed through a
//! free-flying camera.
//!
//! Everything except [`render`] is plain CPU state so the camera, the light
//! orbit, input handling and the lighting model can be exercised without a
//! window or GPU.

pub mod app;
pub mod camera;
pub mod input;
pub mod lighting;
pub mod lights;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod texture;

pub use app::{print_final_state, DemoState, FrameClock, SUMMARY_STEP};
pub use camera::{Camera, CameraMovement};
pub use input::{Action, CursorTracker, InputEvent, InputQueue, InputState};
pub use lighting::PhongParams;
pub use lights::{Light, LightRegistry};
pub use mesh::Mesh;
pub use render::{FrameParams, LightParams, RenderError, Renderer, ShaderError, ShaderStage};
pub use scene::SceneConfig;
pub use texture::{TextureError, TextureImage};
