use glam::{Mat4, Vec2, Vec3};

/// Per-frame values produced by the update step and consumed by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameParams {
    /// Pyramid model matrix.
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub uv_scale: Vec2,
    pub lights: Vec<LightParams>,
}

/// Lighting state and marker transform of one light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub model: Mat4,
}
