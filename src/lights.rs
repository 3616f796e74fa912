use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Degrees per second the lights travel around the world Y axis.
pub const DEFAULT_ORBIT_SPEED: f32 = 45.0;

/// Point light with a small visible marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    /// Uniform scale of the marker mesh.
    pub scale: f32,
    pub color: Vec3,
    /// Nominally in `[0, 1]`; not enforced.
    pub intensity: f32,
}

impl Light {
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            scale: 0.3,
            color,
            intensity,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Model matrix of the marker: translate then scale, no rotation.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Distance from the world Y axis.
    pub fn orbit_radius(&self) -> f32 {
        Vec3::new(self.position.x, 0.0, self.position.z).length()
    }
}

/// Green key light and dim blue fill light.
pub fn default_lights() -> Vec<Light> {
    vec![
        Light::new(Vec3::new(2.0, 0.5, 1.0), Vec3::new(0.1, 0.8, 0.1), 1.0),
        Light::new(Vec3::new(-3.0, 2.0, 1.0), Vec3::new(0.1, 0.1, 0.8), 0.1),
    ]
}

/// Ordered set of scene lights plus the orbit switch.
#[derive(Debug, Clone, PartialEq)]
pub struct LightRegistry {
    lights: Vec<Light>,
    orbiting: bool,
    /// Degrees per second.
    orbit_speed: f32,
}

impl LightRegistry {
    pub fn new(lights: Vec<Light>) -> Self {
        Self {
            lights,
            orbiting: true,
            orbit_speed: DEFAULT_ORBIT_SPEED,
        }
    }

    pub fn with_orbit_speed(mut self, degrees_per_second: f32) -> Self {
        self.orbit_speed = degrees_per_second;
        self
    }

    /// Absolute set, so repeated presses of the same key never flip the state.
    pub fn set_orbiting(&mut self, orbiting: bool) {
        self.orbiting = orbiting;
    }

    pub fn is_orbiting(&self) -> bool {
        self.orbiting
    }

    pub fn orbit_speed(&self) -> f32 {
        self.orbit_speed
    }

    /// Rotates every light about the world Y axis when orbiting is on.
    pub fn update(&mut self, elapsed: f32) {
        if !self.orbiting || elapsed <= 0.0 {
            return;
        }
        let rotation = Mat4::from_axis_angle(Vec3::Y, self.orbit_speed.to_radians() * elapsed);
        for light in &mut self.lights {
            light.position = (rotation * light.position.extend(1.0)).truncate();
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

impl Default for LightRegistry {
    fn default() -> Self {
        Self::new(default_lights())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_preserves_radius_and_height() {
        let mut registry = LightRegistry::default();
        let before: Vec<(f32, f32)> = registry
            .iter()
            .map(|light| (light.orbit_radius(), light.position.y))
            .collect();
        for _ in 0..1_000 {
            registry.update(1.0 / 60.0);
        }
        for (light, (radius, height)) in registry.iter().zip(before) {
            assert!((light.orbit_radius() - radius).abs() < 1e-3);
            assert!((light.position.y - height).abs() < 1e-5);
        }
    }

    #[test]
    fn two_seconds_turn_a_quarter_circle() {
        let mut registry = LightRegistry::new(vec![Light::new(Vec3::X, Vec3::ONE, 1.0)]);
        registry.update(2.0);
        // 90 degrees about +Y sends +X to -Z.
        let position = registry.lights()[0].position;
        assert!((position - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn stopped_orbit_freezes_and_resumes_from_frozen_position() {
        let mut registry = LightRegistry::default();
        registry.update(0.5);
        registry.set_orbiting(false);
        let frozen = registry.lights().to_vec();
        for _ in 0..10 {
            registry.update(0.25);
        }
        assert_eq!(registry.lights(), frozen.as_slice());

        registry.set_orbiting(true);
        registry.update(0.25);
        let mut expected = LightRegistry::new(frozen);
        expected.update(0.25);
        assert_eq!(registry.lights(), expected.lights());
    }

    #[test]
    fn repeated_set_is_idempotent() {
        let mut registry = LightRegistry::default();
        registry.set_orbiting(false);
        registry.set_orbiting(false);
        assert!(!registry.is_orbiting());
        registry.set_orbiting(true);
        registry.set_orbiting(true);
        assert!(registry.is_orbiting());
    }

    #[test]
    fn marker_model_translates_and_scales() {
        let light = Light::new(Vec3::new(2.0, 0.5, 1.0), Vec3::ONE, 1.0);
        let corner = light.model_matrix().transform_point3(Vec3::ONE);
        assert!((corner - Vec3::new(2.3, 0.8, 1.3)).length() < 1e-5);
    }
}
