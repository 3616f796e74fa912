//! CPU evaluation of the pyramid's fragment lighting.
//!
//! Mirrors `fs_main` in the pyramid fragment shader term for term. Each light
//! contributes `ambient + diffuse + specular`, modulated by the texel, and the
//! contributions are summed without clamping.

use glam::Vec3;

use crate::lights::Light;

/// Shading constants shared with the WGSL fragment shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongParams {
    /// Lower bound of the diffuse factor, so back faces are never black.
    pub diffuse_floor: f32,
    pub specular_strength: f32,
    pub highlight_size: f32,
}

impl PhongParams {
    /// Specular strength and highlight size are both zero, which disables the
    /// specular term entirely.
    pub const DEFAULT: Self = Self {
        diffuse_floor: 0.2,
        specular_strength: 0.0,
        highlight_size: 0.0,
    };
}

impl Default for PhongParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Lighting contribution of one point light before texture modulation.
pub fn point_light(
    params: &PhongParams,
    light: &Light,
    normal: Vec3,
    fragment: Vec3,
    view_position: Vec3,
) -> Vec3 {
    let normal = normal.normalize_or_zero();
    let ambient = light.intensity * light.color;

    let light_dir = (light.position - fragment).normalize_or_zero();
    let impact = normal.dot(light_dir).max(params.diffuse_floor);
    let diffuse = impact * light.color;

    let specular = if params.specular_strength > 0.0 {
        let view_dir = (view_position - fragment).normalize_or_zero();
        let reflect_dir = reflect(-light_dir, normal);
        let component = view_dir.dot(reflect_dir).max(0.0).powf(params.highlight_size);
        params.specular_strength * component * light.color
    } else {
        Vec3::ZERO
    };

    ambient + diffuse + specular
}

/// Final fragment color for `texel`, summed over all lights.
pub fn shade(
    params: &PhongParams,
    lights: &[Light],
    normal: Vec3,
    fragment: Vec3,
    view_position: Vec3,
    texel: Vec3,
) -> Vec3 {
    lights
        .iter()
        .map(|light| point_light(params, light, normal, fragment, view_position) * texel)
        .sum()
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn light_at(position: Vec3, color: Vec3, intensity: f32) -> Light {
        Light::new(position, color, intensity)
    }

    #[test]
    fn facing_light_gets_full_diffuse() {
        let light = light_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE, 0.5);
        let color = point_light(&PhongParams::DEFAULT, &light, Vec3::Y, Vec3::ZERO, Vec3::Z);
        assert!((color - Vec3::splat(1.5)).length() < EPS);
    }

    #[test]
    fn faces_turned_away_keep_the_diffuse_floor() {
        let light = light_at(Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.0);
        let color = point_light(&PhongParams::DEFAULT, &light, Vec3::Y, Vec3::ZERO, Vec3::Z);
        assert!((color - Vec3::new(0.0, 0.2, 0.0)).length() < EPS);
    }

    #[test]
    fn disabled_specular_ignores_view_position() {
        let light = light_at(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.3, 0.6, 0.9), 0.4);
        let params = PhongParams::DEFAULT;
        let a = point_light(&params, &light, Vec3::Y, Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0));
        let b = point_light(&params, &light, Vec3::Y, Vec3::ZERO, Vec3::new(-7.0, 0.1, 2.0));
        assert_eq!(a, b);
    }

    #[test]
    fn enabled_specular_adds_highlight_on_mirror_direction() {
        let params = PhongParams {
            specular_strength: 1.0,
            highlight_size: 16.0,
            ..PhongParams::DEFAULT
        };
        let light = light_at(Vec3::new(-1.0, 1.0, 0.0), Vec3::ONE, 0.0);
        let mirror = Vec3::new(1.0, 1.0, 0.0);
        let lit = point_light(&params, &light, Vec3::Y, Vec3::ZERO, mirror);
        let flat = point_light(&PhongParams::DEFAULT, &light, Vec3::Y, Vec3::ZERO, mirror);
        assert!((lit - flat - Vec3::ONE).length() < 1e-4);
    }

    #[test]
    fn contributions_sum_without_clamping() {
        let lights = [
            light_at(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 1.0),
            light_at(Vec3::new(0.0, 4.0, 0.0), Vec3::ONE, 1.0),
        ];
        let color = shade(&PhongParams::DEFAULT, &lights, Vec3::Y, Vec3::ZERO, Vec3::Z, Vec3::ONE);
        assert!((color - Vec3::splat(4.0)).length() < EPS);
    }

    #[test]
    fn texel_modulates_each_light() {
        let lights = [light_at(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 0.0)];
        let texel = Vec3::new(0.5, 0.25, 0.0);
        let color = shade(&PhongParams::DEFAULT, &lights, Vec3::Y, Vec3::ZERO, Vec3::Z, texel);
        assert!((color - texel).length() < EPS);
    }
}
