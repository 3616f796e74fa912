use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_SENSITIVITY, DEFAULT_SPEED, DEFAULT_ZOOM};
use crate::lights::{default_lights, Light, DEFAULT_ORBIT_SPEED};
use crate::texture::DEFAULT_TEXTURE;

/// Number of light slots exposed by the pyramid shader.
pub const LIGHT_SLOTS: usize = 2;

/// Everything needed to set up the demo. Omitted XML fields keep the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub pyramid: PyramidConfig,
    pub orbit: OrbitConfig,
    pub lights: Vec<Light>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: Vec3,
    pub speed: f32,
    pub sensitivity: f32,
    /// Initial field of view in degrees.
    pub zoom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidConfig {
    pub position: Vec3,
    pub scale: f32,
    /// Fixed rotation about Y, in radians.
    pub rotation: f32,
    pub uv_scale: Vec2,
    pub texture: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    pub enabled: bool,
    /// Degrees per second.
    pub speed: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig {
                title: "Lighting a Pyramid".to_string(),
                width: 800,
                height: 600,
            },
            camera: CameraConfig {
                position: Vec3::new(0.0, 0.5, 7.0),
                speed: DEFAULT_SPEED,
                sensitivity: DEFAULT_SENSITIVITY,
                zoom: DEFAULT_ZOOM,
            },
            pyramid: PyramidConfig {
                position: Vec3::ZERO,
                scale: 1.0,
                rotation: 8.3,
                uv_scale: Vec2::ONE,
                texture: PathBuf::from(DEFAULT_TEXTURE),
            },
            orbit: OrbitConfig {
                enabled: true,
                speed: DEFAULT_ORBIT_SPEED,
            },
            lights: default_lights(),
        }
    }
}

impl SceneConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("unable to read scene {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("invalid scene {}", path.display()))
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(anyhow!("root element must be <scene>"));
        }
        let mut config = Self::default();

        if let Some(node) = child(&root, "window") {
            let window = &mut config.window;
            if let Some(title) = optional_text(&node, "title") {
                window.title = title;
            }
            window.width = parse_u32(optional_text(&node, "width"), window.width)?;
            window.height = parse_u32(optional_text(&node, "height"), window.height)?;
            if window.width == 0 || window.height == 0 {
                return Err(anyhow!("window size must be non-zero"));
            }
        }

        if let Some(node) = child(&root, "camera") {
            let camera = &mut config.camera;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.speed = parse_f32(optional_text(&node, "speed"), camera.speed)?;
            camera.sensitivity = parse_f32(optional_text(&node, "sensitivity"), camera.sensitivity)?;
            camera.zoom = parse_f32(optional_text(&node, "zoom"), camera.zoom)?;
        }

        if let Some(node) = child(&root, "pyramid") {
            let pyramid = &mut config.pyramid;
            pyramid.position = parse_vec3(optional_text(&node, "position"), pyramid.position)?;
            pyramid.scale = parse_f32(optional_text(&node, "scale"), pyramid.scale)?;
            pyramid.rotation = parse_f32(optional_text(&node, "rotation"), pyramid.rotation)?;
            pyramid.uv_scale = parse_vec2(optional_text(&node, "uv-scale"), pyramid.uv_scale)?;
            if let Some(texture) = optional_text(&node, "texture") {
                pyramid.texture = PathBuf::from(texture);
            }
        }

        if let Some(node) = child(&root, "orbit") {
            let orbit = &mut config.orbit;
            orbit.enabled = parse_bool(optional_text(&node, "enabled"), orbit.enabled)?;
            orbit.speed = parse_f32(optional_text(&node, "speed"), orbit.speed)?;
        }

        let light_nodes: Vec<_> = root.children().filter(|n| n.has_tag_name("light")).collect();
        if !light_nodes.is_empty() {
            if light_nodes.len() != LIGHT_SLOTS {
                return Err(anyhow!(
                    "scene defines {} lights, expected exactly {LIGHT_SLOTS}",
                    light_nodes.len()
                ));
            }
            config.lights = light_nodes
                .iter()
                .zip(default_lights())
                .map(|(node, default)| parse_light(node, default))
                .collect::<Result<_>>()?;
        }

        Ok(config)
    }
}

fn parse_light(node: &Node<'_, '_>, default: Light) -> Result<Light> {
    Ok(Light {
        position: parse_vec3(optional_text(node, "position"), default.position)?,
        color: parse_vec3(optional_text(node, "color"), default.color)?,
        intensity: parse_f32(optional_text(node, "intensity"), default.intensity)?,
        scale: parse_f32(optional_text(node, "scale"), default.scale)?,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components<const N: usize>(value: &str) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    let mut numbers = value.split_whitespace();
    for slot in &mut out {
        let component = numbers
            .next()
            .ok_or_else(|| anyhow!("vector `{value}` is missing components"))?;
        *slot = component
            .parse::<f32>()
            .map_err(|err| anyhow!("invalid vector component `{component}`: {err}"))?;
    }
    Ok(out)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_components::<3>(&value).map(Vec3::from_array),
        None => Ok(default),
    }
}

fn parse_vec2(value: Option<String>, default: Vec2) -> Result<Vec2> {
    match value {
        Some(value) => parse_components::<2>(&value).map(Vec2::from_array),
        None => Ok(default),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(anyhow!("failed to parse boolean `{other}`")),
        None => Ok(default),
    }
}
