//! Named uniform access on top of wgpu's byte-addressed buffers.
//!
//! A [`UniformLayout`] lists the fields of a WGSL uniform struct in
//! declaration order and computes their offsets with the uniform address
//! space rules. A [`UniformBlock`] is the CPU copy of one such struct that the
//! frame code writes by name before it is flushed to the GPU.

use std::fmt;

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use super::common::{FrameParams, LightParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Mat4,
}

impl UniformKind {
    fn align(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Mat4 => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Mat4 => 64,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write(&self, out: &mut [u8]) {
        match self {
            Self::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec2(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniformError {
    #[error("program `{program}` has no uniform named `{name}`")]
    Unknown { program: &'static str, name: String },
    #[error("uniform `{name}` of program `{program}` is {expected}, got {found}")]
    KindMismatch {
        program: &'static str,
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    pub kind: UniformKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    program: &'static str,
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    /// Builds a layout from `(name, kind)` pairs in WGSL declaration order.
    pub fn new(program: &'static str, fields: &[(&'static str, UniformKind)]) -> Self {
        let mut cursor = 0;
        let mut struct_align = 16;
        let fields = fields
            .iter()
            .map(|&(name, kind)| {
                let offset = align_up(cursor, kind.align());
                cursor = offset + kind.size();
                struct_align = struct_align.max(kind.align());
                UniformField { name, kind, offset }
            })
            .collect();
        Self {
            program,
            fields,
            size: align_up(cursor, struct_align),
        }
    }

    /// Total byte size of the struct, padded to its alignment.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// CPU-side copy of one uniform struct, written field by field.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size()];
        Self { layout, data }
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        let value = value.into();
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| UniformError::Unknown {
                program: self.layout.program,
                name: name.to_string(),
            })?;
        if field.kind != value.kind() {
            return Err(UniformError::KindMismatch {
                program: self.layout.program,
                name: name.to_string(),
                expected: field.kind,
                found: value.kind(),
            });
        }
        let range = field.offset..field.offset + field.kind.size();
        value.write(&mut self.data[range]);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Field order of `PyramidUniforms` in the pyramid shaders.
pub fn pyramid_layout() -> UniformLayout {
    UniformLayout::new(
        "pyramid",
        &[
            ("model", UniformKind::Mat4),
            ("view", UniformKind::Mat4),
            ("projection", UniformKind::Mat4),
            ("lightColor1", UniformKind::Vec3),
            ("lightIntensity1", UniformKind::Float),
            ("lightPos1", UniformKind::Vec3),
            ("lightColor2", UniformKind::Vec3),
            ("lightIntensity2", UniformKind::Float),
            ("lightPos2", UniformKind::Vec3),
            ("viewPosition", UniformKind::Vec3),
            ("uvScale", UniformKind::Vec2),
        ],
    )
}

/// Field order of `LampUniforms` in the lamp vertex shader.
pub fn lamp_layout() -> UniformLayout {
    UniformLayout::new(
        "lamp",
        &[
            ("model", UniformKind::Mat4),
            ("view", UniformKind::Mat4),
            ("projection", UniformKind::Mat4),
        ],
    )
}

/// Uploads transforms, per-light state under `lightColor<N>`, `lightPos<N>`
/// and `lightIntensity<N>` (N starting at 1), the camera position and the UV
/// scale.
pub fn write_pyramid_uniforms(
    block: &mut UniformBlock,
    frame: &FrameParams,
) -> Result<(), UniformError> {
    block.set("model", frame.model)?;
    block.set("view", frame.view)?;
    block.set("projection", frame.projection)?;
    for (index, light) in frame.lights.iter().enumerate() {
        let slot = index + 1;
        block.set(&format!("lightColor{slot}"), light.color)?;
        block.set(&format!("lightPos{slot}"), light.position)?;
        block.set(&format!("lightIntensity{slot}"), light.intensity)?;
    }
    block.set("viewPosition", frame.camera_position)?;
    block.set("uvScale", frame.uv_scale)
}

pub fn write_lamp_uniforms(
    block: &mut UniformBlock,
    frame: &FrameParams,
    light: &LightParams,
) -> Result<(), UniformError> {
    block.set("model", light.model)?;
    block.set("view", frame.view)?;
    block.set("projection", frame.projection)
}
