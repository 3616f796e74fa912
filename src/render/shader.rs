use std::fmt;

use anyhow::{anyhow, Result};
use log::{debug, info};
use thiserror::Error;

use super::resources::{DepthBuffer, GpuTexture};
use super::uniforms::{UniformBlock, UniformLayout};
use crate::mesh::VERTEX_STRIDE;

/// Stage of program creation that produced a [`ShaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Link => "link",
        })
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed for shader program `{program}`:\n{log}")]
pub struct ShaderError {
    pub program: &'static str,
    pub stage: ShaderStage,
    pub log: String,
}

/// Everything needed to build one program.
pub struct ProgramSource {
    pub label: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub attributes: &'static [wgpu::VertexAttribute],
    pub uniforms: UniformLayout,
    /// Name of the sampled texture binding, if the program reads one.
    pub texture: Option<&'static str>,
}

/// Compiled and linked render pipeline plus its uniform contract.
pub struct ShaderProgram {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    uniforms: UniformLayout,
    texture: Option<&'static str>,
}

impl ShaderProgram {
    /// Compiles the vertex and fragment modules and links them into a pipeline.
    ///
    /// Each step runs inside a validation error scope so a failure is reported
    /// with the stage it came from instead of reaching the device's uncaptured
    /// error handler.
    pub fn create(
        device: &wgpu::Device,
        source: ProgramSource,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(device, source.label, ShaderStage::Vertex, source.vertex)?;
        let fragment = compile_stage(device, source.label, ShaderStage::Fragment, source.fragment)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_layout = create_bind_layout(device, source.label, source.texture.is_some());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}-pipeline-layout", source.label)),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{}-pipeline", source.label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: source.attributes,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError {
                program: source.label,
                stage: ShaderStage::Link,
                log: err.to_string(),
            });
        }

        info!("linked shader program `{}`", source.label);
        Ok(Self {
            label: source.label,
            pipeline,
            bind_layout,
            uniforms: source.uniforms,
            texture: source.texture,
        })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Allocates the uniform buffer and bind group for one draw call.
    pub(crate) fn create_slot(
        &self,
        device: &wgpu::Device,
        label: &str,
        texture: Option<&GpuTexture>,
    ) -> Result<DrawSlot> {
        let block = UniformBlock::new(self.uniforms.clone());
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}-uniforms")),
            size: block.bytes().len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        match (self.texture, texture) {
            (Some(_), Some(texture)) => {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                });
            }
            (Some(name), None) => {
                return Err(anyhow!(
                    "program `{}` samples `{name}` but no texture was bound",
                    self.label
                ));
            }
            (None, Some(_)) => {
                return Err(anyhow!("program `{}` does not sample a texture", self.label));
            }
            (None, None) => {}
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-bind-group")),
            layout: &self.bind_layout,
            entries: &entries,
        });
        debug!("allocated draw slot `{label}` for program `{}`", self.label);
        Ok(DrawSlot {
            block,
            buffer,
            bind_group,
        })
    }
}

/// Per-draw uniform storage: CPU staging block, GPU buffer and bind group.
pub(crate) struct DrawSlot {
    pub block: UniformBlock,
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl DrawSlot {
    pub fn flush(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, self.block.bytes());
    }
}

fn compile_stage(
    device: &wgpu::Device,
    program: &'static str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{program}-{stage}")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(ShaderError {
            program,
            stage,
            log: err.to_string(),
        }),
        None => Ok(module),
    }
}

fn create_bind_layout(
    device: &wgpu::Device,
    label: &str,
    with_texture: bool,
) -> wgpu::BindGroupLayout {
    let uniform_visibility = if with_texture {
        wgpu::ShaderStages::VERTEX_FRAGMENT
    } else {
        wgpu::ShaderStages::VERTEX
    };
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: uniform_visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    if with_texture {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label}-bind-layout")),
        entries: &entries,
    })
}
