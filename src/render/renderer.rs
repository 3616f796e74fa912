use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::common::FrameParams;
use super::resources::{DepthBuffer, GpuTexture, MeshBuffers};
use super::shader::{DrawSlot, ProgramSource, ShaderProgram};
use super::shaders;
use super::uniforms::{
    lamp_layout, pyramid_layout, write_lamp_uniforms, write_pyramid_uniforms, UniformError,
};
use crate::mesh::Mesh;
use crate::texture::TextureImage;

const PYRAMID_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const LAMP_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Failure while drawing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Uniform(#[from] UniformError),
}

/// Owns every GPU object. Dropping it releases them.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    pyramid_program: ShaderProgram,
    lamp_program: ShaderProgram,
    pyramid_slot: DrawSlot,
    lamp_slots: Vec<DrawSlot>,
    mesh: MeshBuffers,
    _texture: GpuTexture,
}

impl Renderer {
    /// Creates the surface and device, compiles both programs and uploads the
    /// mesh and texture. One lamp slot is allocated per light.
    pub async fn new(
        window: Arc<Window>,
        mesh: &Mesh,
        texture: TextureImage,
        light_count: usize,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        let adapter_info = adapter.get_info();
        info!(
            "using adapter {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            required_features: wgpu::Features::empty(),
            // Raise texture and surface size limits to what the adapter supports.
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shader output is written as-is, so a linear target keeps the colors
        // the lighting model computes.
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        info!("surface format {surface_format:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let pyramid_program = ShaderProgram::create(
            &device,
            ProgramSource {
                label: "pyramid",
                vertex: shaders::PYRAMID_VERTEX,
                fragment: shaders::PYRAMID_FRAGMENT,
                attributes: &PYRAMID_ATTRIBUTES,
                uniforms: pyramid_layout(),
                texture: Some("uTexture"),
            },
            surface_format,
        )?;
        let lamp_program = ShaderProgram::create(
            &device,
            ProgramSource {
                label: "lamp",
                vertex: shaders::LAMP_VERTEX,
                fragment: shaders::LAMP_FRAGMENT,
                attributes: &LAMP_ATTRIBUTES,
                uniforms: lamp_layout(),
                texture: None,
            },
            surface_format,
        )?;

        let max_dimension = device.limits().max_texture_dimension_2d;
        texture
            .ensure_fits(max_dimension)
            .context("texture cannot be uploaded")?;
        info!(
            "uploading {}x{} texture with {} mip levels",
            texture.width(),
            texture.height(),
            texture.mip_level_count()
        );
        let gpu_texture = GpuTexture::upload(&device, &queue, texture, "pyramid-texture");
        let mesh = MeshBuffers::from_mesh(&device, mesh, "pyramid");

        let pyramid_slot = pyramid_program.create_slot(&device, "pyramid", Some(&gpu_texture))?;
        let lamp_slots = (1..=light_count)
            .map(|index| lamp_program.create_slot(&device, &format!("lamp-{index}"), None))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            pyramid_program,
            lamp_program,
            pyramid_slot,
            lamp_slots,
            mesh,
            _texture: gpu_texture,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Width over height of the current surface, 1.0 while minimized.
    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Resizes the swap chain and depth buffer. Zero-sized requests are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Reconfigures the surface with its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Draws the pyramid followed by one marker per light.
    pub fn render(&mut self, frame: &FrameParams) -> Result<(), RenderError> {
        write_pyramid_uniforms(&mut self.pyramid_slot.block, frame)?;
        self.pyramid_slot.flush(&self.queue);
        for (slot, light) in self.lamp_slots.iter_mut().zip(&frame.lights) {
            write_lamp_uniforms(&mut slot.block, frame, light)?;
            slot.flush(&self.queue);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_vertex_buffer(0, self.mesh.vertex.slice(..));

            pass.set_pipeline(self.pyramid_program.pipeline());
            pass.set_bind_group(0, &self.pyramid_slot.bind_group, &[]);
            pass.draw(0..self.mesh.vertex_count, 0..1);

            pass.set_pipeline(self.lamp_program.pipeline());
            for slot in self.lamp_slots.iter().take(frame.lights.len()) {
                pass.set_bind_group(0, &slot.bind_group, &[]);
                pass.draw(0..self.mesh.vertex_count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
