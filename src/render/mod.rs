pub mod common;
mod renderer;
mod resources;
pub mod shader;
mod shaders;
pub mod uniforms;

pub use common::{FrameParams, LightParams};
pub use renderer::{RenderError, Renderer};
pub use shader::{ShaderError, ShaderStage};
pub use uniforms::{UniformBlock, UniformError, UniformKind, UniformLayout, UniformValue};
