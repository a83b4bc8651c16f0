//! wgpu rendering of a scene's draw list.
//!
//! Bind group 0 carries the per-frame globals, group 1 the per-draw object
//! constants and group 2 the texture and sampler of textured materials.

pub mod pipeline;
pub mod renderer;
pub mod uniforms;

pub use pipeline::{PipelineKey, Primitive};
pub use renderer::Renderer;
pub use uniforms::{GlobalUniform, ObjectConstants};
