//! Parametric mesh demos rendered with wgpu.
//!
//! Two programs share the modules below: `shapes` draws a cube, a torus and a
//! height field with wireframe overlays, and `solar` draws a textured Earth
//! orbiting a textured Sun. Mesh generation, shader parsing, the camera and
//! the scenes are plain data and testable without a GPU.

pub mod app;
pub mod camera;
pub mod clock;
pub mod config;
pub mod gpu;
pub mod input;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod shader;
pub mod summary;
pub mod texture;

pub use app::{DemoApp, WindowInitError};
pub use camera::{Camera, CameraMode, CameraParams, Projection};
pub use clock::FrameClock;
pub use config::{Demo, DemoSettings};
pub use input::{InputState, KeyCode, NamedKey};
pub use mesh::{Mesh, Topology, VertexLayout, STRIP_RESTART};
pub use render::Renderer;
pub use scene::{scene_for, DrawItem, LightParams, Material, MeshKind, Scene, TextureKind};
pub use shader::{BuiltinShader, ShaderError, ShaderProgram, ShaderSource};
pub use summary::write_summary;
pub use texture::{Texture, TextureError};
