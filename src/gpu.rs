//! Owned GPU buffers. Each wrapper allocates and uploads on construction and
//! releases the allocation when dropped.

use wgpu::util::DeviceExt;

use crate::mesh::{Mesh, Topology, VertexLayout};

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

const TEXTURED_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Attribute description of an interleaved vertex array.
pub fn vertex_buffer_layout(layout: VertexLayout) -> wgpu::VertexBufferLayout<'static> {
    let attributes: &'static [wgpu::VertexAttribute] = match layout {
        VertexLayout::Position => &POSITION_ATTRIBUTES,
        VertexLayout::PositionNormalUv => &TEXTURED_ATTRIBUTES,
    };
    wgpu::VertexBufferLayout {
        array_stride: (layout.stride() * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

pub struct VertexBuffer {
    buffer: wgpu::Buffer,
}

impl VertexBuffer {
    pub fn new(device: &wgpu::Device, label: &str, data: &[f32]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, slot: u32) {
        pass.set_vertex_buffer(slot, self.buffer.slice(..));
    }
}

pub struct IndexBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

impl IndexBuffer {
    pub fn new(device: &wgpu::Device, label: &str, indices: &[u32]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            buffer,
            len: indices.len() as u32,
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_index_buffer(self.buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}

/// A mesh resident on the GPU: its vertices plus fill and wireframe indices.
pub struct GpuMesh {
    layout: VertexLayout,
    topology: Topology,
    vertices: VertexBuffer,
    fill: IndexBuffer,
    wireframe: IndexBuffer,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        Self {
            layout: mesh.layout,
            topology: mesh.topology,
            vertices: VertexBuffer::new(device, &format!("{label}-vertices"), &mesh.vertices),
            fill: IndexBuffer::new(device, &format!("{label}-indices"), &mesh.indices),
            wireframe: IndexBuffer::new(
                device,
                &format!("{label}-wireframe"),
                &mesh.wireframe_indices(),
            ),
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Draws the triangles with whatever pipeline is bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_indices(pass, &self.fill);
    }

    /// Draws the line-list outline; expects a line pipeline to be bound.
    pub fn draw_wireframe(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draw_indices(pass, &self.wireframe);
    }

    fn draw_indices(&self, pass: &mut wgpu::RenderPass<'_>, indices: &IndexBuffer) {
        // empty buffers cannot be sliced
        if indices.is_empty() {
            return;
        }
        self.vertices.bind(pass, 0);
        indices.bind(pass);
        pass.draw_indexed(0..indices.len(), 0, 0..1);
    }
}

pub struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
