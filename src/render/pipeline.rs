use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;

use log::debug;

use crate::gpu::{vertex_buffer_layout, DepthBuffer};
use crate::mesh::{Topology, VertexLayout};
use crate::scene::Material;
use crate::shader::{BuiltinShader, ShaderError, ShaderProgram, ShaderStage};

/// Primitive assembly of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    TriangleList,
    /// Indexed strips with `u32::MAX` restarts.
    TriangleStrip,
    LineList,
}

impl Primitive {
    pub fn state(self) -> wgpu::PrimitiveState {
        let (topology, strip_index_format) = match self {
            Self::TriangleList => (wgpu::PrimitiveTopology::TriangleList, None),
            Self::TriangleStrip => (
                wgpu::PrimitiveTopology::TriangleStrip,
                Some(wgpu::IndexFormat::Uint32),
            ),
            Self::LineList => (wgpu::PrimitiveTopology::LineList, None),
        };
        wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        }
    }

    /// Fills are pushed back slightly so outlines drawn over them win the
    /// depth test.
    fn depth_stencil(self) -> wgpu::DepthStencilState {
        let (depth_compare, bias) = match self {
            Self::LineList => (
                wgpu::CompareFunction::LessEqual,
                wgpu::DepthBiasState::default(),
            ),
            Self::TriangleList | Self::TriangleStrip => (
                wgpu::CompareFunction::Less,
                wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            ),
        };
        wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare,
            stencil: Default::default(),
            bias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: BuiltinShader,
    pub primitive: Primitive,
    pub layout: VertexLayout,
}

impl PipelineKey {
    pub fn for_draw(material: &Material, layout: VertexLayout, topology: Topology) -> Self {
        let primitive = match (material, topology) {
            (Material::Wireframe { .. }, _) => Primitive::LineList,
            (_, Topology::TriangleList) => Primitive::TriangleList,
            (_, Topology::TriangleStrip) => Primitive::TriangleStrip,
        };
        Self {
            shader: material.shader(),
            primitive,
            layout,
        }
    }

    fn label(&self) -> String {
        format!(
            "{}-{:?}-{:?}",
            self.shader.file_name(),
            self.primitive,
            self.layout
        )
    }
}

/// Bind group layouts shared by every pipeline.
pub struct BindLayouts {
    pub global: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
}

/// Compiles shader files on first use and keeps one pipeline per key.
pub struct PipelineCache {
    shader_dir: Option<PathBuf>,
    color_format: wgpu::TextureFormat,
    flat_layout: wgpu::PipelineLayout,
    textured_layout: wgpu::PipelineLayout,
    programs: HashMap<BuiltinShader, ShaderProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        color_format: wgpu::TextureFormat,
        shader_dir: Option<PathBuf>,
    ) -> Self {
        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flat-pipeline-layout"),
            bind_group_layouts: &[&layouts.global, &layouts.object],
            push_constant_ranges: &[],
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("textured-pipeline-layout"),
            bind_group_layouts: &[&layouts.global, &layouts.object, &layouts.texture],
            push_constant_ranges: &[],
        });
        Self {
            shader_dir,
            color_format,
            flat_layout,
            textured_layout,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Builds the pipeline for `key` unless it already exists.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) -> Result<(), ShaderError> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let shader_dir = self.shader_dir.as_deref();
        let program = get_or_try_insert(&mut self.programs, key.shader, || {
            let source = key.shader.load(shader_dir)?;
            ShaderProgram::compile(device, key.shader.file_name(), &source)
        })?;

        let label = key.label();
        debug!("creating pipeline {label}");
        let layout = if key.shader.is_textured() {
            &self.textured_layout
        } else {
            &self.flat_layout
        };
        let buffers = [vertex_buffer_layout(key.layout)];
        let color_format = self.color_format;
        let pipeline = program.link(device, |vertex, fragment| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some(ShaderStage::Vertex.entry_point()),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                primitive: key.primitive.state(),
                depth_stencil: Some(key.primitive.depth_stencil()),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some(ShaderStage::Fragment.entry_point()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
        })?;
        self.pipelines.insert(key, pipeline);
        Ok(())
    }
}

/// Returns the cached value for `key`, creating it first if absent. A failed
/// `create` leaves the map untouched.
fn get_or_try_insert<K, V, E>(
    map: &mut HashMap<K, V>,
    key: K,
    create: impl FnOnce() -> Result<V, E>,
) -> Result<&mut V, E>
where
    K: Eq + Hash,
{
    match map.entry(key) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => Ok(entry.insert(create()?)),
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::TextureKind;

    #[test]
    fn programs_are_created_once_and_failures_not_cached() {
        let mut programs: HashMap<BuiltinShader, u32> = HashMap::new();

        let failed: Result<&mut u32, &str> =
            get_or_try_insert(&mut programs, BuiltinShader::Sun, || Err("bad source"));
        assert_eq!(failed, Err("bad source"));
        assert!(programs.is_empty());

        let created = get_or_try_insert(&mut programs, BuiltinShader::Sun, || Ok::<_, &str>(1));
        assert_eq!(created.copied(), Ok(1));
        let cached = get_or_try_insert(&mut programs, BuiltinShader::Sun, || -> Result<u32, &str> {
            panic!("cached program was rebuilt")
        });
        assert_eq!(cached.copied(), Ok(1));
        assert_eq!(programs.len(), 1);
    }

    #[test]
    fn wireframes_always_use_lines() {
        let wire = Material::Wireframe { color: Vec3::ZERO };
        let key = PipelineKey::for_draw(&wire, VertexLayout::Position, Topology::TriangleStrip);
        assert_eq!(key.primitive, Primitive::LineList);
        assert_eq!(key.shader, BuiltinShader::Flat);
    }

    #[test]
    fn strips_restart_on_u32_max() {
        let earth = Material::Earth {
            texture: TextureKind::Earth,
        };
        let key = PipelineKey::for_draw(
            &earth,
            VertexLayout::PositionNormalUv,
            Topology::TriangleStrip,
        );
        assert_eq!(key.primitive, Primitive::TriangleStrip);
        assert_eq!(
            key.primitive.state().strip_index_format,
            Some(wgpu::IndexFormat::Uint32)
        );
        assert_eq!(Primitive::TriangleList.state().strip_index_format, None);
    }

    #[test]
    fn outlines_pass_depth_ties() {
        assert_eq!(
            Primitive::LineList.depth_stencil().depth_compare,
            wgpu::CompareFunction::LessEqual
        );
        assert!(Primitive::TriangleList.depth_stencil().bias.constant > 0);
    }
}
