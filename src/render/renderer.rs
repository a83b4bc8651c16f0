use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::Vec3;
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::pipeline::{BindLayouts, PipelineCache, PipelineKey};
use super::uniforms::{GlobalUniform, ObjectConstants};
use crate::camera::CameraParams;
use crate::config::DemoSettings;
use crate::gpu::{DepthBuffer, GpuMesh};
use crate::scene::{DrawItem, LightParams, Material, MeshKind, Scene, TextureKind};
use crate::texture::Texture;

/// GPU renderer backed by wgpu that draws a scene's draw list.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    pipelines: PipelineCache,
    meshes: HashMap<MeshKind, GpuMesh>,
    textures: HashMap<TextureKind, TextureBinding>,
    clear_color: wgpu::Color,
    skipped: HashSet<PipelineKey>,
}

struct TextureBinding {
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

impl Renderer {
    /// Sets up the device for `window` and uploads everything `scene` draws.
    pub async fn new(
        window: Arc<Window>,
        settings: &DemoSettings,
        scene: &dyn Scene,
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
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("renderer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .context("failed to create GPU device")?;
        device.on_uncaptured_error(Arc::new(|err| error!("uncaptured GPU error: {err}")));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let layouts = create_bind_layouts(&device);

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &layouts.global,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let meshes: HashMap<MeshKind, GpuMesh> = scene
            .meshes()
            .into_iter()
            .map(|(kind, mesh)| {
                info!(
                    "uploading {} ({} vertices, {} indices)",
                    kind.name(),
                    mesh.vertex_count(),
                    mesh.indices.len()
                );
                (kind, GpuMesh::upload(&device, kind.name(), &mesh))
            })
            .collect();

        let textures = scene
            .textures()
            .into_iter()
            .map(|kind| {
                let path = settings.texture_dir.join(kind.file_name());
                let texture =
                    Texture::load_or_solid(&device, &queue, &path, kind.fallback_color());
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(kind.file_name()),
                    layout: &layouts.texture,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(texture.view()),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(texture.sampler()),
                        },
                    ],
                });
                (
                    kind,
                    TextureBinding {
                        _texture: texture,
                        bind_group,
                    },
                )
            })
            .collect();

        // Every pipeline the scene can ask for is built up front, so shader
        // errors surface before the first frame.
        let mut pipelines =
            PipelineCache::new(&device, &layouts, surface_format, settings.shader_dir.clone());
        for item in scene.draw_list() {
            let Some(mesh) = meshes.get(&item.mesh) else {
                continue;
            };
            let key = PipelineKey::for_draw(&item.material, mesh.layout(), mesh.topology());
            pipelines
                .prepare(&device, key)
                .with_context(|| format!("failed to build pipeline for {}", item.mesh.name()))?;
        }
        info!("prepared {} pipeline(s)", pipelines.len());

        let clear = scene.clear_color();
        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            global_buffer,
            global_bind_group,
            object_layout: layouts.object,
            pipelines,
            meshes,
            textures,
            clear_color: to_wgpu_color(clear),
            skipped: HashSet::new(),
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        if self.size.height == 0 {
            1.0
        } else {
            self.size.width as f32 / self.size.height as f32
        }
    }

    /// Resizes the swap chain to match the new dimensions.
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

    /// Updates the camera and lighting uniforms before rendering.
    pub fn update_globals(&self, camera: &CameraParams, light: &LightParams) {
        let uniform = GlobalUniform::new(camera, light);
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&uniform));
    }

    /// Draws `items` in order into the next swap chain image.
    pub fn render(&mut self, items: &[DrawItem]) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        let mut draws = Vec::with_capacity(items.len());
        for item in items {
            let Some(mesh) = self.meshes.get(&item.mesh) else {
                continue;
            };
            let key = PipelineKey::for_draw(&item.material, mesh.layout(), mesh.topology());
            if self.pipelines.get(&key).is_none() {
                if self.skipped.insert(key) {
                    warn!("no pipeline for {key:?}; skipping {}", item.mesh.name());
                }
                continue;
            }

            let constants = ObjectConstants::for_item(item);
            let object_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("object-uniform"),
                    contents: bytes_of(&constants),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            let object_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("object-bind-group"),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                }],
            });
            draws.push((item, key, object_bind_group));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.global_bind_group, &[]);

        for (item, key, bind_group) in &draws {
            let (Some(mesh), Some(pipeline)) =
                (self.meshes.get(&item.mesh), self.pipelines.get(key))
            else {
                continue;
            };
            if let Some(kind) = item.material.texture() {
                let Some(texture) = self.textures.get(&kind) else {
                    continue;
                };
                pass.set_bind_group(2, &texture.bind_group, &[]);
            }
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, bind_group, &[]);
            match item.material {
                Material::Wireframe { .. } => mesh.draw_wireframe(&mut pass),
                _ => mesh.draw(&mut pass),
            }
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_bind_layouts(device: &wgpu::Device) -> BindLayouts {
    let uniform_entry = |size: usize| wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(size as u64),
        },
        count: None,
    };
    let global = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("global-bind-layout"),
        entries: &[uniform_entry(std::mem::size_of::<GlobalUniform>())],
    });
    let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("object-bind-layout"),
        entries: &[uniform_entry(std::mem::size_of::<ObjectConstants>())],
    });
    let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture-bind-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });
    BindLayouts {
        global,
        object,
        texture,
    }
}

fn to_wgpu_color(color: Vec3) -> wgpu::Color {
    wgpu::Color {
        r: color.x as f64,
        g: color.y as f64,
        b: color.z as f64,
        a: 1.0,
    }
}
