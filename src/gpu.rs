//! wgpu implementation of [`ShadingBackend`].
//!
//! Draw calls are collected while a pass is open and recorded into a single
//! command buffer when it ends. Ending a shadow pass submits that buffer before
//! anything samples the map; ending the main pass submits and presents.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::{DrawCall, PassDescriptor, PassKind, RenderTarget, ShadingBackend};
use crate::config::RendererConfig;
use crate::entity::{EntityId, EntityKind, ImageRgba8, ShadingMode};
use crate::error::{RenderError, RenderResult};
use crate::geometry::Vertex;
use crate::shaders;

const SHADOW_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAIN_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Shader program family a draw runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Depth,
    Surface,
    FogVolume,
    FogLayer,
}

/// Picks the program for an entity, refusing modes that don't match the pass.
pub fn select_program(pass: PassKind, kind: EntityKind, mode: ShadingMode) -> RenderResult<Program> {
    match (pass, mode) {
        (PassKind::Shadow, ShadingMode::Shadow) => Ok(Program::Depth),
        (PassKind::Main, ShadingMode::Lit(_)) => Ok(match kind {
            EntityKind::Surface | EntityKind::Raw => Program::Surface,
            EntityKind::FogVolume => Program::FogVolume,
            EntityKind::FogLayer => Program::FogLayer,
        }),
        (pass, mode) => Err(RenderError::backend(format!(
            "{kind:?} entity in {mode:?} mode submitted to the {pass:?} pass"
        ))),
    }
}

struct ShadowTargetViews {
    target: RenderTarget,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

struct Pipelines {
    depth: wgpu::RenderPipeline,
    surface: wgpu::RenderPipeline,
    fog_volume: wgpu::RenderPipeline,
    fog_layer: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, program: Program) -> &wgpu::RenderPipeline {
        match program {
            Program::Depth => &self.depth,
            Program::Surface => &self.surface,
            Program::FogVolume => &self.fog_volume,
            Program::FogLayer => &self.fog_layer,
        }
    }
}

struct MeshResources {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    textures: Option<wgpu::BindGroup>,
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    size: usize,
    bind_group: wgpu::BindGroup,
}

struct PendingDraw {
    entity: EntityId,
    program: Program,
}

struct PendingPass {
    kind: PassKind,
    frame: u64,
    clear: wgpu::Color,
    output: Option<wgpu::SurfaceTexture>,
    draws: Vec<PendingDraw>,
}

pub struct GpuBackend {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    shadow: ShadowTargetViews,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    image_sampler: wgpu::Sampler,
    white_view: wgpu::TextureView,
    pipelines: Pipelines,
    meshes: HashMap<EntityId, MeshResources>,
    uniforms: HashMap<(EntityId, PassKind), UniformSlot>,
    pending: Option<PendingPass>,
    shadow_frame: Option<u64>,
}

impl GpuBackend {
    pub async fn new(window: Arc<Window>, renderer: &RendererConfig) -> RenderResult<Self> {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                let size = winit::dpi::PhysicalSize::new(renderer.width, renderer.height);
                let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                    backends: wgpu::Backends::BROWSER_WEBGPU,
                    ..Default::default()
                });
                let limits = wgpu::Limits::downlevel_webgl2_defaults();
            } else {
                let size = window.inner_size();
                let instance = wgpu::Instance::default();
                let limits = wgpu::Limits::default();
            }
        }

        let surface = instance
            .create_surface(window.clone())
            .map_err(RenderError::initialization)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .map_err(RenderError::initialization)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("wfog device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(RenderError::initialization)?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = *caps
            .formats
            .first()
            .ok_or_else(|| RenderError::initialization("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![surface_format.add_srgb_suffix()],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let info = adapter.get_info();
        info!(
            "GPU backend ready: {} ({:?}), {}x{} surface, {}px shadow map",
            info.name, info.backend, config.width, config.height, renderer.shadow_map_size
        );

        let depth_view = create_depth_view(&device, config.width, config.height);
        let shadow = create_shadow_target(&device, RenderTarget::shadow_map(renderer.shadow_map_size));

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Entity Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Texture Layout"),
            entries: &[
                // Rgba32Float is not filterable, so the map is read with textureLoad
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let image_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Image Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = upload_image(&device, &queue, 1, 1, &[255, 255, 255, 255], "White Texture");
        let white_view = white.create_view(&wgpu::TextureViewDescriptor::default());

        let pipelines = create_pipelines(
            &device,
            surface_format.add_srgb_suffix(),
            &uniform_layout,
            &texture_layout,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth_view,
            shadow,
            uniform_layout,
            texture_layout,
            image_sampler,
            white_view,
            pipelines,
            meshes: HashMap::new(),
            uniforms: HashMap::new(),
            pending: None,
            shadow_frame: None,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Re-applies the surface configuration after the surface was lost or went stale.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn ensure_mesh(&mut self, call: &DrawCall<'_>) {
        let vertices = call.geometry.vertices();
        let stale = self
            .meshes
            .get(&call.entity)
            .is_none_or(|mesh| mesh.vertex_count != vertices.len() as u32);
        if !stale {
            return;
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Entity Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.meshes.insert(
            call.entity,
            MeshResources {
                vertex_buffer,
                vertex_count: vertices.len() as u32,
                textures: None,
            },
        );
    }

    fn ensure_textures(&mut self, entity: EntityId, image: Option<&ImageRgba8>) {
        let needs_textures = self
            .meshes
            .get(&entity)
            .is_some_and(|mesh| mesh.textures.is_none());
        if !needs_textures {
            return;
        }

        let image_view = image.map(|img| {
            upload_image(
                &self.device,
                &self.queue,
                img.width(),
                img.height(),
                img.pixels(),
                "Entity Image Texture",
            )
            .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.shadow.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        image_view.as_ref().unwrap_or(&self.white_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.image_sampler),
                },
            ],
        });

        if let Some(mesh) = self.meshes.get_mut(&entity) {
            mesh.textures = Some(bind_group);
        }
    }

    fn write_uniforms(&mut self, entity: EntityId, pass: PassKind, bytes: &[u8]) {
        let fits = self
            .uniforms
            .get(&(entity, pass))
            .is_some_and(|slot| slot.size == bytes.len());

        if !fits {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Entity Uniform Buffer"),
                size: bytes.len() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Entity Uniform Bind Group"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.uniforms.insert(
                (entity, pass),
                UniformSlot {
                    buffer,
                    size: bytes.len(),
                    bind_group,
                },
            );
        }

        if let Some(slot) = self.uniforms.get(&(entity, pass)) {
            self.queue.write_buffer(&slot.buffer, 0, bytes);
        }
    }
}

impl ShadingBackend for GpuBackend {
    fn shadow_target(&self) -> RenderTarget {
        self.shadow.target
    }

    fn begin_pass(&mut self, pass: &PassDescriptor) -> RenderResult<()> {
        // A failed draw leaves its pass open; nothing of it gets submitted
        if let Some(abandoned) = self.pending.take() {
            warn!(
                "Dropping unfinished {:?} pass of frame {}",
                abandoned.kind, abandoned.frame
            );
        }

        let output = match pass.kind {
            PassKind::Shadow => None,
            PassKind::Main => Some(self.surface.get_current_texture()?),
        };

        let [r, g, b, a] = pass.clear;
        self.pending = Some(PendingPass {
            kind: pass.kind,
            frame: pass.frame,
            clear: wgpu::Color { r, g, b, a },
            output,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_>) -> RenderResult<()> {
        let pass = self
            .pending
            .as_ref()
            .map(|p| p.kind)
            .ok_or_else(|| RenderError::backend("draw outside of a pass"))?;

        let program = select_program(pass, call.kind, call.mode)?;
        if let Some(input) = call.mode.shadow_input() {
            if self.shadow_frame != Some(input.shadow_map.frame) {
                return Err(RenderError::backend(format!(
                    "{:?} samples the shadow map of frame {}, latest is {:?}",
                    call.entity, input.shadow_map.frame, self.shadow_frame
                )));
            }
        }

        self.ensure_mesh(&call);
        if program == Program::Surface {
            self.ensure_textures(call.entity, call.image);
        }
        self.write_uniforms(call.entity, pass, call.uniforms.as_bytes());

        if let Some(pending) = self.pending.as_mut() {
            pending.draws.push(PendingDraw {
                entity: call.entity,
                program,
            });
        }
        Ok(())
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| RenderError::backend("end_pass without an open pass"))?;

        let surface_view = pending.output.as_ref().map(|output| {
            output.texture.create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.config.format.add_srgb_suffix()),
                ..Default::default()
            })
        });

        let (color_view, depth_view) = match pending.kind {
            PassKind::Shadow => (&self.shadow.color_view, &self.shadow.depth_view),
            PassKind::Main => (
                surface_view
                    .as_ref()
                    .ok_or_else(|| RenderError::backend("main pass has no surface texture"))?,
                &self.depth_view,
            ),
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(match pending.kind {
                PassKind::Shadow => "Shadow Pass Encoder",
                PassKind::Main => "Main Pass Encoder",
            }),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(match pending.kind {
                    PassKind::Shadow => "Shadow Pass",
                    PassKind::Main => "Main Pass",
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pending.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &pending.draws {
                let (Some(mesh), Some(uniforms)) = (
                    self.meshes.get(&draw.entity),
                    self.uniforms.get(&(draw.entity, pending.kind)),
                ) else {
                    continue;
                };

                render_pass.set_pipeline(self.pipelines.get(draw.program));
                render_pass.set_bind_group(0, &uniforms.bind_group, &[]);
                if draw.program == Program::Surface {
                    let Some(textures) = mesh.textures.as_ref() else {
                        continue;
                    };
                    render_pass.set_bind_group(1, textures, &[]);
                }
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.draw(0..mesh.vertex_count, 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);

        match pending.kind {
            PassKind::Shadow => self.shadow_frame = Some(pending.frame),
            PassKind::Main => {
                if let Some(output) = pending.output {
                    self.window.pre_present_notify();
                    output.present();
                }
            }
        }

        debug!(
            "Submitted {:?} pass for frame {} ({} draws)",
            pending.kind,
            pending.frame,
            pending.draws.len()
        );
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MAIN_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_shadow_target(device: &wgpu::Device, target: RenderTarget) -> ShadowTargetViews {
    let size = wgpu::Extent3d {
        width: target.width,
        height: target.height,
        depth_or_array_layers: 1,
    };

    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Shadow Map"),
        size,
        mip_level_count: target.mip_levels,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SHADOW_COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Shadow Depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SHADOW_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    ShadowTargetViews {
        target,
        color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
        depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
    }
}

fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
    label: &str,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

struct PipelineDesc<'a> {
    label: &'a str,
    source: String,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    color: wgpu::ColorTargetState,
    depth_format: wgpu::TextureFormat,
    depth_write: bool,
    cull_mode: Option<wgpu::Face>,
}

fn create_pipeline(device: &wgpu::Device, desc: PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(desc.color)],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: desc.depth_format,
            depth_write_enabled: desc.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn create_pipelines(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    uniform_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
) -> Pipelines {
    let target = |blend| wgpu::ColorTargetState {
        format: color_format,
        blend: Some(blend),
        write_mask: wgpu::ColorWrites::ALL,
    };

    let depth = create_pipeline(
        device,
        PipelineDesc {
            label: "Depth Pipeline",
            source: shaders::generate_depth_shader(),
            layouts: &[uniform_layout],
            // Float32 targets can't blend
            color: wgpu::ColorTargetState {
                format: SHADOW_COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            },
            depth_format: SHADOW_DEPTH_FORMAT,
            depth_write: true,
            cull_mode: None,
        },
    );

    let surface = create_pipeline(
        device,
        PipelineDesc {
            label: "Surface Pipeline",
            source: shaders::generate_surface_shader(),
            layouts: &[uniform_layout, texture_layout],
            color: target(wgpu::BlendState::REPLACE),
            depth_format: MAIN_DEPTH_FORMAT,
            depth_write: true,
            cull_mode: None,
        },
    );

    // Back faces only: the march starts on the far side of the box
    let fog_volume = create_pipeline(
        device,
        PipelineDesc {
            label: "Fog Volume Pipeline",
            source: shaders::generate_fog_volume_shader(),
            layouts: &[uniform_layout],
            color: target(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            depth_format: MAIN_DEPTH_FORMAT,
            depth_write: false,
            cull_mode: Some(wgpu::Face::Front),
        },
    );

    let fog_layer = create_pipeline(
        device,
        PipelineDesc {
            label: "Fog Layer Pipeline",
            source: shaders::generate_fog_layer_shader(),
            layouts: &[uniform_layout],
            color: target(wgpu::BlendState::ALPHA_BLENDING),
            depth_format: MAIN_DEPTH_FORMAT,
            depth_write: false,
            cull_mode: None,
        },
    );

    Pipelines {
        depth,
        surface,
        fog_volume,
        fog_layer,
    }
}
