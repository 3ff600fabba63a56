//! wgpu backend: owns picture textures and replays a [`DrawList`].

use std::collections::HashMap;
use std::num::NonZeroU64;

use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::render::draw::{DrawCommand, DrawList, Mat4, Quad};
use crate::render::texture::{TextureId, TextureStore};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    mvp: Mat4,
    quad: [f32; 4],
    color: [f32; 4],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;
const INITIAL_UNIFORM_SLOTS: u64 = 64;

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    picture_pipeline: wgpu::RenderPipeline,
    solid_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_stride: u64,
    uniform_slots: u64,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    textures: HashMap<TextureId, GpuTexture>,
    next_id: u32,
    staging: Vec<u8>,
}

impl GpuRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("picture-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/picture.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw-uniforms-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("picture-texture-layout"),
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

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("picture-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let picture_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("picture-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let solid_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("solid-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, layout: &wgpu::PipelineLayout, vs: &str, fs: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let picture_pipeline =
            make_pipeline("picture-pipeline", &picture_layout, "vs_picture", "fs_picture");
        let solid_pipeline = make_pipeline("solid-pipeline", &solid_layout, "vs_solid", "fs_solid");

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = UNIFORM_SIZE.div_ceil(alignment) * alignment;
        let (uniform_buffer, uniform_bind_group) =
            create_uniforms(device, &uniform_layout, uniform_stride, INITIAL_UNIFORM_SLOTS);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            picture_pipeline,
            solid_pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            uniform_stride,
            uniform_slots: INITIAL_UNIFORM_SLOTS,
            uniform_buffer,
            uniform_bind_group,
            textures: HashMap::new(),
            next_id: 0,
            staging: Vec::new(),
        }
    }

    fn ensure_uniform_slots(&mut self, needed: u64) {
        if needed <= self.uniform_slots {
            return;
        }
        let slots = needed.next_power_of_two();
        debug!(slots, "growing draw uniform buffer");
        let (buffer, bind_group) =
            create_uniforms(&self.device, &self.uniform_layout, self.uniform_stride, slots);
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.uniform_slots = slots;
    }

    /// Clear `target` to transparent black and replay `list` into it.
    pub fn render(
        &mut self,
        list: &DrawList,
        target: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let commands = list.commands();
        self.ensure_uniform_slots(commands.len().max(1) as u64);

        let stride = self.uniform_stride as usize;
        self.staging.clear();
        self.staging.resize(commands.len() * stride, 0);
        for (slot, command) in commands.iter().enumerate() {
            let uniforms = match command {
                DrawCommand::Picture {
                    quad, mvp, alpha, ..
                } => DrawUniforms {
                    mvp: *mvp,
                    quad: quad_vec(quad),
                    color: [1.0, 1.0, 1.0, *alpha],
                },
                DrawCommand::Solid { mvp, color } => DrawUniforms {
                    mvp: *mvp,
                    quad: quad_vec(&Quad::FULL),
                    color: *color,
                },
            };
            let start = slot * stride;
            self.staging[start..start + UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        if !self.staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.staging);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("picture-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (slot, command) in commands.iter().enumerate() {
            let offset = (slot as u64 * self.uniform_stride) as u32;
            match command {
                DrawCommand::Picture { texture, .. } => {
                    let Some(gpu_texture) = self.textures.get(texture) else {
                        trace!(?texture, "skipping draw of released texture");
                        continue;
                    };
                    pass.set_pipeline(&self.picture_pipeline);
                    pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                    pass.set_bind_group(1, &gpu_texture.bind_group, &[]);
                }
                DrawCommand::Solid { .. } => {
                    pass.set_pipeline(&self.solid_pipeline);
                    pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                }
            }
            pass.draw(0..6, 0..1);
        }
    }
}

impl TextureStore for GpuRenderer {
    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn upload(&mut self, image: &RgbaImage) -> Result<TextureId, Error> {
        let (width, height) = image.dimensions();
        let max = self.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(Error::TextureUpload {
                width,
                height,
                reason: format!("size outside 1..={max}"),
            });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("picture-tile"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::TextureUpload {
                width,
                height,
                reason: err.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("picture-tile-bind-group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.next_id = self.next_id.wrapping_add(1);
        let id = TextureId(self.next_id);
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                bind_group,
            },
        );
        trace!(?id, width, height, "uploaded texture");
        Ok(id)
    }

    fn release(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_none() {
            warn!(?id, "release of unknown texture");
        }
    }

    fn trim(&mut self) {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            debug!(error = %err, "device poll after release failed");
        }
    }
}

fn quad_vec(quad: &Quad) -> [f32; 4] {
    [quad.left, quad.top, quad.right, quad.bottom]
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("draw-uniforms"),
        size: stride * slots,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw-uniforms-bind-group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(UNIFORM_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}
