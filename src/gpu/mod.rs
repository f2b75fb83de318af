//! wgpu backend: agent buffers, the two compute pipelines and the bird mesh.
//!
//! A frame is recorded into one command encoder and submitted once:
//!
//! 1. velocity pass, writing `velocity_next`
//! 2. copy `velocity_next` over `velocity`
//! 3. position pass
//! 4. render pass
//!
//! Passes in one encoder execute in order with full barriers between them,
//! which gives the ordering the scheduler asks for.

use std::sync::Arc;

use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::FlockConfig;
use crate::error::GpuError;
use crate::geometry::{BirdGeometry, BirdVertex};
use crate::scheduler::FrameBackend;
use crate::shader;
use crate::store::AgentStore;
use crate::uniforms::{SimUniforms, ViewUniforms};

mod compute;

pub use compute::{read_buffer, FlockCompute};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY | wgpu::Backends::GL,
        ..Default::default()
    })
}

/// An adapter that can run the compute passes and read storage buffers from
/// the vertex stage.
async fn compute_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Option<wgpu::Adapter> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await?;

    let name = adapter.get_info().name;
    let downlevel = adapter.get_downlevel_capabilities();
    if !downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        warn!("Adapter {} has no compute shaders", name);
        return None;
    }
    if !downlevel.flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
        warn!("Adapter {} cannot read storage buffers in vertex shaders", name);
        return None;
    }

    Some(adapter)
}

async fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue), wgpu::RequestDeviceError> {
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Flock Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
}

/// Look for an adapter that can run the compute passes, without a window.
///
/// `None` means the flock must stay idle.
pub fn probe() -> Option<wgpu::AdapterInfo> {
    let instance = create_instance();
    let adapter = pollster::block_on(compute_adapter(&instance, None))?;
    Some(adapter.get_info())
}

/// A device for driving [`FlockCompute`] without a window.
pub fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = create_instance();
    let adapter = pollster::block_on(compute_adapter(&instance, None))?;
    let info = adapter.get_info();
    debug!("Headless device on {} ({:?})", info.name, info.backend);
    pollster::block_on(request_device(&adapter)).ok()
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    compute: FlockCompute,
    render_pipeline: wgpu::RenderPipeline,
    view_uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    render_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::TextureView,
    clear_color: wgpu::Color,
    vertex_count: u32,
    /// Commands recorded so far for the current frame.
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        flock: &FlockConfig,
        store: &AgentStore,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = create_instance();
        let surface = instance.create_surface(window)?;
        let adapter = compute_adapter(&instance, Some(&surface))
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!("Using {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let compute = FlockCompute::new(&device, flock, store);

        // Mesh
        let geometry = BirdGeometry::new(compute.agent_count());
        let vertex_count = geometry.vertex_count();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bird Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let view_uniforms =
            ViewUniforms::new(flock, glam::Mat4::IDENTITY, crate::deform::model_matrix());
        let view_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Uniform Buffer"),
            contents: bytemuck::bytes_of(&view_uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Render: view uniforms plus read-only agent state
        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                storage_entry(1, true, wgpu::ShaderStages::VERTEX),
                storage_entry(2, true, wgpu::ShaderStages::VERTEX),
                storage_entry(3, true, wgpu::ShaderStages::VERTEX),
            ],
        });
        let render_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: view_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: compute.position_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: compute.velocity_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: compute.phase_buffer().as_entire_binding(),
                },
            ],
        });

        // Render pipeline
        let render_src = shader::render_shader();
        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bird Shader"),
            source: wgpu::ShaderSource::Wgsl(render_src.as_str().into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Bird Pipeline Layout"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Bird Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader,
                entry_point: Some("vs_main"),
                buffers: &[BirdVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Both faces: the wings flip over as they flap.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let clear_color = clear_color(flock.background, config.format.is_srgb());
        debug!(
            "GPU flock ready: {} birds, {} vertices, {:?}",
            compute.agent_count(),
            vertex_count,
            config.format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            compute,
            render_pipeline,
            view_uniform_buffer,
            vertex_buffer,
            render_bind_group,
            depth_texture,
            clear_color,
            vertex_count,
            encoder: None,
        })
    }

    /// Reconfigure the surface at its current size, after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = create_depth_texture(&self.device, &self.config);
    }

    /// The frame's encoder, started on first use.
    fn take_encoder(&mut self) -> wgpu::CommandEncoder {
        match self.encoder.take() {
            Some(encoder) => encoder,
            None => self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            }),
        }
    }
}

impl FrameBackend for GpuState {
    fn upload(&mut self, sim: &SimUniforms, view: &ViewUniforms) {
        self.compute.upload(&self.queue, sim);
        self.queue.write_buffer(&self.view_uniform_buffer, 0, bytemuck::bytes_of(view));
    }

    fn dispatch_velocity(&mut self) {
        let mut encoder = self.take_encoder();
        self.compute.record_velocity(&mut encoder);
        self.encoder = Some(encoder);
    }

    fn dispatch_position(&mut self) {
        let mut encoder = self.take_encoder();
        self.compute.record_position(&mut encoder);
        self.encoder = Some(encoder);
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                // The passes still ran; keep the flock moving even if this
                // frame is never shown.
                if let Some(encoder) = self.encoder.take() {
                    self.queue.submit(std::iter::once(encoder.finish()));
                }
                return Err(e);
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let clear_color = self.clear_color;
        let vertex_count = self.vertex_count;
        let mut encoder = self.take_encoder();

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bird Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.render_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }
}

pub(crate) fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn storage_entry(
    binding: u32,
    read_only: bool,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Clear colour for the surface. sRGB surfaces expect linear values.
fn clear_color(rgb: [f32; 3], srgb_surface: bool) -> wgpu::Color {
    let [r, g, b] = if srgb_surface {
        rgb.map(crate::config::srgb_to_linear)
    } else {
        rgb
    };
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
