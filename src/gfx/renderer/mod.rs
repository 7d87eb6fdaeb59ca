//! WGPU executor for the immediate-mode command stream
//!
//! [`WgpuRenderer`] implements [`RenderBackend`] by resolving transform
//! state on the CPU as commands arrive (matrix stack, color, texture and
//! light state), batching each `draw_triangles` with a snapshot of that
//! state, and executing the whole frame in one render pass at `flush`.
//!
//! Overlay text is not rasterized here: resolved screen positions are
//! queued and drained by the windowing layer, which draws them through the
//! UI renderer on top of the presented frame.

mod vertex;

use cgmath::{Deg, InnerSpace, Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use super::backend::{
    ContextSettings, Light, RenderBackend, TextureEnvMode, TextureFilter, TexturePixels,
    TextureSampling, TextureWrap, Vertex,
};
use crate::error::InitializationError;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-batch shader uniform. Must match `FrameUniform` in `scene.wgsl`
/// exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    mvp: [[f32; 4]; 4],
    modelview: [[f32; 4]; 4],
    color: [f32; 4],
    mode: [f32; 4],
    light_position: [[f32; 4]; 2],
    light_ambient: [[f32; 4]; 2],
    light_diffuse: [[f32; 4]; 2],
    spot: [f32; 4],
}

/// A line of overlay text with resolved top-left-origin screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLine {
    pub x: f32,
    pub y: f32,
    pub color: [f32; 3],
    pub text: String,
}

/// An uploaded texture, alive for the frame that bound it.
struct TextureUnit {
    bind_group: wgpu::BindGroup,
}

/// One `draw_triangles` call with its resolved state snapshot.
struct DrawBatch {
    first_vertex: u32,
    vertex_count: u32,
    uniform: FrameUniform,
    texture: Option<usize>,
    viewport: [i32; 4],
}

/// Executes the command stream against a window surface.
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    white_texture: TextureUnit,

    // Command-stream state, persistent across frames.
    settings: ContextSettings,
    projection: Matrix4<f32>,
    current: Matrix4<f32>,
    stack: Vec<Matrix4<f32>>,
    color: [f32; 3],
    env_mode: TextureEnvMode,
    sphere_mapping: bool,
    lights: [Option<Light>; 2],
    viewport: [i32; 4],

    // Per-frame recording, reset on clear/flush.
    vertices: Vec<Vertex>,
    batches: Vec<DrawBatch>,
    frame_textures: Vec<TextureUnit>,
    current_texture: Option<usize>,
    overlay: Vec<OverlayLine>,
    pending: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl WgpuRenderer {
    /// Creates the renderer for the given window surface.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<WgpuRenderer, InitializationError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|err| InitializationError::Surface(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| InitializationError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| InitializationError::Device(err.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
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
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
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

        let white_texture = create_texture_unit(
            &device,
            &queue,
            &texture_layout,
            TexturePixels {
                width: 1,
                height: 1,
                rgba: &[255, 255, 255, 255],
            },
            TextureSampling {
                filter: TextureFilter::Linear,
                wrap: TextureWrap::Clamp,
            },
        );

        let viewport = [0, 0, config.width as i32, config.height as i32];

        Ok(WgpuRenderer {
            surface,
            device,
            queue,
            config,
            depth_view,
            pipeline,
            uniform_layout,
            texture_layout,
            white_texture,
            settings: ContextSettings {
                depth_test: true,
                cull_back_faces: true,
                two_sided_color_material: true,
                flat_shading: true,
                clear_color: [0.0, 0.0, 0.0, 1.0],
            },
            projection: Matrix4::identity(),
            current: Matrix4::identity(),
            stack: Vec::new(),
            color: [1.0, 1.0, 1.0],
            env_mode: TextureEnvMode::Modulate,
            sphere_mapping: false,
            lights: [None, None],
            viewport,
            vertices: Vec::new(),
            batches: Vec::new(),
            frame_textures: Vec::new(),
            current_texture: None,
            overlay: Vec::new(),
            pending: None,
        })
    }

    /// Reconfigures the surface and depth buffer for a new window size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Drains the overlay text queued by the last frame.
    pub fn take_overlay_text(&mut self) -> Vec<OverlayLine> {
        std::mem::take(&mut self.overlay)
    }

    /// Renders the UI pass on top of the flushed frame and presents it.
    ///
    /// A no-op when the last flush dropped its frame (e.g. an outdated
    /// surface).
    pub fn present_with_ui<F>(&mut self, draw_ui: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let Some((surface_texture, view)) = self.pending.take() else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });
        draw_ui(&self.device, &self.queue, &mut encoder, &view);
        self.queue.submit(Some(encoder.finish()));
        surface_texture.present();
    }

    fn snapshot_uniform(&self) -> FrameUniform {
        let mut light_position = [[0.0f32; 4]; 2];
        let mut light_ambient = [[0.0f32; 4]; 2];
        let mut light_diffuse = [[0.0f32; 4]; 2];
        for (slot, light) in self.lights.iter().enumerate() {
            if let Some(light) = light {
                let p = light.position;
                light_position[slot] = [p[0], p[1], p[2], 1.0];
                let a = light.ambient;
                light_ambient[slot] = [a[0], a[1], a[2], 0.0];
                let d = light.diffuse;
                light_diffuse[slot] = [d[0], d[1], d[2], 0.0];
            }
        }

        let spot = match &self.lights[1] {
            Some(Light {
                spot: Some(spot), ..
            }) => {
                let d = spot.direction;
                [d[0], d[1], d[2], spot.cutoff_deg.to_radians().cos()]
            }
            _ => [0.0, 0.0, -1.0, -2.0],
        };

        FrameUniform {
            mvp: (self.projection * self.current).into(),
            modelview: self.current.into(),
            color: [self.color[0], self.color[1], self.color[2], 1.0],
            mode: [
                if self.current_texture.is_some() { 1.0 } else { 0.0 },
                if self.env_mode == TextureEnvMode::Add { 1.0 } else { 0.0 },
                if self.sphere_mapping { 1.0 } else { 0.0 },
                0.0,
            ],
            light_position,
            light_ambient,
            light_diffuse,
            spot,
        }
    }

    fn reset_frame(&mut self) {
        self.vertices.clear();
        self.batches.clear();
        self.frame_textures.clear();
        self.current_texture = None;
    }

    /// Clamps a recorded viewport to the surface. The overlay viewport
    /// convention can exceed the render target, which surface validation
    /// rejects.
    fn clamped_viewport(&self, viewport: [i32; 4]) -> Option<(f32, f32, f32, f32)> {
        let surface_w = self.config.width as i32;
        let surface_h = self.config.height as i32;
        let x = viewport[0].clamp(0, surface_w);
        let y = viewport[1].clamp(0, surface_h);
        let w = viewport[2].min(surface_w - x);
        let h = viewport[3].min(surface_h - y);
        if w <= 0 || h <= 0 {
            return None;
        }
        Some((x as f32, y as f32, w as f32, h as f32))
    }
}

impl RenderBackend for WgpuRenderer {
    fn clear(&mut self) {
        self.reset_frame();
        // Overlay lines survive the flush for the UI layer to drain; a new
        // frame discards whatever was left undrained.
        self.overlay.clear();
    }

    fn push_matrix(&mut self) {
        self.stack.push(self.current);
    }

    fn pop_matrix(&mut self) {
        self.current = self.stack.pop().expect("transform stack underflow");
    }

    fn load_identity(&mut self) {
        self.current = Matrix4::identity();
    }

    fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.current = self.current * Matrix4::from_translation(Vector3::new(x, y, z));
    }

    fn rotate(&mut self, angle_deg: f32, axis: [f32; 3]) {
        let axis = Vector3::new(axis[0], axis[1], axis[2]).normalize();
        self.current = self.current * Matrix4::from_axis_angle(axis, Deg(angle_deg));
    }

    fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.current = self.current * Matrix4::from_nonuniform_scale(x, y, z);
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = [x, y, width, height];
    }

    fn set_perspective(&mut self, fovy_deg: f32, aspect: f32, near: f32, far: f32) {
        self.projection = cgmath::perspective(Deg(fovy_deg), aspect, near, far);
    }

    fn configure(&mut self, settings: &ContextSettings) {
        self.settings = settings.clone();
    }

    fn set_light(&mut self, index: usize, light: &Light) {
        debug_assert!(index < 2, "only two light slots exist");
        if let Some(slot) = self.lights.get_mut(index) {
            *slot = Some(light.clone());
        }
    }

    fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = [r, g, b];
    }

    fn upload_texture(&mut self, pixels: TexturePixels<'_>, sampling: TextureSampling) {
        let unit = create_texture_unit(
            &self.device,
            &self.queue,
            &self.texture_layout,
            pixels,
            sampling,
        );
        self.frame_textures.push(unit);
        self.current_texture = Some(self.frame_textures.len() - 1);
    }

    fn set_texture_env(&mut self, mode: TextureEnvMode) {
        self.env_mode = mode;
    }

    fn set_sphere_mapping(&mut self, enabled: bool) {
        self.sphere_mapping = enabled;
    }

    fn draw_triangles(&mut self, vertices: &[Vertex]) {
        if vertices.is_empty() {
            return;
        }
        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.batches.push(DrawBatch {
            first_vertex,
            vertex_count: vertices.len() as u32,
            uniform: self.snapshot_uniform(),
            texture: self.current_texture,
            viewport: self.viewport,
        });
    }

    fn draw_text(&mut self, x: f32, y: f32, color: [f32; 3], text: &str) {
        // Raster position is bottom-left within the current viewport;
        // resolve it to top-left-origin screen coordinates for the UI
        // layer.
        self.overlay.push(OverlayLine {
            x: self.viewport[0] as f32 + x,
            y: self.config.height as f32 - (self.viewport[1] as f32 + y),
            color,
            text: text.to_owned(),
        });
    }

    fn flush(&mut self) {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("dropping frame, surface unavailable: {err}");
                if matches!(
                    err,
                    wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated
                ) {
                    self.surface.configure(&self.device, &self.config);
                }
                self.reset_frame();
                return;
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        let vertex_buffer = (!self.vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Frame Vertices"),
                    contents: bytemuck::cast_slice(&self.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        // Per-batch uniform buffers are created fresh every frame, in the
        // same spirit as the per-frame texture uploads upstream.
        let uniform_groups: Vec<wgpu::BindGroup> = self
            .batches
            .iter()
            .map(|batch| {
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Batch Uniform"),
                        contents: bytemuck::bytes_of(&batch.uniform),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Batch Uniform Bind Group"),
                    layout: &self.uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        {
            let [r, g, b, a] = self.settings.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            if let Some(vertex_buffer) = &vertex_buffer {
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            }

            for (batch, uniform_group) in self.batches.iter().zip(&uniform_groups) {
                let Some((x, y, w, h)) = self.clamped_viewport(batch.viewport) else {
                    continue;
                };
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_bind_group(0, uniform_group, &[]);
                let texture_group = batch
                    .texture
                    .map(|index| &self.frame_textures[index].bind_group)
                    .unwrap_or(&self.white_texture.bind_group);
                pass.set_bind_group(1, texture_group, &[]);
                pass.draw(
                    batch.first_vertex..batch.first_vertex + batch.vertex_count,
                    0..1,
                );
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.pending = Some((surface_texture, view));
        self.reset_frame();
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
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

fn create_texture_unit(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    pixels: TexturePixels<'_>,
    sampling: TextureSampling,
) -> TextureUnit {
    let size = wgpu::Extent3d {
        width: pixels.width,
        height: pixels.height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Surface Texture"),
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
        pixels.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * pixels.width),
            rows_per_image: Some(pixels.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let filter = match sampling.filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    let address_mode = match sampling.wrap {
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
        TextureWrap::Clamp => wgpu::AddressMode::ClampToEdge,
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Surface Sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Surface Texture Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    TextureUnit { bind_group }
}
