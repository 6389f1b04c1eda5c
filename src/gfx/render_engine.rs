use std::{iter, sync::Arc};

use log::{debug, info, warn};
use wgpu::{BindGroup, BindGroupLayout, RenderPipeline, TextureFormat};

use super::texture_resource::TextureResource;
use crate::{
    error::{LifeError, LifeResult},
    grid::GridBuffer,
    wgpu_utils::{self, UniformBuffer},
};

/// Colours used by `display.wgsl`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DisplayParams {
    pub alive_color: [f32; 4],
    pub dead_color: [f32; 4],
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            alive_color: [1.0, 1.0, 1.0, 1.0],
            dead_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Owns the surface and draws the current generation full screen
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,

    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    grid_texture: TextureResource,
    params: UniformBuffer<DisplayParams>,
}

impl RenderEngine {
    /// Creates a render engine for the given window
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width`, `height` - Initial surface size in pixels
    /// * `grid_size` - Initial grid resolution in cells
    ///
    /// # Errors
    /// [`LifeError::Initialization`] when no adapter or device is available or
    /// the display pipeline fails validation
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        grid_size: (u32, u32),
    ) -> LifeResult<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| LifeError::Initialization(format!("failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LifeError::Initialization(format!("no suitable GPU adapter: {e}")))?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096, // Allow higher resolutions on native
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| LifeError::Initialization(format!("failed to request device: {e}")))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| LifeError::Initialization("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("display.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Display Bind Group Layout"),
            entries: &[
                wgpu_utils::entry(0, wgpu::ShaderStages::FRAGMENT, wgpu_utils::texture_2d()),
                wgpu_utils::entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    wgpu_utils::sampler(wgpu::SamplerBindingType::Filtering),
                ),
                wgpu_utils::entry(2, wgpu::ShaderStages::FRAGMENT, wgpu_utils::uniform()),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Display Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Display Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(error) = device.pop_error_scope().await {
            return Err(LifeError::Initialization(format!(
                "display pipeline failed to build: {error}"
            )));
        }

        let mut params = UniformBuffer::new(&device);
        params.update_content(&queue, DisplayParams::default());

        let grid_texture =
            TextureResource::create_grid_texture(&device, grid_size.0, grid_size.1, "Grid Texture");
        let bind_group = create_bind_group(&device, &bind_group_layout, &grid_texture, &params);

        Ok(RenderEngine {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            format,
            pipeline,
            bind_group_layout,
            bind_group,
            grid_texture,
            params,
        })
    }

    /// Upload the current generation, reallocating the texture on size change
    pub fn upload_grid(&mut self, grid: &GridBuffer) {
        let size = (grid.width(), grid.height());
        if self.grid_texture.size() != size {
            debug!("Recreating grid texture at {}x{}", size.0, size.1);
            self.grid_texture =
                TextureResource::create_grid_texture(&self.device, size.0, size.1, "Grid Texture");
            self.bind_group = create_bind_group(
                &self.device,
                &self.bind_group_layout,
                &self.grid_texture,
                &self.params,
            );
        }
        self.grid_texture.upload(&self.queue, grid);
    }

    pub fn set_colors(&mut self, params: DisplayParams) {
        self.params.update_content(&self.queue, params);
    }

    /// Draw the grid and let `ui_callback` record an overlay pass on top.
    ///
    /// Returns `Ok(false)` when the frame was skipped because the surface was
    /// outdated or busy; the surface is reconfigured for the next frame.
    pub fn render_frame_with_ui<F>(&mut self, ui_callback: F) -> LifeResult<bool>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        self.render_frame(Some(ui_callback))
    }

    pub fn render_frame<F>(&mut self, ui_callback: Option<F>) -> LifeResult<bool>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Surface texture timed out, skipping frame");
                return Ok(false);
            }
            Err(e) => {
                return Err(LifeError::Step(format!("failed to acquire surface texture: {e}")));
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Grid Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(iter::once(encoder.finish()));
        surface_texture.present();
        Ok(true)
    }

    /// Reconfigure the surface; zero sizes (minimized windows) are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Shared device handle for compute work on the same adapter
    pub fn device_handle(&self) -> Arc<wgpu::Device> {
        self.device.clone()
    }

    pub fn queue_handle(&self) -> Arc<wgpu::Queue> {
        self.queue.clone()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &BindGroupLayout,
    texture: &TextureResource,
    params: &UniformBuffer<DisplayParams>,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Display Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.binding_resource(),
            },
        ],
    })
}
