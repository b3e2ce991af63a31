use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;
use winit::window::WindowId;

use crate::atlas::SpriteAtlas;
use crate::camera::{Camera, CameraUniform};
use crate::error::fatal;
use crate::mesh::{Mesh, Vertex};
use crate::sprite::SpriteDrawable;
use crate::surface::{
    OverlayHost, ScreenSurface, Surface, SurfaceRegistry, choose_overlay_format,
    make_overlay_config,
};

#[cfg(debug_assertions)]
use crate::lines::{LineBatch, LineRenderer};

/// Capacity of the shared instance buffer. Drawable lists beyond this are
/// split into consecutive batches, one draw call each.
pub const MAX_INSTANCES: usize = 256;

/// Per-instance vertex data: model matrix columns plus the sprite's atlas
/// scale/offset rectangle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct InstanceRaw {
    model: [[f32; 4]; 4],
    tex_st: [f32; 4],
}

impl InstanceRaw {
    pub(crate) const ATTRIBUTES: [wgpu::VertexAttribute; 5] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x4,
        },
        wgpu::VertexAttribute {
            offset: 16,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x4,
        },
        wgpu::VertexAttribute {
            offset: 32,
            shader_location: 4,
            format: wgpu::VertexFormat::Float32x4,
        },
        wgpu::VertexAttribute {
            offset: 48,
            shader_location: 5,
            format: wgpu::VertexFormat::Float32x4,
        },
        wgpu::VertexAttribute {
            offset: 64,
            shader_location: 6,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&SpriteDrawable> for InstanceRaw {
    fn from(drawable: &SpriteDrawable) -> Self {
        Self {
            model: drawable.transform.to_cols_array_2d(),
            tex_st: drawable.sprite.scale_offset(),
        }
    }
}

/// Contiguous, order-preserving partition of `0..len` into chunks of at most
/// `capacity`: exactly `ceil(len / capacity)` spans, empty for `len == 0`.
pub(crate) fn batch_spans(len: usize, capacity: usize) -> Vec<Range<usize>> {
    assert!(capacity > 0);
    (0..len)
        .step_by(capacity)
        .map(|start| start..(start + capacity).min(len))
        .collect()
}

// Single-instance contract: the context is an explicit owned object, but two
// of them would fight over the compositor, so construction asserts.
static CONTEXT_LIVE: AtomicBool = AtomicBool::new(false);

/// Sole owner of GPU resources and sole issuer of draw calls. Confined to
/// the render thread; the shared camera and instance buffers are rewritten
/// in place every frame and must never see a second producer.
pub struct GraphicsContext {
    _instance: wgpu::Instance,
    _adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    sprite_pipeline: wgpu::RenderPipeline,
    atlas_layout: wgpu::BindGroupLayout,
    point_sampler: wgpu::Sampler,
    quad: Mesh,

    surfaces: Vec<ScreenSurface>,
    registry: SurfaceRegistry,

    #[cfg(debug_assertions)]
    line_renderer: LineRenderer,
}

impl GraphicsContext {
    /// Build the context and one screen surface per discovered monitor.
    /// Windows are handed over hidden and shown together at the end so all
    /// surfaces appear atomically. Any resource failure is fatal.
    pub fn new(hosts: Vec<OverlayHost>) -> Self {
        assert!(
            !CONTEXT_LIVE.swap(true, Ordering::SeqCst),
            "GraphicsContext constructed twice"
        );
        if hosts.is_empty() {
            fatal("window system", "no monitors discovered");
        }

        let instance = wgpu::Instance::default();
        let raw_surfaces: Vec<wgpu::Surface<'static>> = hosts
            .iter()
            .map(|host| {
                instance
                    .create_surface(host.window)
                    .unwrap_or_else(|err| fatal("surface creation", err))
            })
            .collect();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&raw_surfaces[0]),
        }))
        .unwrap_or_else(|| fatal("adapter selection", "no suitable GPU adapter found"));

        let info = adapter.get_info();
        log::info!("graphics adapter: {} ({:?})", info.name, info.backend);
        log::info!(
            "adapter ids: vendor {:#06x}, device {:#06x}, driver {}",
            info.vendor,
            info.device,
            info.driver
        );

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None))
                .unwrap_or_else(|err| fatal("device creation", err));
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        // One format for every surface so a single pipeline serves them all.
        let format = choose_overlay_format(&adapter, &raw_surfaces[0]);

        let mut surfaces = Vec::with_capacity(hosts.len());
        let mut registry = SurfaceRegistry::default();
        for (slot, (host, raw)) in hosts.iter().zip(raw_surfaces).enumerate() {
            let config = make_overlay_config(
                &adapter,
                &raw,
                format,
                host.window.inner_size(),
                host.primary,
            );
            let surface = Surface::new(host.window, raw, config, device.clone());
            registry.insert(surface.id(), slot);
            let screen = ScreenSurface::new(surface, host.position, host.primary);
            log::debug!(
                "screen surface {}x{} at {},{}{}",
                screen.width(),
                screen.height(),
                screen.position().x,
                screen.position().y,
                if screen.is_primary() { " [primary]" } else { "" }
            );
            surfaces.push(screen);
        }

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera-uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite-instances"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceRaw>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<CameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera-bg"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("atlas-bgl"),
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

        // Point sampling keeps pixel-art sprite edges crisp.
        let point_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("point-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite-shader"),
            source: wgpu::ShaderSource::Wgsl(perch_shaders::SPRITE_WGSL.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite-pipeline-layout"),
            bind_group_layouts: &[&camera_bgl, &atlas_layout],
            push_constant_ranges: &[],
        });
        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout(), InstanceRaw::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let quad = Mesh::quad(&device);

        #[cfg(debug_assertions)]
        let line_renderer = LineRenderer::new(&device, format, &camera_bgl);

        let ctx = Self {
            _instance: instance,
            _adapter: adapter,
            device,
            queue,
            camera_buffer,
            camera_bind_group,
            instance_buffer,
            sprite_pipeline,
            atlas_layout,
            point_sampler,
            quad,
            surfaces,
            registry,
            #[cfg(debug_assertions)]
            line_renderer,
        };

        // Every chain is live; reveal all overlay windows in one go.
        for surface in &ctx.surfaces {
            surface.window().set_visible(true);
        }
        log::info!("created {} screen surface(s)", ctx.surfaces.len());
        ctx
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn atlas_layout(&self) -> &wgpu::BindGroupLayout {
        &self.atlas_layout
    }

    pub fn point_sampler(&self) -> &wgpu::Sampler {
        &self.point_sampler
    }

    pub fn surfaces(&self) -> &[ScreenSurface] {
        &self.surfaces
    }

    pub fn surface_count(&self) -> usize {
        self.registry.len()
    }

    pub fn surface_for_window(&self, window: WindowId) -> Option<&ScreenSurface> {
        self.registry.get(window).map(|slot| &self.surfaces[slot])
    }

    /// Route a resize notification to the owning surface. Called on the
    /// render thread only, between frames.
    pub fn handle_resize(&mut self, window: WindowId, size: PhysicalSize<u32>) {
        if let Some(slot) = self.registry.get(window) {
            self.surfaces[slot].resize_swapchain(size);
        }
    }

    /// Tear down the surface for a destroyed window, keeping the registry
    /// free of dangling entries.
    pub fn remove_surface(&mut self, window: WindowId) -> bool {
        let Some(slot) = self.registry.remove(window) else {
            return false;
        };
        self.surfaces.swap_remove(slot);
        if let Some(moved) = self.surfaces.get(slot) {
            self.registry.reslot(moved.id(), slot);
        }
        true
    }

    /// Upload the camera's view/projection pair into the shared uniform
    /// buffer. Queue ordering lands the write before any subsequent draw.
    pub fn prepare_camera_matrices(&self, camera: &Camera) {
        let uniform = CameraUniform::from(camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Clear the target to fully transparent, then draw `drawables` in input
    /// order as instanced quads, `MAX_INSTANCES` per batch. The renderer
    /// performs no depth sorting; back-to-front is the caller's ordering.
    pub fn draw_sprites(
        &self,
        camera: &Camera,
        frame: &wgpu::TextureView,
        atlas: &SpriteAtlas,
        drawables: &[SpriteDrawable],
    ) {
        self.prepare_camera_matrices(camera);
        let (width, height) = camera.target.dimensions();

        let spans = batch_spans(drawables.len(), MAX_INSTANCES);
        if spans.is_empty() {
            self.clear_only(frame);
            return;
        }

        for (batch, span) in spans.into_iter().enumerate() {
            let instances: Vec<InstanceRaw> =
                drawables[span].iter().map(InstanceRaw::from).collect();
            // Each batch fully overwrites the shared instance buffer.
            // Submitting per batch keeps every rewrite ordered before its
            // draw; a single submit would let the last write win for all.
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instances),
            );

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("sprite-encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("sprite-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: frame,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: if batch == 0 {
                                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
                            } else {
                                wgpu::LoadOp::Load
                            },
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
                pass.set_pipeline(&self.sprite_pipeline);
                pass.set_bind_group(0, &self.camera_bind_group, &[]);
                pass.set_bind_group(1, atlas.bind_group(), &[]);
                pass.set_vertex_buffer(0, self.quad.vertex_buffer().slice(..));
                pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                pass.set_index_buffer(self.quad.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.quad.index_count(), 0, 0..instances.len() as u32);
            }
            self.queue.submit(Some(encoder.finish()));
        }
    }

    // An empty drawable list still clears the surface.
    fn clear_only(&self, frame: &wgpu::TextureView) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear-encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame,
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
        self.queue.submit(Some(encoder.finish()));
    }

    /// Draw an accumulated line batch over the current frame contents, then
    /// clear the accumulator. Debug builds only.
    #[cfg(debug_assertions)]
    pub fn draw_lines(&self, camera: &Camera, frame: &wgpu::TextureView, batch: &mut LineBatch) {
        self.prepare_camera_matrices(camera);
        self.line_renderer.draw(
            &self.device,
            &self.queue,
            &self.camera_bind_group,
            frame,
            batch,
        );
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        // Surfaces, buffers and pipelines release through ownership; the
        // construction guard resets so tests can build a fresh context.
        self.surfaces.clear();
        CONTEXT_LIVE.store(false, Ordering::SeqCst);
        log::info!("graphics context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{PixelRect, Sprite};
    use glam::Mat4;

    #[test]
    fn spans_partition_exactly() {
        let spans = batch_spans(300, 256);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], 0..256);
        assert_eq!(spans[1], 256..300);
    }

    #[test]
    fn spans_are_empty_for_no_drawables() {
        assert!(batch_spans(0, 256).is_empty());
    }

    #[test]
    fn full_batch_is_a_single_span() {
        assert_eq!(batch_spans(256, 256), vec![0..256]);
        assert_eq!(batch_spans(257, 256), vec![0..256, 256..257]);
    }

    #[test]
    fn spans_cover_the_input_contiguously_in_order() {
        for n in [1usize, 7, 255, 256, 511, 1000] {
            let spans = batch_spans(n, 256);
            assert_eq!(spans.len(), n.div_ceil(256));
            let mut next = 0;
            for span in &spans {
                assert_eq!(span.start, next);
                assert!(span.len() <= 256);
                next = span.end;
            }
            assert_eq!(next, n);
        }
    }

    #[test]
    fn instance_layout_matches_shader_expectations() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 80);
        let drawable = SpriteDrawable {
            sprite: Sprite::from_pixel_rect(64, 64, PixelRect { x: 16, y: 0, w: 32, h: 32 }),
            transform: Mat4::IDENTITY,
        };
        let raw = InstanceRaw::from(&drawable);
        assert_eq!(raw.tex_st, [0.5, 0.5, 0.25, 0.0]);
        assert_eq!(raw.model, Mat4::IDENTITY.to_cols_array_2d());
    }
}
