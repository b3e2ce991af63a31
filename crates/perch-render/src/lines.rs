//! Wireframe debug overlay, compiled into debug builds only. Same batching
//! discipline as the sprite renderer at a smaller scale: accumulate, upload
//! into a fixed-capacity dynamic buffer, one line-list draw, clear.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

pub const MAX_LINES: usize = 1024;
pub const MAX_LINE_VERTICES: usize = MAX_LINES * 2;

const CIRCLE_SEGMENTS: usize = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Per-frame accumulator of line-segment vertices. Owned by the application
/// loop and handed to [`GraphicsContext::draw_lines`] once per surface.
///
/// [`GraphicsContext::draw_lines`]: crate::GraphicsContext::draw_lines
#[derive(Debug, Default)]
pub struct LineBatch {
    vertices: Vec<LineVertex>,
}

impl LineBatch {
    pub fn line(&mut self, a: Vec2, b: Vec2, color: Vec4) {
        self.vertices.push(LineVertex {
            position: [a.x, a.y, 0.0],
            color: color.to_array(),
        });
        self.vertices.push(LineVertex {
            position: [b.x, b.y, 0.0],
            color: color.to_array(),
        });
    }

    /// Axis-aligned box outline, four lines.
    pub fn rect(&mut self, min: Vec2, max: Vec2, color: Vec4) {
        self.line(Vec2::new(min.x, min.y), Vec2::new(min.x, max.y), color);
        self.line(Vec2::new(min.x, min.y), Vec2::new(max.x, min.y), color);
        self.line(Vec2::new(max.x, min.y), Vec2::new(max.x, max.y), color);
        self.line(Vec2::new(min.x, max.y), Vec2::new(max.x, max.y), color);
    }

    /// Sixteen-segment polygonal approximation.
    pub fn circle(&mut self, center: Vec2, radius: f32, color: Vec4) {
        for i in 0..CIRCLE_SEGMENTS {
            let alpha = i as f32 * std::f32::consts::TAU / CIRCLE_SEGMENTS as f32;
            let beta = (i + 1) as f32 * std::f32::consts::TAU / CIRCLE_SEGMENTS as f32;
            self.line(
                center + Vec2::new(alpha.sin(), alpha.cos()) * radius,
                center + Vec2::new(beta.sin(), beta.cos()) * radius,
                color,
            );
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Vertices that fit the cap; the excess is dropped with a warning.
    fn clipped(&self) -> &[LineVertex] {
        if self.vertices.len() > MAX_LINE_VERTICES {
            log::warn!(
                "debug overlay: {} line vertices exceed the cap of {}, truncating",
                self.vertices.len(),
                MAX_LINE_VERTICES
            );
        }
        &self.vertices[..self.vertices.len().min(MAX_LINE_VERTICES)]
    }
}

/// GPU half of the overlay: dynamic vertex buffer plus line-list pipeline,
/// sharing the sprite renderer's camera bind group.
pub(crate) struct LineRenderer {
    pipeline: wgpu::RenderPipeline,
    buffer: wgpu::Buffer,
}

impl LineRenderer {
    pub(crate) fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        camera_bgl: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line-shader"),
            source: wgpu::ShaderSource::Wgsl(perch_shaders::LINE_WGSL.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line-pipeline-layout"),
            bind_group_layouts: &[camera_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("line-vertices"),
            size: (MAX_LINE_VERTICES * std::mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { pipeline, buffer }
    }

    pub(crate) fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_bg: &wgpu::BindGroup,
        frame: &wgpu::TextureView,
        batch: &mut LineBatch,
    ) {
        let count = batch.clipped().len();
        if count == 0 {
            batch.clear();
            return;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&batch.vertices[..count]));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("line-encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("line-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, camera_bg, &[]);
            pass.set_vertex_buffer(0, self.buffer.slice(..));
            pass.draw(0..count as u32, 0..1);
        }
        queue.submit(Some(encoder.finish()));
        batch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_emit_expected_vertex_counts() {
        let mut batch = LineBatch::default();
        batch.line(Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        assert_eq!(batch.len(), 2);
        batch.rect(Vec2::splat(-0.5), Vec2::splat(0.5), Vec4::ONE);
        assert_eq!(batch.len(), 2 + 8);
        batch.circle(Vec2::ZERO, 0.1, Vec4::ONE);
        assert_eq!(batch.len(), 2 + 8 + CIRCLE_SEGMENTS * 2);
    }

    #[test]
    fn overflow_is_truncated_not_fatal() {
        let mut batch = LineBatch::default();
        for _ in 0..(MAX_LINES + 10) {
            batch.line(Vec2::ZERO, Vec2::ONE, Vec4::ONE);
        }
        assert_eq!(batch.len(), MAX_LINE_VERTICES + 20);
        assert_eq!(batch.clipped().len(), MAX_LINE_VERTICES);
    }

    #[test]
    fn clear_resets_the_accumulator() {
        let mut batch = LineBatch::default();
        batch.circle(Vec2::ZERO, 1.0, Vec4::ONE);
        batch.clear();
        assert!(batch.is_empty());
    }
}
