//! Instanced draw assembly for interval cylinders.
//!
//! [`IntervalMesh::assemble`] uploads the template once and each attribute
//! channel of an [`InstanceAttributeBuffer`] as its own per-instance vertex
//! buffer. [`IntervalRenderer`] owns the visible-pass pipeline that draws
//! it.

use wgpu::util::DeviceExt;

use super::pipeline_util::{
    create_attachment, depth_stencil_state, interval_vertex_layouts,
    primitive_state, DEPTH_FORMAT,
};
use super::SceneBindings;
use crate::error::DrillscopeError;
use crate::geometry::template::IndexWidth;
use crate::geometry::Template;
use crate::gpu::dynamic_buffer::TypedBuffer;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::instance::{DynamicBits, InstanceAttributeBuffer};

/// GPU-resident template plus per-instance channels, ready to draw.
pub struct IntervalMesh {
    template_vertices: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
    offsets: TypedBuffer<[f32; 3]>,
    extents: TypedBuffer<[f32; 2]>,
    orientations: TypedBuffer<[f32; 4]>,
    pick_ids: TypedBuffer<[f32; 4]>,
    dynamic_bits: TypedBuffer<f32>,
}

impl IntervalMesh {
    /// Combine the shared template with a completed attribute buffer.
    ///
    /// The index width is chosen from the aggregate vertex count
    /// (template vertices times instances).
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError::WideIndexUnsupported`] (wrapped in
    /// [`DrillscopeError::Gpu`]) if the scene needs 32-bit indices and the
    /// device cannot draw them.
    ///
    /// [`RenderContextError::WideIndexUnsupported`]: crate::gpu::render_context::RenderContextError::WideIndexUnsupported
    pub fn assemble(
        context: &RenderContext,
        template: &Template,
        buffer: &InstanceAttributeBuffer,
    ) -> Result<Self, DrillscopeError> {
        let device = &context.device;
        let aggregate = template.vertex_count() as u64
            * (buffer.capacity().max(1) as u64);
        let width = template.index_width_for(buffer.capacity());
        context.require_index_width(width, aggregate)?;

        let narrow = match width {
            IndexWidth::Narrow => template.indices_u16(),
            IndexWidth::Wide => None,
        };
        let (index_buffer, index_format) = if let Some(indices) = narrow {
            (
                create_index_buffer(device, bytemuck::cast_slice(&indices)),
                wgpu::IndexFormat::Uint16,
            )
        } else {
            (
                create_index_buffer(
                    device,
                    bytemuck::cast_slice(&template.indices),
                ),
                wgpu::IndexFormat::Uint32,
            )
        };

        let template_vertices =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Interval Template Vertices"),
                contents: bytemuck::cast_slice(&template.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let usage = wgpu::BufferUsages::VERTEX;
        let mesh = Self {
            template_vertices,
            index_buffer,
            index_format,
            index_count: template.index_count() as u32,
            offsets: TypedBuffer::new_with_data(
                device,
                "Interval Offsets",
                buffer.offsets(),
                usage,
            ),
            extents: TypedBuffer::new_with_data(
                device,
                "Interval Extents",
                buffer.extents(),
                usage,
            ),
            orientations: TypedBuffer::new_with_data(
                device,
                "Interval Orientations",
                buffer.orientations(),
                usage,
            ),
            pick_ids: TypedBuffer::new_with_data(
                device,
                "Interval Pick IDs",
                buffer.pick_ids(),
                usage,
            ),
            dynamic_bits: TypedBuffer::new_with_data(
                device,
                "Interval Dynamic Bits",
                buffer.dynamic_bits_channel(),
                usage,
            ),
        };
        log::info!(
            "assembled {} interval instances ({} template vertices, {:?} \
             indices)",
            mesh.instance_count(),
            template.vertex_count(),
            mesh.index_format
        );
        Ok(mesh)
    }

    /// Number of instances drawn.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.offsets.count() as u32
    }

    /// Index format chosen at assembly.
    #[must_use]
    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.index_format
    }

    /// Rewrite one instance's flags on the GPU.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] past the instance count.
    pub fn update_dynamic_bits(
        &self,
        queue: &wgpu::Queue,
        index: usize,
        bits: DynamicBits,
    ) -> Result<(), DrillscopeError> {
        self.dynamic_bits.write_at(queue, index, bits.raw())
    }

    /// Bind buffers and issue the instanced draw. Pipeline and bind groups
    /// must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.offsets.is_empty() {
            return;
        }
        pass.set_vertex_buffer(0, self.template_vertices.slice(..));
        pass.set_vertex_buffer(1, self.offsets.buffer().slice(..));
        pass.set_vertex_buffer(2, self.extents.buffer().slice(..));
        pass.set_vertex_buffer(3, self.orientations.buffer().slice(..));
        pass.set_vertex_buffer(4, self.pick_ids.buffer().slice(..));
        pass.set_vertex_buffer(5, self.dynamic_bits.buffer().slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
        pass.draw_indexed(0..self.index_count, 0, 0..self.instance_count());
    }
}

fn create_index_buffer(device: &wgpu::Device, contents: &[u8]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Interval Template Indices"),
        contents,
        usage: wgpu::BufferUsages::INDEX,
    })
}

/// Visible-pass pipeline for interval instances.
pub struct IntervalRenderer {
    pipeline: wgpu::RenderPipeline,
}

impl IntervalRenderer {
    /// Build the pipeline for the context's color format.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if the shader fails to compose.
    pub fn new(
        context: &RenderContext,
        bindings: &SceneBindings,
        shader_composer: &mut ShaderComposer,
    ) -> Result<Self, DrillscopeError> {
        let shader =
            shader_composer.compose(&context.device, Shader::IntervalMesh)?;
        let layout = context.device.create_pipeline_layout(
            &wgpu::PipelineLayoutDescriptor {
                label: Some("Interval Pipeline Layout"),
                bind_group_layouts: &bindings.layouts(),
                push_constant_ranges: &[],
            },
        );
        let buffers = interval_vertex_layouts();
        let pipeline = context.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Interval Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: context.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: primitive_state(),
                depth_stencil: Some(depth_stencil_state(true)),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            },
        );
        Ok(Self { pipeline })
    }

    /// Record the visible pass into `pass`.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        bindings: &SceneBindings,
        mesh: &IntervalMesh,
    ) {
        pass.set_pipeline(&self.pipeline);
        bindings.bind(pass);
        mesh.draw(pass);
    }

    /// Render one frame into a fresh offscreen target of `size`.
    ///
    /// Returns the color texture so callers can copy or inspect it.
    pub fn render_offscreen(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &SceneBindings,
        mesh: &IntervalMesh,
        size: (u32, u32),
    ) -> wgpu::Texture {
        let (color, color_view) = create_attachment(
            &context.device,
            "Interval Color Target",
            context.format,
            size,
            wgpu::TextureUsages::COPY_SRC,
        );
        let (_, depth_view) = create_attachment(
            &context.device,
            "Interval Depth Target",
            DEPTH_FORMAT,
            size,
            wgpu::TextureUsages::empty(),
        );
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Interval Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        });
        self.draw(&mut pass, bindings, mesh);
        drop(pass);
        color
    }
}
