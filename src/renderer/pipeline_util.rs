use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// Format of every depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Depth32Float;

/// Standard depth-stencil state used by both interval pipelines.
pub fn depth_stencil_state(depth_write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: depth_write,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Primitive state for the outward-wound template.
pub fn primitive_state() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        ..Default::default()
    }
}

/// Render-attachment texture plus its default view.
pub fn create_attachment(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    extra_usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | extra_usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

const TEMPLATE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const OFFSET_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![2 => Float32x3];
const EXTENT_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![3 => Float32x2];
const ORIENTATION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![4 => Float32x4];
const PICK_ID_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![5 => Float32x4];
const BITS_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![6 => Float32];

/// Vertex buffer layouts in slot order: the template (per vertex) followed
/// by the five instance channels (per instance).
pub fn interval_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 6] {
    fn layout(
        stride: usize,
        step_mode: wgpu::VertexStepMode,
        attributes: &'static [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: stride as wgpu::BufferAddress,
            step_mode,
            attributes,
        }
    }
    use wgpu::VertexStepMode::{Instance, Vertex};
    [
        layout(size_of::<[f32; 6]>(), Vertex, &TEMPLATE_ATTRIBUTES),
        layout(size_of::<[f32; 3]>(), Instance, &OFFSET_ATTRIBUTES),
        layout(size_of::<[f32; 2]>(), Instance, &EXTENT_ATTRIBUTES),
        layout(size_of::<[f32; 4]>(), Instance, &ORIENTATION_ATTRIBUTES),
        layout(size_of::<[f32; 4]>(), Instance, &PICK_ID_ATTRIBUTES),
        layout(size_of::<f32>(), Instance, &BITS_ATTRIBUTES),
    ]
}

/// A uniform buffer with its own single-entry bind group.
pub struct UniformBinding<T> {
    /// Layout with one uniform entry at binding 0.
    pub layout: wgpu::BindGroupLayout,
    /// Bind group over `buffer`.
    pub bind_group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformBinding<T> {
    /// Create the buffer, layout and bind group.
    pub fn new(device: &wgpu::Device, label: &str, value: &T) -> Self {
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Uniform Buffer")),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Bind Group Layout")),
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
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Bind Group")),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            layout,
            bind_group,
            buffer,
            _marker: PhantomData,
        }
    }

    /// Upload a new value.
    pub fn write(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TemplateVertex;

    #[test]
    fn template_stride_matches_vertex() {
        let layouts = interval_vertex_layouts();
        assert_eq!(
            layouts[0].array_stride,
            size_of::<TemplateVertex>() as wgpu::BufferAddress
        );
    }

    #[test]
    fn locations_are_unique_and_contiguous() {
        let mut locations: Vec<u32> = interval_vertex_layouts()
            .iter()
            .flat_map(|l| l.attributes.iter().map(|a| a.shader_location))
            .collect();
        locations.sort_unstable();
        assert_eq!(locations, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn only_template_steps_per_vertex() {
        let layouts = interval_vertex_layouts();
        assert_eq!(layouts[0].step_mode, wgpu::VertexStepMode::Vertex);
        assert!(layouts[1..]
            .iter()
            .all(|l| l.step_mode == wgpu::VertexStepMode::Instance));
    }
}
