//! GPU-based picking using a dedicated picking render pass.
//!
//! Renders interval pick colors to an offscreen buffer, then reads back the
//! pixel at the cursor. The result matches exactly what is on screen
//! because both passes share the vertex placement.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::DrillscopeError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::pipeline_util::{
    create_attachment, depth_stencil_state, interval_vertex_layouts,
    primitive_state, DEPTH_FORMAT,
};
use crate::renderer::{IntervalMesh, SceneBindings};

/// Color format of the picking target.
pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// `copy_texture_to_buffer` row alignment.
const ROW_BYTES: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

const MAP_PENDING: u8 = 0;
const MAP_READY: u8 = 1;
const MAP_FAILED: u8 = 2;

/// Offscreen picking target, pipeline and single-pixel readback.
pub struct Picking {
    texture: wgpu::Texture,
    texture_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging_buffer: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
    width: u32,
    height: u32,
    /// A pixel was copied this frame and can be read back.
    pixel_copied: bool,
    readback_in_flight: bool,
    map_state: Arc<AtomicU8>,
}

impl Picking {
    /// Create the picking pipeline and a `width` x `height` target.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if the shader fails to compose.
    pub fn new(
        context: &RenderContext,
        bindings: &SceneBindings,
        shader_composer: &mut ShaderComposer,
        (width, height): (u32, u32),
    ) -> Result<Self, DrillscopeError> {
        let device = &context.device;
        let shader = shader_composer.compose(device, Shader::IntervalPicking)?;
        let layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Picking Pipeline Layout"),
                bind_group_layouts: &bindings.layouts(),
                push_constant_ranges: &[],
            });
        let buffers = interval_vertex_layouts();
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Picking Pipeline"),
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
                        format: PICK_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: primitive_state(),
                depth_stencil: Some(depth_stencil_state(true)),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let (texture, texture_view) = create_attachment(
            device,
            "Picking Texture",
            PICK_FORMAT,
            (width, height),
            wgpu::TextureUsages::COPY_SRC,
        );
        let (_, depth_view) = create_attachment(
            device,
            "Picking Depth Texture",
            DEPTH_FORMAT,
            (width, height),
            wgpu::TextureUsages::empty(),
        );
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picking Staging Buffer"),
            size: u64::from(ROW_BYTES),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            texture,
            texture_view,
            depth_view,
            staging_buffer,
            pipeline,
            width: width.max(1),
            height: height.max(1),
            pixel_copied: false,
            readback_in_flight: false,
            map_state: Arc::new(AtomicU8::new(MAP_PENDING)),
        })
    }

    /// Resize the picking and depth targets.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if width == self.width && height == self.height {
            return;
        }
        let (texture, texture_view) = create_attachment(
            device,
            "Picking Texture",
            PICK_FORMAT,
            (width, height),
            wgpu::TextureUsages::COPY_SRC,
        );
        let (_, depth_view) = create_attachment(
            device,
            "Picking Depth Texture",
            DEPTH_FORMAT,
            (width, height),
            wgpu::TextureUsages::empty(),
        );
        self.texture = texture;
        self.texture_view = texture_view;
        self.depth_view = depth_view;
        self.width = width;
        self.height = height;
    }

    /// Target dimensions.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render the picking pass and copy the pixel under `cursor`.
    ///
    /// Nothing is copied while a previous readback is still in flight or
    /// the cursor lies outside the target.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &SceneBindings,
        mesh: &IntervalMesh,
        cursor: (u32, u32),
    ) {
        {
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Picking Render Pass"),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view: &self.texture_view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(
                                    wgpu::Color::TRANSPARENT,
                                ),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        },
                    )],
                    depth_stencil_attachment: Some(
                        wgpu::RenderPassDepthStencilAttachment {
                            view: &self.depth_view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        },
                    ),
                    ..Default::default()
                });
            pass.set_pipeline(&self.pipeline);
            bindings.bind(&mut pass);
            mesh.draw(&mut pass);
        }
        self.copy_pixel_to_staging(encoder, cursor);
    }

    fn copy_pixel_to_staging(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        (x, y): (u32, u32),
    ) {
        if x >= self.width || y >= self.height || self.readback_in_flight {
            return;
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(ROW_BYTES),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.pixel_copied = true;
    }

    /// Start async readback. Call after the frame's encoder was submitted.
    pub fn start_readback(&mut self) {
        if self.readback_in_flight || !self.pixel_copied {
            return;
        }
        self.readback_in_flight = true;
        self.pixel_copied = false;
        self.map_state.store(MAP_PENDING, Ordering::SeqCst);
        let map_state = Arc::clone(&self.map_state);
        self.staging_buffer
            .slice(..4)
            .map_async(wgpu::MapMode::Read, move |result| {
                let state = if result.is_ok() { MAP_READY } else { MAP_FAILED };
                map_state.store(state, Ordering::SeqCst);
            });
    }

    /// Try to complete the readback without blocking.
    ///
    /// Returns the RGBA texel under the cursor, or `None` while pending.
    pub fn complete_readback(
        &mut self,
        device: &wgpu::Device,
    ) -> Option<[u8; 4]> {
        self.finish_readback(device, wgpu::PollType::Poll)
    }

    /// Block until the in-flight readback resolves.
    pub fn wait_readback(&mut self, device: &wgpu::Device) -> Option<[u8; 4]> {
        self.finish_readback(device, wgpu::PollType::Wait)
    }

    fn finish_readback(
        &mut self,
        device: &wgpu::Device,
        poll: wgpu::PollType,
    ) -> Option<[u8; 4]> {
        if !self.readback_in_flight {
            return None;
        }
        if let Err(e) = device.poll(poll) {
            log::warn!("picking readback poll failed: {e}");
        }
        match self.map_state.load(Ordering::SeqCst) {
            MAP_READY => {}
            MAP_FAILED => {
                log::warn!("picking staging buffer failed to map");
                self.readback_in_flight = false;
                return None;
            }
            _ => return None,
        }

        let slice = self.staging_buffer.slice(..4);
        let data = slice.get_mapped_range();
        let texel = [data[0], data[1], data[2], data[3]];
        drop(data);
        self.staging_buffer.unmap();
        self.readback_in_flight = false;
        Some(texel)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::geometry::{build_unit_cylinder, SegmentTransform};
    use crate::instance::{
        decode_pick_color, InstanceAttributeBuffer, InstanceRecord,
    };
    use crate::options::DisplayOptions;
    use crate::renderer::CameraUniform;

    fn pick_at(
        context: &RenderContext,
        picking: &mut Picking,
        bindings: &SceneBindings,
        mesh: &IntervalMesh,
        cursor: (u32, u32),
    ) -> Option<[u8; 4]> {
        let mut encoder = context.create_encoder();
        picking.render(&mut encoder, bindings, mesh, cursor);
        context.submit(encoder);
        picking.start_readback();
        picking.wait_readback(&context.device)
    }

    #[test]
    fn center_pick_follows_camera_and_target_size() {
        let Ok(context) = pollster::block_on(RenderContext::headless()) else {
            log::warn!("no GPU adapter, skipping picking readback");
            return;
        };
        let template = build_unit_cylinder(16);
        let mut buffer = InstanceAttributeBuffer::new(1);
        let transform = SegmentTransform::solve(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 5.0),
            2.0,
        )
        .unwrap();
        buffer
            .write(0, &InstanceRecord::from_transform(&transform, 7))
            .unwrap();
        let mesh = IntervalMesh::assemble(&context, &template, &buffer).unwrap();
        let bindings = SceneBindings::new(
            &context.device,
            &CameraUniform::framing(Vec3::ZERO, 6.0, 1.0),
            &DisplayOptions::default().uniforms(),
        );
        let mut composer = ShaderComposer::new().unwrap();
        let mut picking =
            Picking::new(&context, &bindings, &mut composer, (64, 64)).unwrap();

        let hit = pick_at(&context, &mut picking, &bindings, &mesh, (32, 32));
        assert_eq!(hit.and_then(decode_pick_color), Some(7));

        bindings.camera.write(
            &context.queue,
            &CameraUniform::framing(Vec3::new(100.0, 0.0, 0.0), 1.0, 1.0),
        );
        picking.resize(&context.device, 32, 32);
        assert_eq!(picking.size(), (32, 32));
        let miss = pick_at(&context, &mut picking, &bindings, &mesh, (16, 16));
        assert_eq!(miss.map(decode_pick_color), Some(None));

        // Outside the resized target nothing is copied or read back.
        let outside =
            pick_at(&context, &mut picking, &bindings, &mesh, (40, 40));
        assert!(outside.is_none());
    }
}
