//! Instanced rendering of assay intervals.
//!
//! One shared unit-cylinder template is drawn once per interval, with every
//! per-instance attribute channel stepping per instance. The visible pass
//! and the picking pass share the vertex placement and both uniform groups:
//!
//! | group | binding | contents            |
//! |-------|---------|---------------------|
//! | 0     | 0       | [`CameraUniform`]   |
//! | 1     | 0       | [`IntervalUniforms`]|

pub mod interval_mesh;
pub mod picking;
pub(crate) mod pipeline_util;

use glam::{Mat4, Vec3};
pub use interval_mesh::{IntervalMesh, IntervalRenderer};

pub use self::pipeline_util::UniformBinding;

/// Camera block consumed by both passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// Column-major view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Eye position in world space.
    pub position: [f32; 3],
    _pad: f32,
}

impl CameraUniform {
    /// Camera at `eye` with the given view-projection.
    #[must_use]
    pub fn new(view_proj: Mat4, eye: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            position: eye.to_array(),
            _pad: 0.0,
        }
    }

    /// Perspective camera framing a sphere of `radius` around `center`,
    /// looking down from above and to the side.
    #[must_use]
    pub fn framing(center: Vec3, radius: f32, aspect: f32) -> Self {
        let radius = radius.max(1e-3);
        let fov = 45f32.to_radians();
        let distance = radius / (fov * 0.5).sin();
        let eye = center + Vec3::new(1.0, 1.0, 1.0).normalize() * distance;
        let view = Mat4::look_at_rh(eye, center, Vec3::Z);
        let proj = Mat4::perspective_rh(
            fov,
            aspect.max(1e-3),
            (distance - radius).max(radius * 1e-3),
            distance + radius,
        );
        Self::new(proj * view, eye)
    }
}

/// Uniform block styling every interval instance.
///
/// Layout must match `IntervalUniforms` in
/// `assets/shaders/modules/interval_instance.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IntervalUniforms {
    /// Global width multiplier.
    pub uniform_scale: f32,
    /// Blend between constant (0) and log-mapped (1) width.
    pub log_widths: f32,
    /// Multiplier/divisor for the scale-up/scale-down flags.
    pub scale_attribute: f32,
    /// Alpha of instances flagged transparent.
    pub transparency: f32,
    /// RGBA color of hovered instances.
    pub hover_color: [f32; 4],
    /// RGBA color of all other instances.
    pub base_color: [f32; 4],
}

/// Uniform bind groups shared by the visible and picking passes.
pub struct SceneBindings {
    /// Group 0.
    pub camera: UniformBinding<CameraUniform>,
    /// Group 1.
    pub style: UniformBinding<IntervalUniforms>,
}

impl SceneBindings {
    /// Create both uniform buffers with initial contents.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        camera: &CameraUniform,
        style: &IntervalUniforms,
    ) -> Self {
        Self {
            camera: UniformBinding::new(device, "Camera", camera),
            style: UniformBinding::new(device, "Interval Style", style),
        }
    }

    /// Layouts in group order.
    #[must_use]
    pub fn layouts(&self) -> [&wgpu::BindGroupLayout; 2] {
        [&self.camera.layout, &self.style.layout]
    }

    /// Bind both groups on `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.style.bind_group, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_are_16_byte_aligned() {
        assert_eq!(size_of::<IntervalUniforms>(), 48);
        assert_eq!(size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn framing_camera_sees_center() {
        let center = Vec3::new(100.0, -50.0, 20.0);
        let camera = CameraUniform::framing(center, 30.0, 1.5);
        let view_proj = Mat4::from_cols_array_2d(&camera.view_proj);
        let clip = view_proj * center.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(clip.w > 0.0);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
