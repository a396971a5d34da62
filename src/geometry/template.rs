//! Unit cylinder shared by every interval instance.
//!
//! Radius 1, height 1, centered at the origin, long axis along
//! [`TEMPLATE_AXIS`](super::TEMPLATE_AXIS) (+Y). Instances never copy it;
//! the GPU reads it once per vertex and the per-instance attributes place
//! each copy.

use std::f32::consts::TAU;
use std::sync::Arc;

/// Vertex of the shared template mesh.
/// Must match the WGSL `TemplateVertex` input layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TemplateVertex {
    /// Position in template space.
    pub position: [f32; 3],
    /// Outward unit normal in template space.
    pub normal: [f32; 3],
}

/// Width of the index buffer elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    /// 16-bit indices (up to 65536 addressable vertices).
    Narrow,
    /// 32-bit indices.
    Wide,
}

impl IndexWidth {
    /// Narrowest width able to address `vertex_count` vertices.
    #[must_use]
    pub fn for_vertex_count(vertex_count: u64) -> Self {
        if vertex_count > u64::from(u16::MAX) + 1 {
            Self::Wide
        } else {
            Self::Narrow
        }
    }

    /// Matching wgpu index format.
    #[must_use]
    pub fn format(self) -> wgpu::IndexFormat {
        match self {
            Self::Narrow => wgpu::IndexFormat::Uint16,
            Self::Wide => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Template mesh: flat vertex and index buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Interleaved position/normal vertices.
    pub vertices: Vec<TemplateVertex>,
    /// Triangle list indices, counter-clockwise when viewed from outside.
    pub indices: Vec<u32>,
    radial_segments: u32,
}

impl Template {
    /// Number of template vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of template indices.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Radial segment count the template was built with.
    #[must_use]
    pub fn radial_segments(&self) -> u32 {
        self.radial_segments
    }

    /// Flat position buffer (x, y, z per vertex).
    #[must_use]
    pub fn positions(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.position).collect()
    }

    /// Flat normal buffer (x, y, z per vertex).
    #[must_use]
    pub fn normals(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.normal).collect()
    }

    /// Index width needed when the scene draws `instance_count` copies.
    ///
    /// Sized by the aggregate vertex count, not the template alone.
    #[must_use]
    pub fn index_width_for(&self, instance_count: usize) -> IndexWidth {
        let aggregate =
            self.vertices.len() as u64 * (instance_count.max(1) as u64);
        IndexWidth::for_vertex_count(aggregate)
    }

    /// Indices narrowed to 16 bits, or `None` if any index does not fit.
    #[must_use]
    pub fn indices_u16(&self) -> Option<Vec<u16>> {
        self.indices
            .iter()
            .map(|&i| u16::try_from(i).ok())
            .collect()
    }
}

/// Build the unit cylinder with `radial_segments` facets (minimum 3).
///
/// Deterministic: the same segment count always yields identical buffers.
#[must_use]
pub fn build_unit_cylinder(radial_segments: u32) -> Arc<Template> {
    let n = radial_segments.max(3);
    let mut vertices = Vec::with_capacity(4 * n as usize + 2);
    let mut indices = Vec::with_capacity(12 * n as usize);

    let ring: Vec<(f32, f32)> = (0..n)
        .map(|i| {
            let theta = i as f32 / n as f32 * TAU;
            (theta.cos(), theta.sin())
        })
        .collect();

    // Side: top/bottom pairs with radial normals.
    for &(c, s) in &ring {
        vertices.push(TemplateVertex {
            position: [c, 0.5, s],
            normal: [c, 0.0, s],
        });
        vertices.push(TemplateVertex {
            position: [c, -0.5, s],
            normal: [c, 0.0, s],
        });
    }
    for i in 0..n {
        let j = (i + 1) % n;
        let (top_i, bottom_i) = (2 * i, 2 * i + 1);
        let (top_j, bottom_j) = (2 * j, 2 * j + 1);
        indices.extend_from_slice(&[top_i, top_j, bottom_i]);
        indices.extend_from_slice(&[bottom_i, top_j, bottom_j]);
    }

    push_cap(&mut vertices, &mut indices, &ring, 0.5);
    push_cap(&mut vertices, &mut indices, &ring, -0.5);

    Arc::new(Template {
        vertices,
        indices,
        radial_segments: n,
    })
}

/// Flat cap at height `y`; winding faces away from the origin.
fn push_cap(
    vertices: &mut Vec<TemplateVertex>,
    indices: &mut Vec<u32>,
    ring: &[(f32, f32)],
    y: f32,
) {
    let normal = [0.0, y.signum(), 0.0];
    let center = vertices.len() as u32;
    vertices.push(TemplateVertex {
        position: [0.0, y, 0.0],
        normal,
    });
    for &(c, s) in ring {
        vertices.push(TemplateVertex {
            position: [c, y, s],
            normal,
        });
    }
    let n = ring.len() as u32;
    for i in 0..n {
        let a = center + 1 + i;
        let b = center + 1 + (i + 1) % n;
        if y > 0.0 {
            indices.extend_from_slice(&[center, b, a]);
        } else {
            indices.extend_from_slice(&[center, a, b]);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn counts_follow_segment_count() {
        let t = build_unit_cylinder(6);
        assert_eq!(t.vertex_count(), 4 * 6 + 2);
        assert_eq!(t.index_count(), 12 * 6);
        assert_eq!(t.positions().len(), t.vertex_count() * 3);
        assert_eq!(t.normals().len(), t.vertex_count() * 3);
        assert!(t.indices.iter().all(|&i| (i as usize) < t.vertex_count()));
    }

    #[test]
    fn minimum_segments_enforced() {
        assert_eq!(build_unit_cylinder(0).radial_segments(), 3);
    }

    #[test]
    fn deterministic() {
        assert_eq!(*build_unit_cylinder(12), *build_unit_cylinder(12));
    }

    #[test]
    fn unit_radius_and_height() {
        let t = build_unit_cylinder(8);
        for v in &t.vertices {
            let p = Vec3::from(v.position);
            assert!(p.y.abs() <= 0.5 + 1e-6);
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!(r <= 1.0 + 1e-5);
            let n = Vec3::from(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    /// Every triangle's geometric normal must agree with its vertex normals.
    #[test]
    fn triangles_wind_outward() {
        let t = build_unit_cylinder(10);
        for tri in t.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| t.vertices[i as usize]);
            let pa = Vec3::from(a.position);
            let face =
                (Vec3::from(b.position) - pa).cross(Vec3::from(c.position) - pa);
            let shading = Vec3::from(a.normal)
                + Vec3::from(b.normal)
                + Vec3::from(c.normal);
            assert!(
                face.dot(shading) > 0.0,
                "triangle {tri:?} winds inward"
            );
        }
    }

    #[test]
    fn index_width_tracks_aggregate_vertices() {
        let t = build_unit_cylinder(16);
        assert_eq!(t.index_width_for(1), IndexWidth::Narrow);
        assert_eq!(t.index_width_for(100_000), IndexWidth::Wide);
        assert_eq!(IndexWidth::for_vertex_count(65_536), IndexWidth::Narrow);
        assert_eq!(IndexWidth::for_vertex_count(65_537), IndexWidth::Wide);
        assert_eq!(t.indices_u16().map(|v| v.len()), Some(t.index_count()));
    }
}
