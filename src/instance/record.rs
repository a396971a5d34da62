//! One instance's solved attributes and the hidden placeholder record.

use glam::Vec3;

use super::bitfield::{DynamicBits, RenderFlag};
use super::pick_id::{encode_pick_id, UNPICKABLE};
use crate::geometry::SegmentTransform;

/// Attributes of one interval instance, joined to its interval by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceRecord {
    /// Segment midpoint.
    pub offset: Vec3,
    /// Segment length.
    pub height: f32,
    /// Radial width from the width policy.
    pub width: f32,
    /// Orientation as uploaded (see
    /// [`SegmentTransform::packed_orientation`]).
    pub orientation: [f32; 4],
    /// Pick colour encoding the interval id.
    pub pick_id: [f32; 4],
    /// Float-encoded render-state flags.
    pub dynamic_bits: DynamicBits,
}

impl InstanceRecord {
    /// Record for a solved segment.
    ///
    /// Ids past 24 bits get an unpickable colour.
    #[must_use]
    pub fn from_transform(transform: &SegmentTransform, id: u32) -> Self {
        Self {
            offset: transform.translation,
            height: transform.height,
            width: transform.width,
            orientation: transform.packed_orientation(),
            pick_id: encode_pick_id(id).unwrap_or(UNPICKABLE),
            dynamic_bits: DynamicBits::EMPTY,
        }
    }

    /// Zero-sized record with the force-hidden flag set.
    #[must_use]
    pub fn hidden(id: u32) -> Self {
        Self {
            offset: Vec3::ZERO,
            height: 0.0,
            width: 0.0,
            orientation: [0.0, 0.0, 0.0, 1.0],
            pick_id: encode_pick_id(id).unwrap_or(UNPICKABLE),
            dynamic_bits: DynamicBits::EMPTY.with(RenderFlag::ForceHidden),
        }
    }

    /// Whether the record is force-hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.dynamic_bits.has(RenderFlag::ForceHidden)
    }
}
