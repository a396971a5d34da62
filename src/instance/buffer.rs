//! Structure-of-arrays store for instance attributes.
//!
//! Capacity is fixed at construction: the GPU vertex buffers mirror these
//! channels one-to-one and never grow mid-session. Each channel is exposed
//! as a plain slice ready for `bytemuck::cast_slice` and upload.

use glam::Vec3;

use super::bitfield::{DynamicBits, RenderFlag};
use super::record::InstanceRecord;
use crate::error::DrillscopeError;

/// Fixed-capacity per-instance attribute channels.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceAttributeBuffer {
    offsets: Vec<[f32; 3]>,
    /// (height, width) per instance.
    extents: Vec<[f32; 2]>,
    orientations: Vec<[f32; 4]>,
    pick_ids: Vec<[f32; 4]>,
    dynamic_bits: Vec<f32>,
    written: Vec<bool>,
    written_count: usize,
}

impl InstanceAttributeBuffer {
    /// Allocate `capacity` slots. Unwritten slots are force-hidden.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let hidden = DynamicBits::EMPTY.with(RenderFlag::ForceHidden).raw();
        Self {
            offsets: vec![[0.0; 3]; capacity],
            extents: vec![[0.0; 2]; capacity],
            orientations: vec![[0.0, 0.0, 0.0, 1.0]; capacity],
            pick_ids: vec![[0.0; 4]; capacity],
            dynamic_bits: vec![hidden; capacity],
            written: vec![false; capacity],
            written_count: 0,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the buffer has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of distinct slots written so far.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.written_count
    }

    /// Whether every slot has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.written_count == self.capacity()
    }

    /// Store `record` at `index`. Rewriting a slot is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] past the capacity.
    pub fn write(
        &mut self,
        index: usize,
        record: &InstanceRecord,
    ) -> Result<(), DrillscopeError> {
        self.check(index)?;
        self.offsets[index] = record.offset.to_array();
        self.extents[index] = [record.height, record.width];
        self.orientations[index] = record.orientation;
        self.pick_ids[index] = record.pick_id;
        self.dynamic_bits[index] = record.dynamic_bits.raw();
        if !self.written[index] {
            self.written[index] = true;
            self.written_count += 1;
        }
        Ok(())
    }

    /// Reassemble the record at `index`.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<InstanceRecord> {
        if index >= self.capacity() {
            return None;
        }
        let [height, width] = self.extents[index];
        Some(InstanceRecord {
            offset: Vec3::from_array(self.offsets[index]),
            height,
            width,
            orientation: self.orientations[index],
            pick_id: self.pick_ids[index],
            dynamic_bits: DynamicBits::from_raw(self.dynamic_bits[index]),
        })
    }

    /// Render-state flags of one instance.
    #[must_use]
    pub fn dynamic_bits(&self, index: usize) -> Option<DynamicBits> {
        self.dynamic_bits
            .get(index)
            .map(|&raw| DynamicBits::from_raw(raw))
    }

    /// Overwrite the render-state flags of one instance.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] past the capacity.
    pub fn set_dynamic_bits(
        &mut self,
        index: usize,
        bits: DynamicBits,
    ) -> Result<(), DrillscopeError> {
        self.check(index)?;
        self.dynamic_bits[index] = bits.raw();
        Ok(())
    }

    /// Offset channel (vec3 per instance).
    #[must_use]
    pub fn offsets(&self) -> &[[f32; 3]] {
        &self.offsets
    }

    /// Height/width channel (vec2 per instance).
    #[must_use]
    pub fn extents(&self) -> &[[f32; 2]] {
        &self.extents
    }

    /// Orientation channel (vec4 per instance).
    #[must_use]
    pub fn orientations(&self) -> &[[f32; 4]] {
        &self.orientations
    }

    /// Pick colour channel (vec4 per instance).
    #[must_use]
    pub fn pick_ids(&self) -> &[[f32; 4]] {
        &self.pick_ids
    }

    /// Dynamic bitfield channel (one float per instance).
    #[must_use]
    pub fn dynamic_bits_channel(&self) -> &[f32] {
        &self.dynamic_bits
    }

    /// Number of force-hidden instances.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.dynamic_bits
            .iter()
            .filter(|&&raw| DynamicBits::from_raw(raw).has(RenderFlag::ForceHidden))
            .count()
    }

    fn check(&self, index: usize) -> Result<(), DrillscopeError> {
        if index < self.capacity() {
            Ok(())
        } else {
            Err(DrillscopeError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            })
        }
    }
}
