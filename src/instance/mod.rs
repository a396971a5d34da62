//! Per-instance data for the interval mesh.
//!
//! Instance records, the structure-of-arrays buffer they are written into,
//! the float-encoded render-state bitfield, and the packed pick-id colour.

/// Float-encoded render-state flags shared with the shaders.
pub mod bitfield;
/// Fixed-capacity structure-of-arrays attribute store.
pub mod buffer;
/// Interval id to RGBA colour packing for GPU picking.
pub mod pick_id;
/// One instance's attributes.
pub mod record;

pub use bitfield::{clear_bit, set_bit, test_bit, DynamicBits, RenderFlag};
pub use buffer::InstanceAttributeBuffer;
pub use pick_id::{decode_pick_color, encode_pick_id, MAX_PICK_ID};
pub use record::InstanceRecord;
