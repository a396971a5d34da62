//! GPU-based picking of interval instances.
//!
//! Renders each instance's packed id as a flat color into an offscreen
//! `Rgba8Unorm` target and reads back the pixel under the cursor. The cost
//! is one pixel copy regardless of how many intervals are loaded.

mod pick_map;
mod pipeline;

pub use pick_map::{PickMap, PickTarget};
pub use pipeline::{Picking, PICK_FORMAT};
