//! GPU resource management utilities.
//!
//! Device initialization, typed attribute buffers and shader composition.

/// Fixed-length typed GPU buffers.
pub mod dynamic_buffer;
/// wgpu device and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
