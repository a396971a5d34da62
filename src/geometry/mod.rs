//! CPU-side geometry for interval instances.
//!
//! The shared unit-cylinder template, the solver that maps it onto an
//! arbitrary segment, and the value-to-width policy.

/// Shared unit-cylinder mesh.
pub mod template;
/// Segment-to-instance transform solver.
pub mod transform;
/// Logarithmic value-to-width mapping.
pub mod width;

pub use template::{build_unit_cylinder, Template, TemplateVertex};
pub use transform::{DegenerateSegment, SegmentTransform, TEMPLATE_AXIS};
pub use width::{width_of, WidthPolicy};
