//! Input records for the interval core.
//!
//! [`Interval`] is the fixed-shape record the geometry core consumes;
//! [`Property`] parses and validates the property JSON and flattens it into
//! intervals.

mod interval;
mod property;

pub use interval::Interval;
pub use property::{BoundingBox, Hole, IntervalLabel, Mineral, Property};
