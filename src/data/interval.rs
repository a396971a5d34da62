use glam::Vec3;

/// One assay interval: a segment along a drillhole with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Start of the segment in scene space.
    pub start: Vec3,
    /// End of the segment in scene space.
    pub end: Vec3,
    /// Assay value (concentration), expected `>= 0`.
    pub value: f32,
    /// Identifier written into the pick colour.
    pub id: u32,
}

impl Interval {
    /// Construct from raw coordinates.
    #[must_use]
    pub fn new(start: [f32; 3], end: [f32; 3], value: f32, id: u32) -> Self {
        Self {
            start: Vec3::from_array(start),
            end: Vec3::from_array(end),
            value,
            id,
        }
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}
