use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest endpoint jitter accepted, in scene units.
pub const MAX_JITTER: f32 = 1e-2;

/// Template tessellation and interval width policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Geometry", inline)]
#[serde(default)]
pub struct GeometryOptions {
    /// Radial segments around the shared unit cylinder.
    #[schemars(title = "Radial Segments", range(min = 3, max = 64))]
    pub radial_segments: u32,
    /// Lower clamp of the logarithmic width curve.
    #[schemars(title = "Min Width", range(min = 0.01, max = 5.0), extend("step" = 0.01))]
    pub min_width: f32,
    /// Upper clamp of the logarithmic width curve.
    #[schemars(title = "Max Width", range(min = 1.0, max = 50.0), extend("step" = 0.5))]
    pub max_width: f32,
    /// Amplitude of the midpoint perturbation that breaks z-fighting
    /// between segments sharing an endpoint.
    #[schemars(skip)]
    pub jitter: f32,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            radial_segments: 16,
            min_width: 0.3,
            max_width: 15.0,
            jitter: 1e-3,
        }
    }
}

impl GeometryOptions {
    /// Radial segment count with the template minimum applied.
    #[must_use]
    pub fn radial_segments(&self) -> u32 {
        self.radial_segments.max(3)
    }

    /// Jitter amplitude clamped into `[0, MAX_JITTER]`.
    #[must_use]
    pub fn jitter(&self) -> f32 {
        if self.jitter.is_finite() {
            self.jitter.clamp(0.0, MAX_JITTER)
        } else {
            0.0
        }
    }
}
