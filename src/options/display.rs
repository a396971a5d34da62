use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::renderer::IntervalUniforms;

/// Per-frame styling shared by every interval instance.
///
/// These map one-to-one onto the uniform block consumed by the visible and
/// picking shaders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
pub struct DisplayOptions {
    /// Global multiplier applied to every instance width.
    #[schemars(title = "Width Scale", range(min = 0.05, max = 5.0), extend("step" = 0.05))]
    pub uniform_scale: f32,
    /// Blend between constant width (0) and log-mapped width (1).
    #[schemars(title = "Log Widths", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub log_widths: f32,
    /// Factor used by the scale-up / scale-down instance flags.
    #[schemars(title = "Highlight Scale", range(min = 1.0, max = 4.0), extend("step" = 0.05))]
    pub scale_attribute: f32,
    /// Alpha applied to instances carrying the transparent flag.
    #[schemars(title = "Transparency", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub transparency: f32,
    /// Color of hovered instances.
    #[schemars(skip)]
    pub hover_color: [f32; 3],
    /// Color of instances that are not hovered.
    #[schemars(skip)]
    pub base_color: [f32; 3],
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            uniform_scale: 1.0,
            log_widths: 1.0,
            scale_attribute: 1.5,
            transparency: 0.25,
            hover_color: [1.0, 0.85, 0.2],
            base_color: [0.75, 0.45, 0.2],
        }
    }
}

impl DisplayOptions {
    /// Pack into the GPU uniform layout.
    #[must_use]
    pub fn uniforms(&self) -> IntervalUniforms {
        IntervalUniforms {
            uniform_scale: self.uniform_scale,
            log_widths: self.log_widths.clamp(0.0, 1.0),
            scale_attribute: self.scale_attribute.max(1e-3),
            transparency: self.transparency.clamp(0.0, 1.0),
            hover_color: [
                self.hover_color[0],
                self.hover_color[1],
                self.hover_color[2],
                1.0,
            ],
            base_color: [
                self.base_color[0],
                self.base_color[1],
                self.base_color[2],
                1.0,
            ],
        }
    }
}
