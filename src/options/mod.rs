//! Centralized rendering and dispatch options with TOML preset support.
//!
//! Geometry tessellation, width policy, display uniforms, and worker pool
//! settings are consolidated here. Options serialize to/from TOML so a
//! viewer can ship presets next to its property files.

mod dispatch;
mod display;
mod geometry;

use std::path::Path;

pub use dispatch::DispatchOptions;
pub use display::DisplayOptions;
pub use geometry::{GeometryOptions, MAX_JITTER};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DrillscopeError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[display]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Template and width policy options.
    pub geometry: GeometryOptions,
    /// Shader uniform options.
    pub display: DisplayOptions,
    /// Background worker pool options.
    pub dispatch: DispatchOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Io`] if the file cannot be read and
    /// [`DrillscopeError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, DrillscopeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from a TOML string. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, DrillscopeError> {
        toml::from_str(content)
            .map_err(|e| DrillscopeError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::OptionsParse`] if serialization fails and
    /// [`DrillscopeError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), DrillscopeError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DrillscopeError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(DrillscopeError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[display]
transparency = 0.5
";
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.display.transparency, 0.5);
        assert_eq!(opts.display.log_widths, 1.0);
        assert_eq!(opts.geometry.min_width, 0.3);
        assert_eq!(opts.geometry.max_width, 15.0);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = Options::from_toml("[display\nfoo").unwrap_err();
        assert!(matches!(err, DrillscopeError::OptionsParse(_)));
    }

    #[test]
    fn jitter_is_clamped() {
        let mut geometry = GeometryOptions::default();
        geometry.jitter = 5.0;
        assert_eq!(geometry.jitter(), MAX_JITTER);
        geometry.jitter = f32::NAN;
        assert_eq!(geometry.jitter(), 0.0);
        geometry.radial_segments = 1;
        assert_eq!(geometry.radial_segments(), 3);
    }

    #[test]
    fn dispatch_guards_zero_values() {
        let dispatch = DispatchOptions {
            worker_count: 0,
            idle_timeout_ms: 0,
            chunk_size: 0,
        };
        assert_eq!(dispatch.workers(), 1);
        assert_eq!(dispatch.chunk_size(), 1);
        assert!(dispatch.idle_timeout().as_millis() >= 1);
    }

    #[test]
    fn display_uniforms_clamp_ranges() {
        let display = DisplayOptions {
            log_widths: 3.0,
            transparency: -1.0,
            ..DisplayOptions::default()
        };
        let u = display.uniforms();
        assert_eq!(u.log_widths, 1.0);
        assert_eq!(u.transparency, 0.0);
        assert_eq!(u.hover_color[3], 1.0);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        assert!(props.contains_key("geometry"));
        assert!(props.contains_key("display"));
        assert!(props.contains_key("dispatch"));

        let display = &props["display"]["properties"];
        assert!(display.get("transparency").is_some());
        assert!(display.get("hover_color").is_none());
    }
}
