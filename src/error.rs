//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the drillscope crate.
#[derive(Debug)]
pub enum DrillscopeError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Shader composition failure.
    Shader(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background worker thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Property JSON failed to parse or validate.
    PropertyParse(String),
    /// An assay value outside the domain of the width policy
    /// (negative or non-finite).
    InvalidValue(f32),
    /// Write past the fixed capacity of an instance attribute buffer.
    IndexOutOfRange {
        /// Offending instance index.
        index: usize,
        /// Capacity the buffer was allocated with.
        capacity: usize,
    },
    /// A load did not finish within the allotted time.
    LoadTimeout {
        /// Records written when the wait gave up.
        completed: usize,
        /// Records the load expected.
        total: usize,
    },
}

impl fmt::Display for DrillscopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::PropertyParse(msg) => {
                write!(f, "property parse error: {msg}")
            }
            Self::InvalidValue(v) => {
                write!(f, "assay value {v} is outside the width policy domain")
            }
            Self::IndexOutOfRange { index, capacity } => write!(
                f,
                "instance index {index} out of range for capacity {capacity}"
            ),
            Self::LoadTimeout { completed, total } => write!(
                f,
                "timed out solving intervals ({completed}/{total})"
            ),
        }
    }
}

impl std::error::Error for DrillscopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for DrillscopeError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for DrillscopeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
