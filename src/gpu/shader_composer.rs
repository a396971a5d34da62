use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::DrillscopeError;

/// Every top-level shader program the crate builds pipelines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Visible pass: lit instances with hover, emissive and transparency.
    IntervalMesh,
    /// Picking pass: flat packed-id color.
    IntervalPicking,
}

impl Shader {
    /// All shader programs.
    pub const ALL: [Self; 2] = [Self::IntervalMesh, Self::IntervalPicking];

    /// WGSL source with `#import` directives.
    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            Self::IntervalMesh => include_str!(
                "../../assets/shaders/raster/interval_mesh.wgsl"
            ),
            Self::IntervalPicking => include_str!(
                "../../assets/shaders/utility/picking_interval.wgsl"
            ),
        }
    }

    /// Virtual file path used in composer diagnostics.
    #[must_use]
    pub fn file_path(self) -> &'static str {
        match self {
            Self::IntervalMesh => "raster/interval_mesh.wgsl",
            Self::IntervalPicking => "utility/picking_interval.wgsl",
        }
    }

    /// Debug label for the created shader module.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::IntervalMesh => "Interval Mesh Shader",
            Self::IntervalPicking => "Interval Picking Shader",
        }
    }
}

/// Shared module definition: (source, file_path).
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/camera.wgsl"),
        file_path: "modules/camera.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/bitfield.wgsl"),
        file_path: "modules/bitfield.wgsl",
    },
    ModuleDef {
        source: include_str!(
            "../../assets/shaders/modules/interval_instance.wgsl"
        ),
        file_path: "modules/interval_instance.wgsl",
    },
];

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming
/// shaders use `#import drillscope::module_name` to pull in shared code.
/// The composer produces `naga::Module` IR directly, skipping WGSL re-parse
/// at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Register all shared modules.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if a module fails to parse.
    pub fn new() -> Result<Self, DrillscopeError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    DrillscopeError::Shader(format!(
                        "failed to register module '{}': {e}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose `shader` into a `wgpu::ShaderModule` ready for pipeline
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, DrillscopeError> {
        let module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose `shader` into a `naga::Module` without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, DrillscopeError> {
        self.compose_source(shader.source(), shader.file_path())
    }

    /// Compose arbitrary WGSL that may `#import` the shared modules.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::Shader`] if composition fails.
    pub fn compose_source(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, DrillscopeError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                DrillscopeError::Shader(format!(
                    "failed to compose '{file_path}': {e}"
                ))
            })
    }
}
