use std::fmt;

use crate::geometry::template::IndexWidth;

/// Errors that can occur during GPU context initialization.
#[derive(Debug)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
    /// The aggregate mesh needs 32-bit indices but the device cannot draw
    /// with them.
    WideIndexUnsupported {
        /// Vertex count of the aggregate mesh that needed wide indices.
        vertex_count: u64,
    },
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            Self::WideIndexUnsupported { vertex_count } => write!(
                f,
                "{vertex_count} vertices need 32-bit indices, which this \
                 device does not support"
            ),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::WideIndexUnsupported { .. } => None,
        }
    }
}

/// Owns the core wgpu resources: device, queue and the capabilities the
/// interval renderer depends on.
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// Color format of the visible render target.
    pub format: wgpu::TextureFormat,
    wide_indices: bool,
}

impl RenderContext {
    /// Create a context without a presentation surface.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if the adapter or device request fails.
    pub async fn headless() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: None,
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Drillscope Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::DeviceRequest)?;

        Ok(Self::from_device(
            &adapter,
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ))
    }

    /// Wrap an externally-owned device and queue.
    ///
    /// The caller passes the adapter so wide-index support can be queried.
    #[must_use]
    pub fn from_device(
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            format,
            wide_indices: adapter_supports_wide_indices(adapter),
        }
    }

    /// Whether 32-bit index buffers can be drawn.
    #[must_use]
    pub fn supports_wide_indices(&self) -> bool {
        self.wide_indices
    }

    /// Fail if a mesh of `vertex_count` vertices needs 32-bit indices the
    /// device cannot provide.
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError::WideIndexUnsupported`].
    pub fn require_index_width(
        &self,
        width: IndexWidth,
        vertex_count: u64,
    ) -> Result<(), RenderContextError> {
        check_index_width(width, self.wide_indices, vertex_count)
    }

    /// Create a new command encoder for recording GPU commands.
    #[must_use]
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Interval Encoder"),
            })
    }

    /// Finish the encoder and submit its command buffer to the GPU queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Fail when `width` is wide and the device cannot draw wide indices.
///
/// # Errors
///
/// Returns [`RenderContextError::WideIndexUnsupported`].
pub fn check_index_width(
    width: IndexWidth,
    wide_supported: bool,
    vertex_count: u64,
) -> Result<(), RenderContextError> {
    match width {
        IndexWidth::Wide if !wide_supported => {
            Err(RenderContextError::WideIndexUnsupported { vertex_count })
        }
        _ => Ok(()),
    }
}

fn adapter_supports_wide_indices(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::FULL_DRAW_INDEX_UINT32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_mesh_fails_without_capability() {
        let vertex_count = u64::from(u16::MAX) + 2;
        let width = IndexWidth::for_vertex_count(vertex_count);
        assert_eq!(width, IndexWidth::Wide);
        let err = check_index_width(width, false, vertex_count).unwrap_err();
        assert!(matches!(
            err,
            RenderContextError::WideIndexUnsupported { vertex_count: v }
                if v == vertex_count
        ));
        assert!(err.to_string().contains("32-bit"));
    }

    #[test]
    fn supported_or_narrow_widths_pass() {
        assert!(check_index_width(IndexWidth::Wide, true, 1 << 20).is_ok());
        assert!(check_index_width(IndexWidth::Narrow, false, 1_000).is_ok());
        assert!(check_index_width(IndexWidth::Narrow, true, 1_000).is_ok());
    }
}
