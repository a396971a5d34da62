//! Typed GPU buffers for per-vertex and per-instance attribute channels.
//!
//! Instance channels are sized once when a scene is assembled. Only
//! individual elements are rewritten afterwards (dynamic bit updates), so
//! the buffer never reallocates and bind groups stay valid.

use std::marker::PhantomData;

use wgpu::util::DeviceExt;

use crate::error::DrillscopeError;

/// Fixed-length GPU buffer of `T` elements.
pub struct TypedBuffer<T> {
    buffer: wgpu::Buffer,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> TypedBuffer<T> {
    /// Upload `data`. Empty slices still allocate one element so the buffer
    /// can be bound.
    pub fn new_with_data(
        device: &wgpu::Device,
        label: &str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = if data.is_empty() {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size_of::<T>().max(4) as u64,
                usage,
                mapped_at_creation: false,
            })
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage,
            })
        };
        Self {
            buffer,
            count: data.len(),
            _marker: PhantomData,
        }
    }

    /// Overwrite the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] past the uploaded length.
    pub fn write_at(
        &self,
        queue: &wgpu::Queue,
        index: usize,
        value: T,
    ) -> Result<(), DrillscopeError> {
        if index >= self.count {
            return Err(DrillscopeError::IndexOutOfRange {
                index,
                capacity: self.count,
            });
        }
        let offset = (index * size_of::<T>()) as u64;
        queue.write_buffer(&self.buffer, offset, bytemuck::bytes_of(&value));
        Ok(())
    }

    /// The underlying wgpu buffer.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of elements.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
