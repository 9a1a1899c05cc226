// SPDX-License-Identifier: AGPL-3.0-only

//! GPU buffer creation, upload, and readback for f64/u32 lattice data.

use super::GpuF64;
use crate::error::DhopError;
use wgpu::util::DeviceExt;

/// Bytes of `data`, or a single zero word when `data` is empty.
///
/// Zero-sized bindings are invalid, and an interior pass has no halo.
fn non_empty_bytes<T: bytemuck::Pod>(data: &[T]) -> Vec<u8> {
    if data.is_empty() {
        vec![0u8; 8]
    } else {
        bytemuck::cast_slice(data).to_vec()
    }
}

impl GpuF64 {
    /// Read-only storage buffer from f64 data.
    #[must_use]
    pub fn create_f64_buffer(&self, data: &[f64], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &non_empty_bytes(data),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
    }

    /// Read-write storage buffer seeded with `data`, for accumulating output.
    #[must_use]
    pub fn create_f64_output_buffer(&self, data: &[f64], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &non_empty_bytes(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
    }

    #[must_use]
    pub fn create_u32_buffer(&self, data: &[u32], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &non_empty_bytes(data),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
    }

    #[must_use]
    pub fn create_uniform_buffer(&self, data: &[u8], label: &str) -> wgpu::Buffer {
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }

    /// Staging buffer for reading results back to the host.
    #[must_use]
    pub fn create_staging_buffer(&self, size: usize, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Map a staging buffer after submit and return its contents.
    ///
    /// # Errors
    ///
    /// [`DhopError::GpuCompute`] if the map callback fails or its channel
    /// is dropped.
    pub fn read_staging_f64(&self, staging: &wgpu::Buffer) -> Result<Vec<f64>, DhopError> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| DhopError::GpuCompute("map callback: channel recv failed".into()))?
            .map_err(|e| DhopError::GpuCompute(format!("buffer mapping: {e}")))?;

        let data = slice.get_mapped_range();
        let result = mapped_bytes_to_f64(&data);
        drop(data);
        staging.unmap();
        Ok(result)
    }
}

/// Convert mapped GPU buffer bytes to f64 values.
///
/// Mapped ranges are normally 8-byte aligned, so `bytemuck::try_cast_slice`
/// succeeds; otherwise the bytes are decoded one word at a time.
#[must_use]
pub fn mapped_bytes_to_f64(data: &[u8]) -> Vec<f64> {
    bytemuck::try_cast_slice(data).map_or_else(
        |_| {
            data.chunks_exact(8)
                .map(|chunk| {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(chunk);
                    f64::from_le_bytes(b)
                })
                .collect()
        },
        <[f64]>::to_vec,
    )
}
