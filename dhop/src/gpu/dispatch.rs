// SPDX-License-Identifier: AGPL-3.0-only

//! GPU dispatch and bind-group helpers.
//!
//! ```text
//! create_bind_group() → bind group at binding 0, 1, 2, … in order
//! dispatch_and_read() → ONE submission, staging copy, readback
//! ```

use super::GpuF64;
use crate::error::DhopError;

/// Split a workgroup count into (x, y, 1) when x > 65535.
///
/// Shaders linearize via `gid.x + gid.y * num_workgroups.x * WG_SIZE`.
#[must_use]
pub fn split_workgroups(total: u32) -> (u32, u32, u32) {
    if total <= 65535 {
        (total, 1, 1)
    } else {
        let y = total.div_ceil(65535);
        let x = total.div_ceil(y);
        (x, y, 1)
    }
}

impl GpuF64 {
    /// Bind `buffers` at binding indices 0, 1, 2, … of group 0.
    pub fn create_bind_group(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
    ) -> wgpu::BindGroup {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .zip(0u32..)
            .map(|(buf, binding)| wgpu::BindGroupEntry {
                binding,
                resource: buf.as_entire_binding(),
            })
            .collect();
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bind_group"),
            layout: &layout,
            entries: &entries,
        })
    }

    /// Dispatch a compute pipeline and read back `output_count` f64 values.
    ///
    /// # Errors
    ///
    /// [`DhopError::GpuCompute`] if the readback fails.
    pub fn dispatch_and_read(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        workgroups: u32,
        output_buffer: &wgpu::Buffer,
        output_count: usize,
    ) -> Result<Vec<f64>, DhopError> {
        let staging = self.create_staging_buffer(output_count * 8, "staging");

        let mut encoder = self
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("compute"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let (wx, wy, wz) = split_workgroups(workgroups);
            pass.dispatch_workgroups(wx, wy, wz);
        }

        encoder.copy_buffer_to_buffer(output_buffer, 0, &staging, 0, (output_count * 8) as u64);
        self.queue().submit(std::iter::once(encoder.finish()));

        self.read_staging_f64(&staging)
    }
}
