// SPDX-License-Identifier: AGPL-3.0-only

//! GPU FP64 compute for the hopping kernels.
//!
//! Creates a wgpu device with `SHADER_F64` enabled and provides helpers for
//! running f64 compute shaders on any Vulkan, Metal or DX12 GPU.
//!
//! ## Adapter selection
//!
//! | `HOTSPRING_GPU_ADAPTER` | Behavior |
//! |-------|----------|
//! | *(unset)*, `auto` | first discrete `SHADER_F64` adapter, then any `SHADER_F64` |
//! | `0`, `1`, … | adapter by enumeration index |
//! | substring | case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//!
//! ## Module structure
//!
//! - `adapter`: adapter discovery and selection
//! - `buffers`: f64/u32 buffer creation, upload, readback
//! - `dispatch`: command encoding and dispatch
//! - `wilson`: the f64 Wilson hopping shader

mod adapter;
mod buffers;
mod dispatch;
mod wilson;

pub use adapter::{AdapterInfo, AdapterSelector};
pub use buffers::mapped_bytes_to_f64;
pub use dispatch::split_workgroups;
pub use wilson::{WilsonDhopGpu, WGSL_WILSON_DHOP_F64};

use crate::error::DhopError;

/// GPU context with FP64 support.
#[must_use]
pub struct GpuF64 {
    pub adapter_name: String,
    pub has_f64: bool,
    pub has_timestamps: bool,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuF64 {
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl GpuF64 {
    /// Create a GPU device requesting `SHADER_F64`.
    ///
    /// # Errors
    ///
    /// [`DhopError::NoAdapter`] or [`DhopError::DeviceCreation`] if no
    /// adapter qualifies or device creation fails, and
    /// [`DhopError::NoShaderF64`] if the chosen adapter lacks f64 shaders.
    pub async fn new() -> Result<Self, DhopError> {
        let selected = adapter::select_adapter()?;
        let adapter_info = selected.get_info();
        let adapter_features = selected.features();

        if !adapter_features.contains(wgpu::Features::SHADER_F64) {
            return Err(DhopError::NoShaderF64);
        }
        let mut required_features = wgpu::Features::SHADER_F64;
        if adapter_features.contains(wgpu::Features::TIMESTAMP_QUERY) {
            required_features |= wgpu::Features::TIMESTAMP_QUERY;
        }

        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: 512 * 1024 * 1024,
            max_buffer_size: 1024 * 1024 * 1024,
            ..wgpu::Limits::default()
        };

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("hotSpring dhop device"),
                    required_features,
                    required_limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| DhopError::DeviceCreation(e.to_string()))?;

        log::info!("GPU device ready: {}", adapter_info.name);
        Ok(Self {
            adapter_name: adapter_info.name,
            has_f64: true,
            has_timestamps: required_features.contains(wgpu::Features::TIMESTAMP_QUERY),
            device,
            queue,
        })
    }

    /// Enumerate all available GPU adapters.
    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        adapter::enumerate_adapters()
    }

    pub fn print_info(&self) {
        println!("  GPU: {}", self.adapter_name);
        println!("  SHADER_F64: {}", if self.has_f64 { "YES" } else { "NO" });
        println!(
            "  TIMESTAMP_QUERY: {}",
            if self.has_timestamps { "YES" } else { "NO" }
        );
    }

    pub fn print_available_adapters() {
        let adapters = Self::enumerate_adapters();
        println!("  Available GPU adapters:");
        for info in &adapters {
            let marker = if info.has_f64 { "✓" } else { "✗" };
            println!("    {marker} {info}");
        }
        if adapters.is_empty() {
            println!("    (none found)");
        }
    }
}

impl GpuF64 {
    /// Compile a WGSL compute shader with entry point `main`.
    #[must_use]
    pub fn create_pipeline(&self, wgsl: &str, label: &str) -> wgpu::ComputePipeline {
        let shader_module = self
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            });

        self.device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &shader_module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
    }
}
