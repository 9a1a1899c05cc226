// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for kernel configuration, field layout, and GPU execution.
//!
//! The hopping kernels themselves have no recoverable failures. Everything
//! that can go wrong is caught once, at setup or at the entry of a call,
//! and reported through [`DhopError`]. The raw-code entry point
//! [`crate::kernels::dhop_kernel_code`] turns the same conditions into a
//! panic instead.

use std::fmt;

/// Errors arising from kernel selection, geometry, configuration, or GPU use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhopError {
    /// Option code outside `{Generic=0, HandUnroll=1, InlineAsm=2, Gpu=3}`.
    InvalidKernelOpt(i64),

    /// Comms policy code outside `{CommsAndCompute=0, CommsThenCompute=1}`.
    InvalidCommsPolicy(i64),

    /// `interior = false` and `exterior = false`: no legs selected.
    EmptyLegSelection,

    /// A backend was requested for a representation that only has the
    /// generic kernel.
    UnsupportedOption {
        opt: &'static str,
        representation: &'static str,
    },

    /// Field, gauge, stencil, or halo extents disagree.
    LayoutMismatch(String),

    /// Bad environment variable or JSON configuration.
    Config(String),

    /// The process-wide default configuration was already installed.
    AlreadyInstalled,

    /// No compatible GPU adapter was found by wgpu.
    NoAdapter,

    /// GPU device creation failed (wraps the underlying wgpu error message).
    DeviceCreation(String),

    /// GPU lacks the `SHADER_F64` feature required for f64 compute.
    NoShaderF64,

    /// Buffer mapping or readback failed.
    GpuCompute(String),
}

impl fmt::Display for DhopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKernelOpt(code) => write!(f, "Invalid kernel option code {code}"),
            Self::InvalidCommsPolicy(code) => write!(f, "Invalid comms policy code {code}"),
            Self::EmptyLegSelection => {
                write!(f, "Dhop called with interior=0 and exterior=0")
            }
            Self::UnsupportedOption {
                opt,
                representation,
            } => write!(
                f,
                "Kernel option {opt} is not available for representation {representation}"
            ),
            Self::LayoutMismatch(msg) => write!(f, "Layout mismatch: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::AlreadyInstalled => {
                write!(f, "Default kernel configuration already installed")
            }
            Self::NoAdapter => write!(f, "No GPU adapter found"),
            Self::DeviceCreation(e) => write!(f, "Failed to create GPU device: {e}"),
            Self::NoShaderF64 => write!(
                f,
                "GPU does not support SHADER_F64; cannot run the f64 hopping shader"
            ),
            Self::GpuCompute(msg) => write!(f, "GPU compute failed: {msg}"),
        }
    }
}

impl std::error::Error for DhopError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_opt_includes_code() {
        assert_eq!(
            DhopError::InvalidKernelOpt(7).to_string(),
            "Invalid kernel option code 7"
        );
    }

    #[test]
    fn display_empty_legs() {
        assert!(DhopError::EmptyLegSelection
            .to_string()
            .contains("interior=0 and exterior=0"));
    }

    #[test]
    fn display_unsupported_option_names_both_sides() {
        let err = DhopError::UnsupportedOption {
            opt: "InlineAsm",
            representation: "SU(2) fundamental",
        };
        let msg = err.to_string();
        assert!(msg.contains("InlineAsm"));
        assert!(msg.contains("SU(2) fundamental"));
    }

    #[test]
    fn display_no_shader_f64() {
        assert!(DhopError::NoShaderF64.to_string().contains("SHADER_F64"));
    }

    #[test]
    fn error_trait_works() {
        let err = DhopError::NoAdapter;
        let dyn_err: &dyn std::error::Error = &err;
        assert_eq!(dyn_err.to_string(), "No GPU adapter found");
    }
}
