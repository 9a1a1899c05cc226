// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized validation tolerances with numerical justification.
//!
//! Every threshold used by tests, benches and the validation binary is
//! defined here with the reason for its size. No ad-hoc magic numbers.
//!
//! # Tolerance categories
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 / f32 | 1e-15 for a zero input |
//! | Operation reordering | summation order differs | 1e-14 interior + exterior |
//! | Reduced precision | f32 kernels vs f64 reference | 1e-6 relative |
//! | Device | WGSL f64, possible FMA contraction | 1e-13 |

/// Machine-precision tolerances shared by every check.
pub mod core;
/// Hopping-kernel parity, decomposition and operator identities.
pub mod dhop;

pub use core::{EXACT_F64, NEAR_ZERO_EXPECTED, ROUNDING_F32, ROUNDING_F64};

pub use dhop::{
    BACKEND_PARITY_F32, BACKEND_PARITY_F64, DAG_ADJOINT_F64, DECOMPOSITION_F64,
    DIR_SUM_PARITY_F64, FREE_FIELD_ABS, GAMMA5_HERMITICITY_F64, GPU_SHADER_PARITY_F64,
    IMPULSE_SUPPORT_FLOOR, ZERO_INPUT_ABS,
};
