// SPDX-License-Identifier: AGPL-3.0-only

//! Hopping-kernel tolerances.
//!
//! All host backends evaluate the same operations in the same order and
//! agree bit for bit in practice; the thresholds below are what the checks
//! would still accept if a compiler reassociated a sum.

use super::core::{ROUNDING_F32, ROUNDING_F64};

/// Relative distance between two f64 backends on the same operands.
pub const BACKEND_PARITY_F64: f64 = ROUNDING_F64;

/// Relative distance of an f32 backend from the f64 generic reference.
///
/// Inputs are cast from f64, so the error is f32 rounding of one Dhop:
/// eight legs of a 3×3 product each, ~1e-7 per operation.
pub const BACKEND_PARITY_F32: f64 = ROUNDING_F32;

/// Relative distance of interior + exterior from the full hop.
///
/// The split passes add the same eight leg terms in a different order.
pub const DECOMPOSITION_F64: f64 = ROUNDING_F64;

/// Relative distance of Σ_legs `dhop_dir` from the full hop.
pub const DIR_SUM_PARITY_F64: f64 = ROUNDING_F64;

/// Max |D†_{ij} − conj(D_{ji})| of dense 2⁴ matrices (unit-norm links,
/// entries O(1)).
pub const DAG_ADJOINT_F64: f64 = 1e-13;

/// Relative distance of γ5 Dhop γ5 from Dhop†.
///
/// γ5 only flips signs, so the only difference is the projector pairing.
pub const GAMMA5_HERMITICITY_F64: f64 = ROUNDING_F64;

/// Dhop · 0 must be exactly 0; any nonzero is an indexing bug. 1e-15
/// allows nothing but signed zeros.
pub const ZERO_INPUT_ABS: f64 = 1e-15;

/// Free-field identities on unit links (Dhop ψ_const = 8 ψ_const).
pub const FREE_FIELD_ABS: f64 = 1e-13;

/// Norm² below which a site counts as empty in impulse-response checks.
pub const IMPULSE_SUPPORT_FLOOR: f64 = 1e-24;

/// WGSL f64 shader vs host `Gpu` backend.
///
/// Drivers may contract `a * b + c` into FMA, changing the last bit of
/// each link product. Max observed ~1e-15; 1e-13 is conservative.
pub const GPU_SHADER_PARITY_F64: f64 = 1e-13;
