// SPDX-License-Identifier: AGPL-3.0-only

//! Machine-precision tolerances (IEEE 754).

/// Tolerance for compositions of exact f64 operations.
///
/// f64 has ~15.9 significant digits; 1e-10 leaves room for five digits of
/// accumulated rounding (dense linear algebra on small matrices).
pub const EXACT_F64: f64 = 1e-10;

/// A few ULP of relative rounding in f64 (ε = 2.22e-16).
pub const ROUNDING_F64: f64 = 1e-14;

/// A few ULP of relative rounding in f32 (ε = 1.19e-7), with headroom
/// for the eight-term leg sum.
pub const ROUNDING_F32: f64 = 1e-6;

/// Magnitudes below this count as zero when choosing between absolute and
/// relative error.
pub const NEAR_ZERO_EXPECTED: f64 = 1e-14;
