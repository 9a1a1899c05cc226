// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized constants for the Wilson hopping term.
//!
//! Lattice shape constants, the LCG PRNG used for reproducible test
//! configurations, and numerical guards shared by `color`, `gauge` and
//! `spinor`.

/// Number of colors of the fundamental SU(3) representation.
pub const N_COLORS: usize = 3;

/// Number of spacetime dimensions.
pub const N_DIM: usize = 4;

/// Stencil legs per site: one forward and one backward hop per dimension.
pub const N_LEGS: usize = 2 * N_DIM;

/// Spin components of a Dirac spinor.
pub const N_SPIN: usize = 4;

/// Spin components surviving a (1 ± γ) projection.
pub const N_HALF_SPIN: usize = 2;

/// LCG multiplier (Knuth MMIX).
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// LCG increment (Knuth MMIX).
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// `(seed >> 11) as f64 / 2^53` gives a uniform deviate with 53 bits.
pub const LCG_53_DIVISOR: f64 = (1u64 << 53) as f64;

/// Division guard for Gram-Schmidt orthonormalization.
pub const LATTICE_DIVISION_GUARD: f64 = 1e-30;

/// Perturbation scale of hot-start SU(3) links around the identity.
pub const HOT_START_EPSILON: f64 = 1.5;

/// Advance the LCG state by one step.
#[inline]
pub fn lcg_step(seed: &mut u64) {
    *seed = seed
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
}

/// Uniform f64 in [0, 1) from 53 bits of LCG state.
#[inline]
pub fn lcg_uniform_f64(seed: &mut u64) -> f64 {
    lcg_step(seed);
    (*seed >> 11) as f64 / LCG_53_DIVISOR
}

/// Box-Muller Gaussian deviate N(0, 1) from two LCG draws.
#[inline]
pub fn lcg_gaussian(seed: &mut u64) -> f64 {
    let u1 = lcg_uniform_f64(seed);
    let u2 = lcg_uniform_f64(seed);
    (-2.0 * u1.max(LATTICE_DIVISION_GUARD).ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
