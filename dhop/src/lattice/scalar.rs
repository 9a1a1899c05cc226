// SPDX-License-Identifier: AGPL-3.0-only

//! Element types for the stencil arithmetic.
//!
//! Every kernel is written against [`Lane`]: something that adds, subtracts,
//! multiplies and negates. A scalar `f64` is a lane, and so is a `wide`
//! SIMD vector of `f64`. The SIMD backend runs the very same projection and
//! link-multiply code on vectors that the scalar backends run on reals,
//! which is what keeps the backends bit-for-bit equivalent.
//!
//! [`Real`] is a scalar lane that also knows its vector partner.

use std::fmt::{Debug, Display};
use std::ops::{Add, Mul, Neg, Sub};

/// Arithmetic element of a complex number: a real or a vector of reals.
pub trait Lane:
    Copy
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    /// Additive identity.
    fn zero() -> Self;
}

/// Floating-point precision a field can be stored in (`f32` or `f64`).
pub trait Real: Lane + bytemuck::Pod + PartialOrd + Debug + Display {
    /// SIMD vector of this precision used by the lane-parallel backend.
    type Vector: Lane;

    /// Number of reals packed into [`Self::Vector`].
    const LANES: usize;

    /// Short label used in reports (`"f64"`, `"f32"`).
    const NAME: &'static str;

    fn one() -> Self;

    fn from_f64(x: f64) -> Self;

    fn to_f64(self) -> f64;

    /// Absolute value.
    #[must_use]
    fn magnitude(self) -> Self;

    /// Build a vector lane by lane; `lane` runs over `0..LANES`.
    fn gather(lane: impl FnMut(usize) -> Self) -> Self::Vector;

    /// Visit every lane of a vector in order.
    fn scatter(v: Self::Vector, lane: impl FnMut(usize, Self));
}

impl Lane for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Lane for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Lane for wide::f64x4 {
    #[inline]
    fn zero() -> Self {
        Self::splat(0.0)
    }
}

impl Lane for wide::f32x8 {
    #[inline]
    fn zero() -> Self {
        Self::splat(0.0)
    }
}

impl Real for f64 {
    type Vector = wide::f64x4;
    const LANES: usize = 4;
    const NAME: &'static str = "f64";

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn magnitude(self) -> Self {
        self.abs()
    }

    #[inline]
    fn gather(lane: impl FnMut(usize) -> Self) -> Self::Vector {
        let lanes: [f64; 4] = std::array::from_fn(lane);
        wide::f64x4::from(lanes)
    }

    #[inline]
    fn scatter(v: Self::Vector, mut lane: impl FnMut(usize, Self)) {
        let lanes: [f64; 4] = bytemuck::cast(v);
        for (i, x) in lanes.into_iter().enumerate() {
            lane(i, x);
        }
    }
}

impl Real for f32 {
    type Vector = wide::f32x8;
    const LANES: usize = 8;
    const NAME: &'static str = "f32";

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(x: f64) -> Self {
        x as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn magnitude(self) -> Self {
        self.abs()
    }

    #[inline]
    fn gather(lane: impl FnMut(usize) -> Self) -> Self::Vector {
        let lanes: [f32; 8] = std::array::from_fn(lane);
        wide::f32x8::from(lanes)
    }

    #[inline]
    fn scatter(v: Self::Vector, mut lane: impl FnMut(usize, Self)) {
        let lanes: [f32; 8] = bytemuck::cast(v);
        for (i, x) in lanes.into_iter().enumerate() {
            lane(i, x);
        }
    }
}
