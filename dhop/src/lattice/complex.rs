// SPDX-License-Identifier: AGPL-3.0-only

//! Complex arithmetic over any [`Lane`].
//!
//! `Complex<f64>` is the reference type used for validation, `Complex<f32>`
//! the single-precision storage type, and `Complex<wide::f64x4>` the packed
//! form the SIMD backend computes in. Only the ring operations needed by the
//! stencil are generic; norms and conjugation of scalars live on
//! `Complex<T: Real>`.
//!
//! The memory layout is `#[repr(C)] { re, im }` so a slice of complex
//! values casts to an interleaved slice of reals for device upload.

use super::scalar::{Lane, Real};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Complex number with real and imaginary lanes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

pub type Complex64 = Complex<f64>;
pub type Complex32 = Complex<f32>;

// SAFETY: `#[repr(C)]` with two fields of the same Pod type, no padding.
unsafe impl<T: bytemuck::Zeroable> bytemuck::Zeroable for Complex<T> {}
// SAFETY: as above.
unsafe impl<T: bytemuck::Pod> bytemuck::Pod for Complex<T> {}

impl<T: Lane> Complex<T> {
    #[inline]
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }

    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            re: T::zero(),
            im: T::zero(),
        }
    }

    /// `i · z`
    #[inline]
    #[must_use]
    pub fn mul_i(self) -> Self {
        Self {
            re: -self.im,
            im: self.re,
        }
    }

    /// `−i · z`
    #[inline]
    #[must_use]
    pub fn mul_minus_i(self) -> Self {
        Self {
            re: self.im,
            im: -self.re,
        }
    }

    #[inline]
    #[must_use]
    pub fn conj(self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    #[inline]
    #[must_use]
    pub fn scale(self, s: T) -> Self {
        Self {
            re: self.re * s,
            im: self.im * s,
        }
    }
}

impl<T: Real> Complex<T> {
    #[inline]
    #[must_use]
    pub fn one() -> Self {
        Self::new(T::one(), T::zero())
    }

    #[inline]
    #[must_use]
    pub fn i() -> Self {
        Self::new(T::zero(), T::one())
    }

    #[inline]
    pub fn abs_sq(self) -> T {
        self.re * self.re + self.im * self.im
    }

    /// Convert between precisions.
    #[inline]
    #[must_use]
    pub fn cast<U: Real>(self) -> Complex<U> {
        Complex::new(U::from_f64(self.re.to_f64()), U::from_f64(self.im.to_f64()))
    }
}

impl<T: Lane> Add for Complex<T> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl<T: Lane> AddAssign for Complex<T> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Lane> Sub for Complex<T> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl<T: Lane> SubAssign for Complex<T> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Lane> Mul for Complex<T> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl<T: Lane> Neg for Complex<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

impl<T: Real> fmt::Display for Complex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (re, im) = (self.re.to_f64(), self.im.to_f64());
        if im >= 0.0 {
            write!(f, "{re:.6}+{im:.6}i")
        } else {
            write!(f, "{re:.6}{im:.6}i")
        }
    }
}

/// WGSL helpers for complex f64 arithmetic, prepended to the hopping shader.
///
/// Mirrors [`Complex`] operation for operation, including the order of the
/// products in `c64_mul`, so the device result matches the host backends.
pub const WGSL_COMPLEX64: &str = r"
struct Complex64 {
    re: f64,
    im: f64,
}

fn c64_zero() -> Complex64 {
    return Complex64(f64(0.0), f64(0.0));
}

fn c64_add(a: Complex64, b: Complex64) -> Complex64 {
    return Complex64(a.re + b.re, a.im + b.im);
}

fn c64_sub(a: Complex64, b: Complex64) -> Complex64 {
    return Complex64(a.re - b.re, a.im - b.im);
}

fn c64_mul(a: Complex64, b: Complex64) -> Complex64 {
    return Complex64(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re);
}

fn c64_neg(a: Complex64) -> Complex64 {
    return Complex64(-a.re, -a.im);
}

fn c64_mul_i(a: Complex64) -> Complex64 {
    return Complex64(-a.im, a.re);
}

fn c64_mul_minus_i(a: Complex64) -> Complex64 {
    return Complex64(a.im, -a.re);
}
";
