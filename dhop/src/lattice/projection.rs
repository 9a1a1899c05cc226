// SPDX-License-Identifier: AGPL-3.0-only

//! Half-spinor projection and reconstruction along one stencil leg.
//!
//! A hop along μ only needs `(1 ± γ_μ) ψ`, which has rank 2 in spin space:
//! the upper two components determine the lower two. Each leg therefore
//! projects to a [`HalfSpinor`], multiplies by the link (two color-vector
//! products instead of four), and reconstructs the lower components.
//!
//! | Projector | h0 | h1 | r2 | r3 |
//! |-----------|----|----|----|----|
//! | 1+γx | ψ0+iψ3 | ψ1+iψ2 | −i·h1 | −i·h0 |
//! | 1−γx | ψ0−iψ3 | ψ1−iψ2 | i·h1 | i·h0 |
//! | 1+γy | ψ0−ψ3 | ψ1+ψ2 | h1 | −h0 |
//! | 1−γy | ψ0+ψ3 | ψ1−ψ2 | −h1 | h0 |
//! | 1+γz | ψ0+iψ2 | ψ1−iψ3 | −i·h0 | i·h1 |
//! | 1−γz | ψ0−iψ2 | ψ1+iψ3 | i·h0 | −i·h1 |
//! | 1+γt | ψ0+ψ2 | ψ1+ψ3 | h0 | h1 |
//! | 1−γt | ψ0−ψ2 | ψ1−ψ3 | −h0 | −h1 |
//!
//! with `r0 = h0`, `r1 = h1` throughout. Multiplications by ±i are exact
//! component swaps, so every backend reproduces these bit for bit.
//!
//! Forward legs (`x → x+μ̂`) use `1 − γ_μ`, backward legs `1 + γ_μ`; the
//! dagger operator swaps the two.

use super::color::ColorMatrix;
use super::complex::Complex;
use super::constants::N_DIM;
use super::scalar::Lane;
use super::spinor::{HalfSpinor, Spinor};

/// Stencil leg: direction and displacement. Discriminants are the leg
/// index used by the stencil table and the doubled gauge field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Leg {
    Xp = 0,
    Yp = 1,
    Zp = 2,
    Tp = 3,
    Xm = 4,
    Ym = 5,
    Zm = 6,
    Tm = 7,
}

impl Leg {
    /// All legs in kernel iteration order.
    pub const ALL: [Self; 8] = [
        Self::Xp,
        Self::Yp,
        Self::Zp,
        Self::Tp,
        Self::Xm,
        Self::Ym,
        Self::Zm,
        Self::Tm,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Leg from its table index.
    ///
    /// # Panics
    ///
    /// Panics if `i >= 8`.
    #[inline]
    #[must_use]
    pub const fn from_index(i: usize) -> Self {
        Self::ALL[i]
    }

    /// Direction μ ∈ 0..4.
    #[inline]
    pub const fn mu(self) -> usize {
        self as usize % N_DIM
    }

    /// Whether the hop goes to `x + μ̂`.
    #[inline]
    pub const fn is_forward(self) -> bool {
        (self as usize) < N_DIM
    }

    /// Leg in direction `mu`, forward or backward.
    ///
    /// # Panics
    ///
    /// Panics if `mu >= 4`.
    #[inline]
    #[must_use]
    pub const fn new(mu: usize, forward: bool) -> Self {
        assert!(mu < N_DIM, "direction out of range");
        Self::ALL[if forward { mu } else { mu + N_DIM }]
    }

    /// Leg pointing the other way along the same direction.
    #[inline]
    #[must_use]
    pub const fn reverse(self) -> Self {
        Self::new(self.mu(), !self.is_forward())
    }

    /// Projector applied to the neighbor spinor on this leg.
    #[inline]
    pub const fn projector(self, dag: bool) -> Projector {
        Projector::new(self.mu(), self.is_forward() == dag)
    }
}

/// `(1 ± γ_μ)` spin projector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Projector {
    XPlus,
    YPlus,
    ZPlus,
    TPlus,
    XMinus,
    YMinus,
    ZMinus,
    TMinus,
}

impl Projector {
    /// # Panics
    ///
    /// Panics if `mu >= 4`.
    #[inline]
    pub const fn new(mu: usize, plus: bool) -> Self {
        match (mu, plus) {
            (0, true) => Self::XPlus,
            (1, true) => Self::YPlus,
            (2, true) => Self::ZPlus,
            (3, true) => Self::TPlus,
            (0, false) => Self::XMinus,
            (1, false) => Self::YMinus,
            (2, false) => Self::ZMinus,
            (3, false) => Self::TMinus,
            _ => panic!("direction out of range"),
        }
    }

    #[inline]
    pub const fn is_plus(self) -> bool {
        matches!(self, Self::XPlus | Self::YPlus | Self::ZPlus | Self::TPlus)
    }
}

/// `(1 ± γ_μ) ψ`, upper two spin components.
#[inline]
pub fn spin_project<T: Lane, const N: usize>(
    proj: Projector,
    psi: &Spinor<T, N>,
) -> HalfSpinor<T, N> {
    let p = &psi.s;
    let mut h = HalfSpinor::zero();
    for c in 0..N {
        let (h0, h1) = match proj {
            Projector::XPlus => (p[0][c] + p[3][c].mul_i(), p[1][c] + p[2][c].mul_i()),
            Projector::XMinus => (p[0][c] - p[3][c].mul_i(), p[1][c] - p[2][c].mul_i()),
            Projector::YPlus => (p[0][c] - p[3][c], p[1][c] + p[2][c]),
            Projector::YMinus => (p[0][c] + p[3][c], p[1][c] - p[2][c]),
            Projector::ZPlus => (p[0][c] + p[2][c].mul_i(), p[1][c] - p[3][c].mul_i()),
            Projector::ZMinus => (p[0][c] - p[2][c].mul_i(), p[1][c] + p[3][c].mul_i()),
            Projector::TPlus => (p[0][c] + p[2][c], p[1][c] + p[3][c]),
            Projector::TMinus => (p[0][c] - p[2][c], p[1][c] - p[3][c]),
        };
        h.h[0][c] = h0;
        h.h[1][c] = h1;
    }
    h
}

/// `U · χ` on both spin components of a half-spinor.
#[inline]
pub fn mult_link<T: Lane, const N: usize>(
    u: &ColorMatrix<T, N>,
    chi: &HalfSpinor<T, N>,
) -> HalfSpinor<T, N> {
    HalfSpinor {
        h: [u.mul_vec(&chi.h[0]), u.mul_vec(&chi.h[1])],
    }
}

/// Lower spin components `(r2, r3)` recovered from a half-spinor.
#[inline]
pub fn spin_recon_lower<T: Lane>(proj: Projector, h0: Complex<T>, h1: Complex<T>) -> (Complex<T>, Complex<T>) {
    match proj {
        Projector::XPlus => (h1.mul_minus_i(), h0.mul_minus_i()),
        Projector::XMinus => (h1.mul_i(), h0.mul_i()),
        Projector::YPlus => (h1, -h0),
        Projector::YMinus => (-h1, h0),
        Projector::ZPlus => (h0.mul_minus_i(), h1.mul_i()),
        Projector::ZMinus => (h0.mul_i(), h1.mul_minus_i()),
        Projector::TPlus => (h0, h1),
        Projector::TMinus => (-h0, -h1),
    }
}

/// `acc += (1 ± γ_μ)`-reconstruction of `h`.
#[inline]
pub fn spin_recon_accum<T: Lane, const N: usize>(
    proj: Projector,
    acc: &mut Spinor<T, N>,
    h: &HalfSpinor<T, N>,
) {
    for c in 0..N {
        let (h0, h1) = (h.h[0][c], h.h[1][c]);
        let (r2, r3) = spin_recon_lower(proj, h0, h1);
        acc.s[0][c] += h0;
        acc.s[1][c] += h1;
        acc.s[2][c] += r2;
        acc.s[3][c] += r3;
    }
}
