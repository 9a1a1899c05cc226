// SPDX-License-Identifier: AGPL-3.0-only

//! Dirac spinors, half-spinors and Wilson fermion fields.
//!
//! A spinor carries 4 spin × N color complex components. A half-spinor is
//! what survives a `(1 ± γ_μ)` projection: 2 spin × N color. Fermion fields
//! are stored 5D-major: `sF = site * Ls + s`.
//!
//! Gamma matrices use the DeGrand-Rossi (chiral) basis, where
//! `γ5 = γx γy γz γt = diag(1, 1, −1, −1)`:
//!
//! ```text
//! γx = [[0,0,0,i],[0,0,i,0],[0,−i,0,0],[−i,0,0,0]]
//! γy = [[0,0,0,−1],[0,0,1,0],[0,1,0,0],[−1,0,0,0]]
//! γz = [[0,0,i,0],[0,0,0,−i],[−i,0,0,0],[0,i,0,0]]
//! γt = [[0,0,1,0],[0,0,0,1],[1,0,0,0],[0,1,0,0]]
//! ```

use super::complex::Complex;
use super::constants::{lcg_uniform_f64, N_HALF_SPIN, N_SPIN};
use super::scalar::{Lane, Real};
use std::ops::{Add, Neg, Sub};

/// Full Dirac spinor at one site: `s[spin][color]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Spinor<T, const N: usize> {
    pub s: [[Complex<T>; N]; N_SPIN],
}

/// Projected half-spinor: `h[spin][color]`, spin ∈ {0, 1}.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct HalfSpinor<T, const N: usize> {
    pub h: [[Complex<T>; N]; N_HALF_SPIN],
}

// SAFETY: `#[repr(C)]` arrays of Pod complex values, no padding.
unsafe impl<T: bytemuck::Zeroable, const N: usize> bytemuck::Zeroable for Spinor<T, N> {}
// SAFETY: as above.
unsafe impl<T: bytemuck::Pod, const N: usize> bytemuck::Pod for Spinor<T, N> {}
// SAFETY: as above.
unsafe impl<T: bytemuck::Zeroable, const N: usize> bytemuck::Zeroable for HalfSpinor<T, N> {}
// SAFETY: as above.
unsafe impl<T: bytemuck::Pod, const N: usize> bytemuck::Pod for HalfSpinor<T, N> {}

impl<T: Lane, const N: usize> Spinor<T, N> {
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            s: [[Complex::zero(); N]; N_SPIN],
        }
    }
}

impl<T: Real, const N: usize> Spinor<T, N> {
    pub fn norm_sq(&self) -> f64 {
        self.s.iter().flatten().map(|z| z.abs_sq().to_f64()).sum()
    }

    #[must_use]
    pub fn cast<U: Real>(&self) -> Spinor<U, N> {
        let mut r = Spinor::<U, N>::zero();
        for (a, b) in r.s.iter_mut().flatten().zip(self.s.iter().flatten()) {
            *a = b.cast();
        }
        r
    }
}

impl<T: Lane, const N: usize> HalfSpinor<T, N> {
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            h: [[Complex::zero(); N]; N_HALF_SPIN],
        }
    }
}

impl<T: Lane, const N: usize> Add for Spinor<T, N> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        let mut r = self;
        for (a, b) in r.s.iter_mut().flatten().zip(rhs.s.iter().flatten()) {
            *a += *b;
        }
        r
    }
}

impl<T: Lane, const N: usize> Sub for Spinor<T, N> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let mut r = self;
        for (a, b) in r.s.iter_mut().flatten().zip(rhs.s.iter().flatten()) {
            *a -= *b;
        }
        r
    }
}

impl<T: Lane, const N: usize> Neg for Spinor<T, N> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        let mut r = self;
        for a in r.s.iter_mut().flatten() {
            *a = -*a;
        }
        r
    }
}

impl<T: Lane, const N: usize> Neg for HalfSpinor<T, N> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        let mut r = self;
        for a in r.h.iter_mut().flatten() {
            *a = -*a;
        }
        r
    }
}

/// Euclidean gamma matrices in the DeGrand-Rossi basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gamma {
    X,
    Y,
    Z,
    T,
    Five,
}

impl Gamma {
    /// γ_μ for μ = 0..4 (x, y, z, t).
    ///
    /// # Panics
    ///
    /// Panics if `mu >= 4`.
    #[must_use]
    pub const fn direction(mu: usize) -> Self {
        match mu {
            0 => Self::X,
            1 => Self::Y,
            2 => Self::Z,
            3 => Self::T,
            _ => panic!("direction index out of range"),
        }
    }

    /// `γ ψ` for one spinor.
    #[must_use]
    pub fn apply<T: Lane, const N: usize>(self, psi: &Spinor<T, N>) -> Spinor<T, N> {
        let mut r = Spinor::zero();
        let p = &psi.s;
        for c in 0..N {
            let [r0, r1, r2, r3] = match self {
                Self::X => [p[3][c].mul_i(), p[2][c].mul_i(), p[1][c].mul_minus_i(), p[0][c].mul_minus_i()],
                Self::Y => [-p[3][c], p[2][c], p[1][c], -p[0][c]],
                Self::Z => [p[2][c].mul_i(), p[3][c].mul_minus_i(), p[0][c].mul_minus_i(), p[1][c].mul_i()],
                Self::T => [p[2][c], p[3][c], p[0][c], p[1][c]],
                Self::Five => [p[0][c], p[1][c], -p[2][c], -p[3][c]],
            };
            r.s[0][c] = r0;
            r.s[1][c] = r1;
            r.s[2][c] = r2;
            r.s[3][c] = r3;
        }
        r
    }
}

/// Wilson fermion field over `nsite` sites and a 5th-dimension extent `ls`.
#[derive(Clone, Debug, PartialEq)]
pub struct FermionField<T, const N: usize> {
    pub data: Vec<Spinor<T, N>>,
    pub nsite: usize,
    pub ls: usize,
}

impl<T: Real, const N: usize> FermionField<T, N> {
    pub fn zeros(nsite: usize, ls: usize) -> Self {
        Self {
            data: vec![Spinor::zero(); nsite * ls],
            nsite,
            ls,
        }
    }

    /// Uniform components in [−½, ½) from the LCG, reproducible per seed.
    pub fn random(nsite: usize, ls: usize, seed: u64) -> Self {
        let mut rng = seed;
        let mut field = Self::zeros(nsite, ls);
        for z in field.data.iter_mut().flat_map(|sp| sp.s.iter_mut().flatten()) {
            let re = lcg_uniform_f64(&mut rng) - 0.5;
            let im = lcg_uniform_f64(&mut rng) - 0.5;
            *z = Complex::new(T::from_f64(re), T::from_f64(im));
        }
        field
    }

    /// Unit impulse at one `(site, s, spin, color)` component.
    pub fn point_source(
        nsite: usize,
        ls: usize,
        site: usize,
        s: usize,
        spin: usize,
        color: usize,
    ) -> Self {
        let mut field = Self::zeros(nsite, ls);
        field.data[site * ls + s].s[spin][color] = Complex::one();
        field
    }

    /// Flattened fermion index `sF = site * Ls + s`.
    #[inline]
    pub const fn index(&self, site: usize, s: usize) -> usize {
        site * self.ls + s
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `<self | other>`, accumulated in f64.
    pub fn dot(&self, other: &Self) -> Complex<f64> {
        let mut sum = Complex::<f64>::zero();
        for (a, b) in self.data.iter().zip(&other.data) {
            for (x, y) in a.s.iter().flatten().zip(b.s.iter().flatten()) {
                sum += x.cast::<f64>().conj() * y.cast::<f64>();
            }
        }
        sum
    }

    pub fn norm_sq(&self) -> f64 {
        self.data.iter().map(Spinor::norm_sq).sum()
    }

    /// `self += a · x`
    pub fn axpy(&mut self, a: Complex<T>, x: &Self) {
        for (si, xi) in self.data.iter_mut().zip(&x.data) {
            for (p, q) in si.s.iter_mut().flatten().zip(xi.s.iter().flatten()) {
                *p += a * *q;
            }
        }
    }

    pub fn scale_inplace(&mut self, a: T) {
        for z in self.data.iter_mut().flat_map(|sp| sp.s.iter_mut().flatten()) {
            *z = z.scale(a);
        }
    }

    pub fn zero(&mut self) {
        self.data.fill(Spinor::zero());
    }

    /// `ψ → γ5 ψ` at every site.
    pub fn apply_gamma5(&mut self) {
        for sp in &mut self.data {
            *sp = Gamma::Five.apply(sp);
        }
    }

    /// `‖self − other‖ / ‖other‖`, or the absolute norm if `other` vanishes.
    /// Infinite when the fields hold different numbers of spinors.
    pub fn relative_distance(&self, other: &Self) -> f64 {
        if self.data.len() != other.data.len() {
            return f64::INFINITY;
        }
        let diff: f64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (*a - *b).norm_sq())
            .sum();
        let reference = other.norm_sq();
        if reference > 0.0 {
            (diff / reference).sqrt()
        } else {
            diff.sqrt()
        }
    }

    /// Largest componentwise |self − other|; infinite on a length mismatch.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        if self.data.len() != other.data.len() {
            return f64::INFINITY;
        }
        let mut worst = 0.0_f64;
        for (a, b) in self.data.iter().zip(&other.data) {
            for (x, y) in a.s.iter().flatten().zip(b.s.iter().flatten()) {
                worst = worst.max((*x - *y).abs_sq().to_f64().sqrt());
            }
        }
        worst
    }

    /// Sites with any nonzero component (any `s`).
    pub fn support(&self) -> Vec<usize> {
        (0..self.nsite)
            .filter(|&site| {
                (0..self.ls).any(|s| self.data[self.index(site, s)].norm_sq() > 0.0)
            })
            .collect()
    }

    #[must_use]
    pub fn cast<U: Real>(&self) -> FermionField<U, N> {
        FermionField {
            data: self.data.iter().map(Spinor::cast).collect(),
            nsite: self.nsite,
            ls: self.ls,
        }
    }

    /// Interleaved reals in device order `[sF][spin][color][re, im]`.
    pub fn flat(&self) -> &[T] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn flat_mut(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(&mut self.data)
    }
}
