// SPDX-License-Identifier: AGPL-3.0-only

//! N×N complex color matrices: gauge links of any representation.
//!
//! `ColorMatrix<T, 3>` is the SU(3) fundamental link. Other sizes carry the
//! SU(2) fundamental (N = 2), the SU(2) adjoint (N = 3, real orthogonal),
//! or the SU(4) fundamental (N = 4). Generation routines build in f64 and
//! [`ColorMatrix::cast`] to the storage precision.

use super::complex::Complex;
use super::constants::{lcg_gaussian, LATTICE_DIVISION_GUARD};
use super::scalar::{Lane, Real};
use std::ops::{Add, Mul, Sub};

/// Row-major N×N complex matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct ColorMatrix<T, const N: usize> {
    pub m: [[Complex<T>; N]; N],
}

/// SU(3) fundamental link.
pub type Su3Matrix<T = f64> = ColorMatrix<T, 3>;

// SAFETY: `#[repr(C)]` array of Pod complex values, no padding.
unsafe impl<T: bytemuck::Zeroable, const N: usize> bytemuck::Zeroable for ColorMatrix<T, N> {}
// SAFETY: as above.
unsafe impl<T: bytemuck::Pod, const N: usize> bytemuck::Pod for ColorMatrix<T, N> {}

impl<T: Lane, const N: usize> ColorMatrix<T, N> {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            m: [[Complex::zero(); N]; N],
        }
    }

    /// Hermitian conjugate U†.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        let mut r = Self::zero();
        for i in 0..N {
            for j in 0..N {
                r.m[i][j] = self.m[j][i].conj();
            }
        }
        r
    }

    /// U · v for a color vector.
    #[must_use]
    pub fn mul_vec(&self, v: &[Complex<T>; N]) -> [Complex<T>; N] {
        let mut r = [Complex::zero(); N];
        for (ri, row) in r.iter_mut().zip(&self.m) {
            for (a, b) in row.iter().zip(v) {
                *ri += *a * *b;
            }
        }
        r
    }
}

impl<T: Real, const N: usize> ColorMatrix<T, N> {
    #[must_use]
    pub fn identity() -> Self {
        let mut r = Self::zero();
        for i in 0..N {
            r.m[i][i] = Complex::one();
        }
        r
    }

    pub fn trace(&self) -> Complex<T> {
        (0..N).fold(Complex::zero(), |acc, i| acc + self.m[i][i])
    }

    /// Frobenius norm squared, accumulated in f64.
    pub fn norm_sq(&self) -> f64 {
        self.m
            .iter()
            .flatten()
            .map(|z| z.abs_sq().to_f64())
            .sum()
    }

    /// Largest entry of |U U† − I|.
    pub fn unitarity_defect(&self) -> f64 {
        let p = *self * self.adjoint();
        let mut worst = 0.0_f64;
        for i in 0..N {
            for j in 0..N {
                let target = if i == j { 1.0 } else { 0.0 };
                let d = (p.m[i][j].re.to_f64() - target).hypot(p.m[i][j].im.to_f64());
                worst = worst.max(d);
            }
        }
        worst
    }

    #[must_use]
    pub fn cast<U: Real>(&self) -> ColorMatrix<U, N> {
        let mut r = ColorMatrix::<U, N>::zero();
        for i in 0..N {
            for j in 0..N {
                r.m[i][j] = self.m[i][j].cast();
            }
        }
        r
    }
}

impl<const N: usize> ColorMatrix<f64, N> {
    /// Random U(N) matrix: Gaussian entries orthonormalized row by row.
    pub fn random_unitary(seed: &mut u64) -> Self {
        let mut u = Self::zero();
        for z in u.m.iter_mut().flatten() {
            *z = Complex::new(lcg_gaussian(seed), lcg_gaussian(seed));
        }
        u.orthonormalize_rows();
        u
    }

    /// Modified Gram-Schmidt over the rows.
    fn orthonormalize_rows(&mut self) {
        for r in 0..N {
            for p in 0..r {
                let dot = (0..N).fold(Complex::zero(), |acc, j| {
                    acc + self.m[p][j].conj() * self.m[r][j]
                });
                for j in 0..N {
                    let proj = self.m[p][j] * dot;
                    self.m[r][j] -= proj;
                }
            }
            let norm = self.m[r].iter().map(|z| z.abs_sq()).sum::<f64>().sqrt();
            if norm > LATTICE_DIVISION_GUARD {
                let inv = 1.0 / norm;
                for z in &mut self.m[r] {
                    *z = z.scale(inv);
                }
            }
        }
    }
}

impl ColorMatrix<f64, 3> {
    /// Random SU(3) link near the identity: `exp(iεH)` to second order,
    /// reunitarized. Used for hot-start gauge configurations.
    pub fn random_near_identity(seed: &mut u64, epsilon: f64) -> Self {
        let mut h = [[Complex::<f64>::zero(); 3]; 3];
        let mut gauss = || lcg_gaussian(seed) * epsilon;

        let a3 = gauss();
        let a8 = gauss();
        h[0][0] = Complex::new(a3 + a8 / 3.0_f64.sqrt(), 0.0);
        h[1][1] = Complex::new(-a3 + a8 / 3.0_f64.sqrt(), 0.0);
        h[2][2] = Complex::new(-2.0 * a8 / 3.0_f64.sqrt(), 0.0);
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let (re, im) = (gauss(), gauss());
            h[i][j] = Complex::new(re, im);
            h[j][i] = Complex::new(re, -im);
        }

        let mut u = Self::identity();
        for i in 0..3 {
            for j in 0..3 {
                let h2 = (0..3).fold(Complex::zero(), |acc, k| acc + h[i][k] * h[k][j]);
                u.m[i][j] += h[i][j].mul_i() - h2.scale(0.5);
            }
        }
        u.reunitarize()
    }

    /// Project back onto SU(3): orthonormalize rows 0 and 1, then
    /// row 2 = conj(row 0 × row 1) so that det = 1.
    #[must_use]
    pub fn reunitarize(self) -> Self {
        let mut u = self;
        u.orthonormalize_rows();
        u.m[2][0] = (u.m[0][1] * u.m[1][2] - u.m[0][2] * u.m[1][1]).conj();
        u.m[2][1] = (u.m[0][2] * u.m[1][0] - u.m[0][0] * u.m[1][2]).conj();
        u.m[2][2] = (u.m[0][0] * u.m[1][1] - u.m[0][1] * u.m[1][0]).conj();
        u
    }

    /// Adjoint image of an SU(2) matrix: `R_ab = ½ Tr(σ_a V σ_b V†)`.
    ///
    /// The result is real orthogonal, stored with zero imaginary parts.
    pub fn su2_adjoint(v: &ColorMatrix<f64, 2>) -> Self {
        let sigma = pauli();
        let vd = v.adjoint();
        let mut r = Self::zero();
        for a in 0..3 {
            for b in 0..3 {
                let prod = sigma[a] * *v * sigma[b] * vd;
                r.m[a][b] = Complex::new(0.5 * prod.trace().re, 0.0);
            }
        }
        r
    }
}

fn pauli() -> [ColorMatrix<f64, 2>; 3] {
    let z = Complex::<f64>::zero();
    let one = Complex::one();
    let i = Complex::i();
    [
        ColorMatrix { m: [[z, one], [one, z]] },
        ColorMatrix { m: [[z, -i], [i, z]] },
        ColorMatrix { m: [[one, z], [z, -one]] },
    ]
}

impl<T: Lane, const N: usize> Mul for ColorMatrix<T, N> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut r = Self::zero();
        for i in 0..N {
            for j in 0..N {
                for k in 0..N {
                    r.m[i][j] += self.m[i][k] * rhs.m[k][j];
                }
            }
        }
        r
    }
}

impl<T: Lane, const N: usize> Add for ColorMatrix<T, N> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut r = self;
        for (a, b) in r.m.iter_mut().flatten().zip(rhs.m.iter().flatten()) {
            *a += *b;
        }
        r
    }
}

impl<T: Lane, const N: usize> Sub for ColorMatrix<T, N> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut r = self;
        for (a, b) in r.m.iter_mut().flatten().zip(rhs.m.iter().flatten()) {
            *a -= *b;
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_unitary() {
        assert!(Su3Matrix::<f64>::identity().unitarity_defect() < 1e-15);
        assert!((Su3Matrix::<f64>::identity().trace().re - 3.0).abs() < 1e-15);
    }

    #[test]
    fn random_near_identity_is_special_unitary() {
        let mut seed = 42;
        for _ in 0..20 {
            let u = Su3Matrix::random_near_identity(&mut seed, 0.7);
            assert!(u.unitarity_defect() < 1e-12, "defect {}", u.unitarity_defect());
            let det = u.m[0][0] * (u.m[1][1] * u.m[2][2] - u.m[1][2] * u.m[2][1])
                - u.m[0][1] * (u.m[1][0] * u.m[2][2] - u.m[1][2] * u.m[2][0])
                + u.m[0][2] * (u.m[1][0] * u.m[2][1] - u.m[1][1] * u.m[2][0]);
            assert!((det.re - 1.0).abs() < 1e-12 && det.im.abs() < 1e-12);
        }
    }

    #[test]
    fn random_unitary_for_every_size() {
        let mut seed = 7;
        assert!(ColorMatrix::<f64, 2>::random_unitary(&mut seed).unitarity_defect() < 1e-12);
        assert!(ColorMatrix::<f64, 4>::random_unitary(&mut seed).unitarity_defect() < 1e-12);
        assert!(ColorMatrix::<f64, 8>::random_unitary(&mut seed).unitarity_defect() < 1e-12);
    }

    #[test]
    fn su2_adjoint_is_real_orthogonal() {
        let mut seed = 3;
        let v = ColorMatrix::<f64, 2>::random_unitary(&mut seed);
        let r = Su3Matrix::su2_adjoint(&v);
        assert!(r.unitarity_defect() < 1e-12);
        assert!(r.m.iter().flatten().all(|z| z.im == 0.0));
    }

    #[test]
    fn su2_adjoint_of_identity_is_identity() {
        let r = Su3Matrix::su2_adjoint(&ColorMatrix::<f64, 2>::identity());
        assert!((r - Su3Matrix::identity()).norm_sq() < 1e-28);
    }

    #[test]
    fn adjoint_reverses_products() {
        let mut seed = 11;
        let a = Su3Matrix::random_near_identity(&mut seed, 1.0);
        let b = Su3Matrix::random_near_identity(&mut seed, 1.0);
        let lhs = (a * b).adjoint();
        let rhs = b.adjoint() * a.adjoint();
        assert!((lhs - rhs).norm_sq() < 1e-26);
    }

    #[test]
    fn mul_vec_matches_matrix_product_column() {
        let mut seed = 5;
        let u = Su3Matrix::random_near_identity(&mut seed, 1.0);
        let v = [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)];
        let r = u.mul_vec(&v);
        for i in 0..3 {
            assert_eq!(r[i], u.m[i][0]);
        }
    }

    #[test]
    fn cast_to_single_keeps_unitarity() {
        let mut seed = 9;
        let u: Su3Matrix<f32> = Su3Matrix::random_near_identity(&mut seed, 1.0).cast();
        assert!(u.unitarity_defect() < 1e-6);
    }
}
