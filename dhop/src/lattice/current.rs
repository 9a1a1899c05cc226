// SPDX-License-Identifier: AGPL-3.0-only

//! Conserved vector current of the Wilson action, site by site.
//!
//! For quark propagators `q1`, `q2` the point-split current between `x`
//! and `x + μ̂` contracts
//!
//! ```text
//! fwd:  (γ5 q2† γ5) (1 − γ_μ) U_μ(x)        q1
//! bwd:  (γ5 q2† γ5) (1 + γ_μ) U_μ(x − μ̂)†   q1
//! ```
//!
//! and the sequential insertions build `(1 ∓ γ_μ) U q` restricted to the
//! timeslices selected by a mask. Both read the doubled gauge field, so the
//! backward variants use leg `μ + 4` of the same site.
//!
//! Every routine adds its contribution to `q_out`, or subtracts it when
//! `switch_sign` is set.

use super::color::ColorMatrix;
use super::complex::Complex;
use super::constants::N_SPIN;
use super::gauge::DoubledGaugeField;
use super::projection::Leg;
use super::scalar::Real;
use super::spinor::{Gamma, Spinor};
use std::ops::{Add, Mul, Sub};

/// Site propagator `m[s1][c1][s2][c2]`: a `4N × 4N` complex matrix, source
/// indices `(s2, c2)` last.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SitePropagator<T, const N: usize> {
    pub m: [[[[Complex<T>; N]; N_SPIN]; N]; N_SPIN],
}

impl<T: Real, const N: usize> SitePropagator<T, N> {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            m: [[[[Complex::zero(); N]; N_SPIN]; N]; N_SPIN],
        }
    }

    #[must_use]
    pub fn identity() -> Self {
        let mut p = Self::zero();
        for s in 0..N_SPIN {
            for c in 0..N {
                p.m[s][c][s][c] = Complex::one();
            }
        }
        p
    }

    /// Propagator with column `(s2, c2)` equal to `cols[s2 * N + c2]`.
    #[must_use]
    pub fn from_columns(cols: &[Spinor<T, N>]) -> Self {
        let mut p = Self::zero();
        for (k, col) in cols.iter().enumerate().take(N_SPIN * N) {
            p.set_column(k / N, k % N, col);
        }
        p
    }

    /// Column for source `(s2, c2)` as a spinor.
    #[must_use]
    pub fn column(&self, s2: usize, c2: usize) -> Spinor<T, N> {
        let mut sp = Spinor::zero();
        for s1 in 0..N_SPIN {
            for c1 in 0..N {
                sp.s[s1][c1] = self.m[s1][c1][s2][c2];
            }
        }
        sp
    }

    pub fn set_column(&mut self, s2: usize, c2: usize, sp: &Spinor<T, N>) {
        for s1 in 0..N_SPIN {
            for c1 in 0..N {
                self.m[s1][c1][s2][c2] = sp.s[s1][c1];
            }
        }
    }

    fn map_columns(&self, f: impl Fn(&Spinor<T, N>) -> Spinor<T, N>) -> Self {
        let mut p = Self::zero();
        for s2 in 0..N_SPIN {
            for c2 in 0..N {
                p.set_column(s2, c2, &f(&self.column(s2, c2)));
            }
        }
        p
    }

    /// `γ · self`
    #[must_use]
    pub fn gamma_left(&self, g: Gamma) -> Self {
        self.map_columns(|col| g.apply(col))
    }

    /// `U · self`, acting on the sink color index.
    #[must_use]
    pub fn link_left(&self, u: &ColorMatrix<T, N>) -> Self {
        self.map_columns(|col| {
            let mut r = Spinor::zero();
            for s in 0..N_SPIN {
                r.s[s] = u.mul_vec(&col.s[s]);
            }
            r
        })
    }

    /// Hermitian conjugate in spin ⊗ color.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        let mut p = Self::zero();
        for s1 in 0..N_SPIN {
            for c1 in 0..N {
                for s2 in 0..N_SPIN {
                    for c2 in 0..N {
                        p.m[s1][c1][s2][c2] = self.m[s2][c2][s1][c1].conj();
                    }
                }
            }
        }
        p
    }

    /// `γ5 · self · γ5`: flips the sign of entries with exactly one lower
    /// spin index.
    #[must_use]
    pub fn gamma5_sandwich(&self) -> Self {
        let mut p = *self;
        for s1 in 0..N_SPIN {
            for s2 in 0..N_SPIN {
                if (s1 < 2) != (s2 < 2) {
                    for c1 in 0..N {
                        for c2 in 0..N {
                            p.m[s1][c1][s2][c2] = -p.m[s1][c1][s2][c2];
                        }
                    }
                }
            }
        }
        p
    }

    /// Spin-color trace.
    #[must_use]
    pub fn trace(&self) -> Complex<T> {
        let mut t = Complex::zero();
        for s in 0..N_SPIN {
            for c in 0..N {
                t += self.m[s][c][s][c];
            }
        }
        t
    }
}

impl<T: Real, const N: usize> Add for SitePropagator<T, N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        let rhs = rhs.m.iter().flatten().flatten().flatten();
        for (a, b) in self.m.iter_mut().flatten().flatten().flatten().zip(rhs) {
            *a += *b;
        }
        self
    }
}

impl<T: Real, const N: usize> Sub for SitePropagator<T, N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        let rhs = rhs.m.iter().flatten().flatten().flatten();
        for (a, b) in self.m.iter_mut().flatten().flatten().flatten().zip(rhs) {
            *a -= *b;
        }
        self
    }
}

impl<T: Real, const N: usize> Mul for SitePropagator<T, N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut p = Self::zero();
        for s1 in 0..N_SPIN {
            for c1 in 0..N {
                for s2 in 0..N_SPIN {
                    for c2 in 0..N {
                        let mut acc = Complex::zero();
                        for s in 0..N_SPIN {
                            for c in 0..N {
                                acc += self.m[s1][c1][s][c] * rhs.m[s][c][s2][c2];
                            }
                        }
                        p.m[s1][c1][s2][c2] = acc;
                    }
                }
            }
        }
        p
    }
}

/// `(1 − γ_μ) q` for a forward hop, `(1 + γ_μ) q` for a backward one.
fn wilson_current<T: Real, const N: usize>(
    q: &SitePropagator<T, N>,
    mu: usize,
    forward: bool,
) -> SitePropagator<T, N> {
    let gq = q.gamma_left(Gamma::direction(mu));
    if forward {
        *q - gq
    } else {
        *q + gq
    }
}

fn accumulate<T: Real, const N: usize>(
    q_out: &mut SitePropagator<T, N>,
    contribution: SitePropagator<T, N>,
    switch_sign: bool,
) {
    *q_out = if switch_sign {
        *q_out - contribution
    } else {
        *q_out + contribution
    };
}

fn contract<T: Real, const N: usize>(
    q_in_1: &SitePropagator<T, N>,
    q_in_2: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    leg: Leg,
    switch_sign: bool,
) {
    let hopped = q_in_1.link_left(gauge.link(site, leg.index()));
    let current = wilson_current(&hopped, leg.mu(), leg.is_forward());
    let result = q_in_2.adjoint().gamma5_sandwich() * current;
    accumulate(q_out, result, switch_sign);
}

/// Forward conserved-current contraction at `site` in direction `mu`.
/// `q_in_1` is the propagator at `site + μ̂`.
///
/// # Panics
///
/// Panics if `mu >= 4` or `site` is outside the gauge field.
pub fn contract_conserved_current_fwd<T: Real, const N: usize>(
    q_in_1: &SitePropagator<T, N>,
    q_in_2: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    mu: usize,
    switch_sign: bool,
) {
    contract(q_in_1, q_in_2, q_out, gauge, site, Leg::new(mu, true), switch_sign);
}

/// Backward conserved-current contraction at `site` in direction `mu`.
/// `q_in_1` is the propagator at `site − μ̂`.
///
/// # Panics
///
/// Panics if `mu >= 4` or `site` is outside the gauge field.
pub fn contract_conserved_current_bwd<T: Real, const N: usize>(
    q_in_1: &SitePropagator<T, N>,
    q_in_2: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    mu: usize,
    switch_sign: bool,
) {
    contract(q_in_1, q_in_2, q_out, gauge, site, Leg::new(mu, false), switch_sign);
}

fn sequential<T: Real, const N: usize>(
    q_in: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    leg: Leg,
    t_mask: bool,
    switch_sign: bool,
) {
    if !t_mask {
        return;
    }
    let hopped = q_in.link_left(gauge.link(site, leg.index()));
    accumulate(q_out, wilson_current(&hopped, leg.mu(), leg.is_forward()), switch_sign);
}

/// Sequential insertion of the forward current: adds `(1 − γ_μ) U_μ q_in`
/// to `q_out` on timeslices where `t_mask` holds.
///
/// # Panics
///
/// Panics if `mu >= 4` or `site` is outside the gauge field.
pub fn seq_conserved_current_fwd<T: Real, const N: usize>(
    q_in: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    mu: usize,
    t_mask: bool,
    switch_sign: bool,
) {
    sequential(q_in, q_out, gauge, site, Leg::new(mu, true), t_mask, switch_sign);
}

/// Sequential insertion of the backward current with `(1 + γ_μ)` and the
/// backward link.
///
/// # Panics
///
/// Panics if `mu >= 4` or `site` is outside the gauge field.
pub fn seq_conserved_current_bwd<T: Real, const N: usize>(
    q_in: &SitePropagator<T, N>,
    q_out: &mut SitePropagator<T, N>,
    gauge: &DoubledGaugeField<T, N>,
    site: usize,
    mu: usize,
    t_mask: bool,
    switch_sign: bool,
) {
    sequential(q_in, q_out, gauge, site, Leg::new(mu, false), t_mask, switch_sign);
}
