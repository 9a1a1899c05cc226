// SPDX-License-Identifier: AGPL-3.0-only

//! Hand-unrolled SU(3) hopping kernel.
//!
//! Colors are unrolled by `unroll3!`, the 3×3 link product is written out,
//! and each leg calls its own projector and reconstructor, chosen at
//! compile time by the dagger flag. Every helper is generic over [`Lane`]
//! so the SIMD backend runs the same arithmetic on `wide` vectors.
//!
//! The operation order matches `lattice::projection` exactly, so the
//! results agree with the generic kernel bit for bit.

use super::DhopArgs;
use crate::lattice::color::ColorMatrix;
use crate::lattice::projection::{Leg, Projector};
use crate::lattice::scalar::{Lane, Real};
use crate::lattice::spinor::{HalfSpinor, Spinor};

macro_rules! unroll3 {
    ($c:ident => $body:block) => {{
        {
            let $c = 0usize;
            $body
        }
        {
            let $c = 1usize;
            $body
        }
        {
            let $c = 2usize;
            $body
        }
    }};
}

macro_rules! projector {
    (
        $proj:ident, $recon:ident,
        |$p:ident, $c:ident| ($h0:expr, $h1:expr),
        |$a:ident, $b:ident| ($r2:expr, $r3:expr)
    ) => {
        #[inline(always)]
        pub fn $proj<L: Lane>(psi: &Spinor<L, 3>) -> HalfSpinor<L, 3> {
            let $p = &psi.s;
            let mut h = HalfSpinor::zero();
            unroll3!($c => {
                h.h[0][$c] = $h0;
                h.h[1][$c] = $h1;
            });
            h
        }

        #[inline(always)]
        pub fn $recon<L: Lane>(acc: &mut Spinor<L, 3>, h: &HalfSpinor<L, 3>) {
            unroll3!(c => {
                let ($a, $b) = (h.h[0][c], h.h[1][c]);
                acc.s[0][c] += $a;
                acc.s[1][c] += $b;
                acc.s[2][c] += $r2;
                acc.s[3][c] += $r3;
            });
        }
    };
}

projector!(proj_x_plus, recon_x_plus,
    |p, c| (p[0][c] + p[3][c].mul_i(), p[1][c] + p[2][c].mul_i()),
    |h0, h1| (h1.mul_minus_i(), h0.mul_minus_i()));
projector!(proj_x_minus, recon_x_minus,
    |p, c| (p[0][c] - p[3][c].mul_i(), p[1][c] - p[2][c].mul_i()),
    |h0, h1| (h1.mul_i(), h0.mul_i()));
projector!(proj_y_plus, recon_y_plus,
    |p, c| (p[0][c] - p[3][c], p[1][c] + p[2][c]),
    |h0, h1| (h1, -h0));
projector!(proj_y_minus, recon_y_minus,
    |p, c| (p[0][c] + p[3][c], p[1][c] - p[2][c]),
    |h0, h1| (-h1, h0));
projector!(proj_z_plus, recon_z_plus,
    |p, c| (p[0][c] + p[2][c].mul_i(), p[1][c] - p[3][c].mul_i()),
    |h0, h1| (h0.mul_minus_i(), h1.mul_i()));
projector!(proj_z_minus, recon_z_minus,
    |p, c| (p[0][c] - p[2][c].mul_i(), p[1][c] + p[3][c].mul_i()),
    |h0, h1| (h0.mul_i(), h1.mul_minus_i()));
projector!(proj_t_plus, recon_t_plus,
    |p, c| (p[0][c] + p[2][c], p[1][c] + p[3][c]),
    |h0, h1| (h0, h1));
projector!(proj_t_minus, recon_t_minus,
    |p, c| (p[0][c] - p[2][c], p[1][c] - p[3][c]),
    |h0, h1| (-h0, -h1));

/// `U · χ` for a 3×3 link, fully written out.
#[inline(always)]
pub fn mult_su3<L: Lane>(u: &ColorMatrix<L, 3>, chi: &HalfSpinor<L, 3>) -> HalfSpinor<L, 3> {
    let m = &u.m;
    let [a, b] = &chi.h;
    let mut r = HalfSpinor::zero();
    r.h[0][0] = r.h[0][0] + m[0][0] * a[0] + m[0][1] * a[1] + m[0][2] * a[2];
    r.h[0][1] = r.h[0][1] + m[1][0] * a[0] + m[1][1] * a[1] + m[1][2] * a[2];
    r.h[0][2] = r.h[0][2] + m[2][0] * a[0] + m[2][1] * a[1] + m[2][2] * a[2];
    r.h[1][0] = r.h[1][0] + m[0][0] * b[0] + m[0][1] * b[1] + m[0][2] * b[2];
    r.h[1][1] = r.h[1][1] + m[1][0] * b[0] + m[1][1] * b[1] + m[1][2] * b[2];
    r.h[1][2] = r.h[1][2] + m[2][0] * b[0] + m[2][1] * b[1] + m[2][2] * b[2];
    r
}

/// Unrolled projection for a run-time projector.
#[inline(always)]
pub fn project_su3<L: Lane>(proj: Projector, psi: &Spinor<L, 3>) -> HalfSpinor<L, 3> {
    match proj {
        Projector::XPlus => proj_x_plus(psi),
        Projector::XMinus => proj_x_minus(psi),
        Projector::YPlus => proj_y_plus(psi),
        Projector::YMinus => proj_y_minus(psi),
        Projector::ZPlus => proj_z_plus(psi),
        Projector::ZMinus => proj_z_minus(psi),
        Projector::TPlus => proj_t_plus(psi),
        Projector::TMinus => proj_t_minus(psi),
    }
}

/// Unrolled reconstruction for a run-time projector.
#[inline(always)]
pub fn recon_su3<L: Lane>(proj: Projector, acc: &mut Spinor<L, 3>, h: &HalfSpinor<L, 3>) {
    match proj {
        Projector::XPlus => recon_x_plus(acc, h),
        Projector::XMinus => recon_x_minus(acc, h),
        Projector::YPlus => recon_y_plus(acc, h),
        Projector::YMinus => recon_y_minus(acc, h),
        Projector::ZPlus => recon_z_plus(acc, h),
        Projector::ZMinus => recon_z_minus(acc, h),
        Projector::TPlus => recon_t_plus(acc, h),
        Projector::TMinus => recon_t_minus(acc, h),
    }
}

macro_rules! hand_leg {
    ($args:ident, $site:ident, $s:ident, $acc:ident, $dag:ident, $leg:expr,
     fwd: ($fp:ident, $fr:ident), dag: ($dp:ident, $dr:ident)) => {{
        let leg: Leg = $leg;
        let entry = $args.stencil.entry($site, leg.index());
        if $args.legs.includes(entry.is_local) {
            let mut chi = if entry.is_local {
                let psi = &$args.input.data[entry.offset * $args.ls() + $s];
                if $dag {
                    $dp(psi)
                } else {
                    $fp(psi)
                }
            } else {
                *$args.halo.get(entry.offset, $s)
            };
            if entry.twist {
                chi = -chi;
            }
            let u_chi = mult_su3($args.gauge.link($site, leg.index()), &chi);
            if $dag {
                $dr(&mut $acc, &u_chi);
            } else {
                $fr(&mut $acc, &u_chi);
            }
        }
    }};
}

/// Hopping term at one `(site, s)`, all eight legs written out.
#[inline]
pub fn dhop_site<T: Real, const DAG: bool>(
    args: &DhopArgs<'_, T, 3>,
    site: usize,
    s: usize,
) -> Spinor<T, 3> {
    let mut acc = Spinor::zero();
    hand_leg!(args, site, s, acc, DAG, Leg::Xp,
        fwd: (proj_x_minus, recon_x_minus), dag: (proj_x_plus, recon_x_plus));
    hand_leg!(args, site, s, acc, DAG, Leg::Yp,
        fwd: (proj_y_minus, recon_y_minus), dag: (proj_y_plus, recon_y_plus));
    hand_leg!(args, site, s, acc, DAG, Leg::Zp,
        fwd: (proj_z_minus, recon_z_minus), dag: (proj_z_plus, recon_z_plus));
    hand_leg!(args, site, s, acc, DAG, Leg::Tp,
        fwd: (proj_t_minus, recon_t_minus), dag: (proj_t_plus, recon_t_plus));
    hand_leg!(args, site, s, acc, DAG, Leg::Xm,
        fwd: (proj_x_plus, recon_x_plus), dag: (proj_x_minus, recon_x_minus));
    hand_leg!(args, site, s, acc, DAG, Leg::Ym,
        fwd: (proj_y_plus, recon_y_plus), dag: (proj_y_minus, recon_y_minus));
    hand_leg!(args, site, s, acc, DAG, Leg::Zm,
        fwd: (proj_z_plus, recon_z_plus), dag: (proj_z_minus, recon_z_minus));
    hand_leg!(args, site, s, acc, DAG, Leg::Tm,
        fwd: (proj_t_plus, recon_t_plus), dag: (proj_t_minus, recon_t_minus));
    acc
}

pub fn dhop_sites<T: Real, const DAG: bool>(
    args: &DhopArgs<'_, T, 3>,
    first_site: usize,
    out: &mut [Spinor<T, 3>],
) {
    let ls = args.ls();
    for (i, o) in out.iter_mut().enumerate() {
        let (site, s) = (first_site + i / ls, i % ls);
        *o = *o + dhop_site::<T, DAG>(args, site, s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::color::Su3Matrix;
    use crate::lattice::projection::{mult_link, spin_project, spin_recon_accum, Leg};
    use crate::lattice::spinor::FermionField;

    #[test]
    fn unrolled_projectors_match_generic() {
        let psi = FermionField::<f64, 3>::random(1, 1, 77).data[0];
        for leg in Leg::ALL {
            for dag in [false, true] {
                let proj = leg.projector(dag);
                assert_eq!(project_su3(proj, &psi), spin_project(proj, &psi));
                let h = spin_project(proj, &psi);
                let mut a = psi;
                let mut b = psi;
                recon_su3(proj, &mut a, &h);
                spin_recon_accum(proj, &mut b, &h);
                assert_eq!(a, b, "{proj:?}");
            }
        }
    }

    #[test]
    fn unrolled_link_product_matches_generic() {
        let mut seed = 19;
        let u = Su3Matrix::random_near_identity(&mut seed, 1.0);
        let psi = FermionField::<f64, 3>::random(1, 1, 4).data[0];
        let chi = spin_project(Projector::ZMinus, &psi);
        let a = mult_su3(&u, &chi);
        let b = mult_link(&u, &chi);
        for s in 0..2 {
            for c in 0..3 {
                assert!((a.h[s][c] - b.h[s][c]).abs_sq() < 1e-30);
            }
        }
    }
}
