// SPDX-License-Identifier: AGPL-3.0-only

//! Lane-parallel SU(3) hopping kernel (the `InlineAsm` option).
//!
//! Sites are processed `T::LANES` at a time (4 for f64, 8 for f32) in
//! `wide` vectors. Per leg, every lane's neighbor half-spinor and link are
//! gathered into vector form, the link product and reconstruction run once
//! on the vectors through the unrolled helpers of [`super::hand`], and the
//! result is scattered back per lane.
//!
//! Lanes past the end of the range, and lanes whose leg the pass excludes,
//! carry zero half-spinors and contribute nothing.

use super::{hand, DhopArgs};
use crate::lattice::color::ColorMatrix;
use crate::lattice::complex::Complex;
use crate::lattice::projection::Leg;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::{HalfSpinor, Spinor};

/// Widest vector any [`Real`] uses.
const MAX_LANES: usize = 8;

#[inline]
fn pack<T: Real>(lanes: &[Complex<T>; MAX_LANES]) -> Complex<T::Vector> {
    Complex::new(T::gather(|l| lanes[l].re), T::gather(|l| lanes[l].im))
}

fn pack_half<T: Real>(h: &[HalfSpinor<T, 3>; MAX_LANES]) -> HalfSpinor<T::Vector, 3> {
    let mut v = HalfSpinor::zero();
    for sp in 0..2 {
        for c in 0..3 {
            v.h[sp][c] = pack::<T>(&std::array::from_fn(|l| h[l].h[sp][c]));
        }
    }
    v
}

fn pack_link<T: Real>(u: &[ColorMatrix<T, 3>; MAX_LANES]) -> ColorMatrix<T::Vector, 3> {
    let mut v = ColorMatrix::zero();
    for i in 0..3 {
        for j in 0..3 {
            v.m[i][j] = pack::<T>(&std::array::from_fn(|l| u[l].m[i][j]));
        }
    }
    v
}

fn unpack<T: Real>(v: &Spinor<T::Vector, 3>) -> [Spinor<T, 3>; MAX_LANES] {
    let mut lanes = [Spinor::zero(); MAX_LANES];
    for sp in 0..4 {
        for c in 0..3 {
            T::scatter(v.s[sp][c].re, |l, x| lanes[l].s[sp][c].re = x);
            T::scatter(v.s[sp][c].im, |l, x| lanes[l].s[sp][c].im = x);
        }
    }
    lanes
}

/// Scalar fetch of one lane's projected neighbor, unrolled projector.
#[inline]
fn neighbor<T: Real, const DAG: bool>(
    args: &DhopArgs<'_, T, 3>,
    site: usize,
    s: usize,
    leg: Leg,
) -> Option<HalfSpinor<T, 3>> {
    let entry = args.stencil.entry(site, leg.index());
    if !args.legs.includes(entry.is_local) {
        return None;
    }
    let chi = if entry.is_local {
        let psi = &args.input.data[entry.offset * args.ls() + s];
        hand::project_su3(leg.projector(DAG), psi)
    } else {
        *args.halo.get(entry.offset, s)
    };
    Some(if entry.twist { -chi } else { chi })
}

pub fn dhop_sites<T: Real, const DAG: bool>(
    args: &DhopArgs<'_, T, 3>,
    first_site: usize,
    out: &mut [Spinor<T, 3>],
) {
    debug_assert!(T::LANES <= MAX_LANES);
    let ls = args.ls();
    let nsite = out.len() / ls;
    let zero_link = ColorMatrix::<T, 3>::zero();

    for block in (0..nsite).step_by(T::LANES) {
        let active = T::LANES.min(nsite - block);
        for s in 0..ls {
            let mut acc = Spinor::<T::Vector, 3>::zero();
            for leg in Leg::ALL {
                let mut chis = [HalfSpinor::<T, 3>::zero(); MAX_LANES];
                let mut links = [zero_link; MAX_LANES];
                let mut any = false;
                for lane in 0..active {
                    let site = first_site + block + lane;
                    if let Some(chi) = neighbor::<T, DAG>(args, site, s, leg) {
                        chis[lane] = chi;
                        links[lane] = *args.gauge.link(site, leg.index());
                        any = true;
                    }
                }
                if !any {
                    continue;
                }
                let u_chi = hand::mult_su3(&pack_link(&links), &pack_half(&chis));
                hand::recon_su3(leg.projector(DAG), &mut acc, &u_chi);
            }
            for (lane, sp) in unpack::<T>(&acc).into_iter().take(active).enumerate() {
                let o = &mut out[(block + lane) * ls + s];
                *o = *o + sp;
            }
        }
    }
}
