// SPDX-License-Identifier: AGPL-3.0-only

//! Portable hopping kernel for any color count.
//!
//! Loops over legs and colors with the projector picked at run time from
//! the leg and the dagger flag. This is the reference every other backend
//! is checked against, and the only backend for representations other
//! than the SU(3) fundamental.

use super::DhopArgs;
use crate::lattice::projection::{mult_link, spin_project, spin_recon_accum, Leg};
use crate::lattice::scalar::Real;
use crate::lattice::spinor::{HalfSpinor, Spinor};

/// Projected, twisted neighbor half-spinor on one leg, or `None` if the
/// pass excludes the leg.
#[inline]
pub fn neighbor_half_spinor<T: Real, const N: usize, const DAG: bool>(
    args: &DhopArgs<'_, T, N>,
    site: usize,
    s: usize,
    leg: Leg,
) -> Option<HalfSpinor<T, N>> {
    let entry = args.stencil.entry(site, leg.index());
    if !args.legs.includes(entry.is_local) {
        return None;
    }
    let chi = if entry.is_local {
        let ls = args.ls();
        spin_project(leg.projector(DAG), &args.input.data[entry.offset * ls + s])
    } else {
        *args.halo.get(entry.offset, s)
    };
    Some(if entry.twist { -chi } else { chi })
}

/// Hopping term at one `(site, s)`.
#[inline]
pub fn dhop_site<T: Real, const N: usize, const DAG: bool>(
    args: &DhopArgs<'_, T, N>,
    site: usize,
    s: usize,
) -> Spinor<T, N> {
    let mut result = Spinor::zero();
    for leg in Leg::ALL {
        if let Some(chi) = neighbor_half_spinor::<T, N, DAG>(args, site, s, leg) {
            let u_chi = mult_link(args.gauge.link(site, leg.index()), &chi);
            spin_recon_accum(leg.projector(DAG), &mut result, &u_chi);
        }
    }
    result
}

/// Accumulate the hopping term of the sites `first_site..` covered by `out`.
pub fn dhop_sites<T: Real, const N: usize, const DAG: bool>(
    args: &DhopArgs<'_, T, N>,
    first_site: usize,
    out: &mut [Spinor<T, N>],
) {
    let ls = args.ls();
    for (i, o) in out.iter_mut().enumerate() {
        let (site, s) = (first_site + i / ls, i % ls);
        *o = *o + dhop_site::<T, N, DAG>(args, site, s);
    }
}

/// Accumulate a single leg's contribution (one direction of the hop).
pub fn dhop_dir_sites<T: Real, const N: usize, const DAG: bool>(
    args: &DhopArgs<'_, T, N>,
    leg: Leg,
    first_site: usize,
    out: &mut [Spinor<T, N>],
) {
    let ls = args.ls();
    for (i, o) in out.iter_mut().enumerate() {
        let (site, s) = (first_site + i / ls, i % ls);
        if let Some(chi) = neighbor_half_spinor::<T, N, DAG>(args, site, s, leg) {
            let u_chi = mult_link(args.gauge.link(site, leg.index()), &chi);
            spin_recon_accum(leg.projector(DAG), o, &u_chi);
        }
    }
}
