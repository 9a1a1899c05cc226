// SPDX-License-Identifier: AGPL-3.0-only

//! Accelerator-layout hopping kernel (the `Gpu` option).
//!
//! Operands are seen exactly as a device sees them: flat arrays of reals
//! plus the `u32` stencil table, indexed by explicit stride arithmetic, one
//! logical lane per fermion index `sF`. The host executes the lanes on the
//! calling rayon worker. [`crate::gpu::WilsonDhopGpu`] runs the same lane
//! program as a WGSL compute shader over the same buffers.
//!
//! | Buffer | Layout |
//! |--------|--------|
//! | links | `[site][leg][row][col][re, im]` |
//! | offsets, flags | `[site][leg]` |
//! | input, output | `[sF][spin][color][re, im]` |
//! | halo | `[slot][s][half-spin][color][re, im]` |

use super::{DhopArgs, Legs};
use crate::lattice::color::ColorMatrix;
use crate::lattice::complex::Complex;
use crate::lattice::constants::{N_HALF_SPIN, N_LEGS, N_SPIN};
use crate::lattice::projection::{mult_link, spin_project, spin_recon_accum, Leg};
use crate::lattice::scalar::Real;
use crate::lattice::spinor::{HalfSpinor, Spinor};
use crate::lattice::stencil::{FLAG_LOCAL, FLAG_TWIST};

/// Flat operands of one pass.
#[derive(Clone, Copy)]
pub struct DeviceView<'a, T> {
    pub links: &'a [T],
    pub offsets: &'a [u32],
    pub flags: &'a [u32],
    pub input: &'a [T],
    pub halo: &'a [T],
    pub ls: usize,
    pub legs: Legs,
}

impl<'a, T: Real> DeviceView<'a, T> {
    /// Borrow the flat views of a set of kernel operands.
    pub fn new<const N: usize>(args: &DhopArgs<'a, T, N>) -> Self {
        Self {
            links: args.gauge.flat(),
            offsets: args.stencil.device_offsets(),
            flags: args.stencil.device_flags(),
            input: args.input.flat(),
            halo: args.halo.flat(),
            ls: args.input.ls,
            legs: args.legs,
        }
    }
}

#[inline]
fn load_complex<T: Real>(buf: &[T], at: usize) -> Complex<T> {
    Complex::new(buf[at], buf[at + 1])
}

#[inline]
fn load_spinor<T: Real, const N: usize>(buf: &[T], sf: usize) -> Spinor<T, N> {
    let base = sf * N_SPIN * N * 2;
    let mut r = Spinor::zero();
    for sp in 0..N_SPIN {
        for c in 0..N {
            r.s[sp][c] = load_complex(buf, base + (sp * N + c) * 2);
        }
    }
    r
}

#[inline]
fn load_half<T: Real, const N: usize>(buf: &[T], idx: usize) -> HalfSpinor<T, N> {
    let base = idx * N_HALF_SPIN * N * 2;
    let mut r = HalfSpinor::zero();
    for sp in 0..N_HALF_SPIN {
        for c in 0..N {
            r.h[sp][c] = load_complex(buf, base + (sp * N + c) * 2);
        }
    }
    r
}

#[inline]
fn load_link<T: Real, const N: usize>(buf: &[T], k: usize) -> ColorMatrix<T, N> {
    let base = k * N * N * 2;
    let mut u = ColorMatrix::zero();
    for i in 0..N {
        for j in 0..N {
            u.m[i][j] = load_complex(buf, base + (i * N + j) * 2);
        }
    }
    u
}

/// Lane program: hopping term at fermion index `sf`.
#[inline]
pub fn device_lane<T: Real, const N: usize, const DAG: bool>(
    view: &DeviceView<'_, T>,
    sf: usize,
) -> Spinor<T, N> {
    let (site, s) = (sf / view.ls, sf % view.ls);
    let mut acc = Spinor::zero();
    for leg in 0..N_LEGS {
        let k = site * N_LEGS + leg;
        let flags = view.flags[k];
        let local = flags & FLAG_LOCAL != 0;
        if !view.legs.includes(local) {
            continue;
        }
        let proj = Leg::from_index(leg).projector(DAG);
        let at = view.offsets[k] as usize * view.ls + s;
        let mut chi = if local {
            spin_project(proj, &load_spinor::<T, N>(view.input, at))
        } else {
            load_half::<T, N>(view.halo, at)
        };
        if flags & FLAG_TWIST != 0 {
            chi = -chi;
        }
        let u = load_link::<T, N>(view.links, k);
        spin_recon_accum(proj, &mut acc, &mult_link(&u, &chi));
    }
    acc
}

pub fn dhop_sites<T: Real, const N: usize, const DAG: bool>(
    args: &DhopArgs<'_, T, N>,
    first_site: usize,
    out: &mut [Spinor<T, N>],
) {
    let view = DeviceView::new(args);
    let first_sf = first_site * view.ls;
    let stride = N_SPIN * N * 2;
    let flat: &mut [T] = bytemuck::cast_slice_mut(out);
    for (lane, o) in flat.chunks_exact_mut(stride).enumerate() {
        let r = device_lane::<T, N, DAG>(&view, first_sf + lane);
        for (x, z) in o.chunks_exact_mut(2).zip(r.s.iter().flatten()) {
            x[0] = x[0] + z.re;
            x[1] = x[1] + z.im;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::spinor::FermionField;

    #[test]
    fn loads_agree_with_typed_views() {
        let f = FermionField::<f64, 3>::random(4, 2, 21);
        for sf in 0..8 {
            assert_eq!(load_spinor::<f64, 3>(f.flat(), sf), f.data[sf]);
        }
        let mut seed = 1;
        let links: Vec<ColorMatrix<f64, 3>> =
            (0..3).map(|_| ColorMatrix::random_unitary(&mut seed)).collect();
        let flat: &[f64] = bytemuck::cast_slice(&links);
        for (k, u) in links.iter().enumerate() {
            assert_eq!(load_link::<f64, 3>(flat, k), *u);
        }
    }

    #[test]
    fn half_spinor_stride() {
        let mut hs = vec![HalfSpinor::<f32, 2>::zero(); 3];
        hs[2].h[1][1] = Complex::new(5.0, 6.0);
        let flat: &[f32] = bytemuck::cast_slice(&hs);
        assert_eq!(load_half::<f32, 2>(flat, 2), hs[2]);
    }
}
