// SPDX-License-Identifier: AGPL-3.0-only

//! Gauge link storage and the doubled layout the hopping kernels read.
//!
//! [`GaugeField`] holds the forward links `U_μ(x)` of a global lattice,
//! `links[site * 4 + mu]`. [`DoubledGaugeField`] is what the stencil uses:
//! per local site, eight links in leg order,
//!
//! ```text
//! U[x][μ]     = U_μ(x)          forward hop x → x+μ̂
//! U[x][μ + 4] = U_μ(x − μ̂)†     backward hop x → x−μ̂
//! ```
//!
//! so that every leg is a single lookup. Doubling a partition reads the
//! backward links of boundary sites straight from the global field; no
//! link communication is needed afterwards.

use super::color::{ColorMatrix, Su3Matrix};
use super::constants::{HOT_START_EPSILON, N_DIM, N_LEGS};
use super::geometry::{Geometry, Partition};
use super::scalar::Real;

/// Forward gauge links on a full lattice.
#[derive(Clone, Debug)]
pub struct GaugeField<T, const N: usize> {
    pub geometry: Geometry,
    pub links: Vec<ColorMatrix<T, N>>,
}

impl<T: Real, const N: usize> GaugeField<T, N> {
    /// All links = identity (free field).
    #[must_use]
    pub fn cold_start(dims: [usize; 4]) -> Self {
        let geometry = Geometry::new(dims);
        Self {
            geometry,
            links: vec![ColorMatrix::identity(); geometry.volume() * N_DIM],
        }
    }

    /// Haar-like random U(N) links, reproducible per seed.
    #[must_use]
    pub fn random(dims: [usize; 4], seed: u64) -> Self {
        let geometry = Geometry::new(dims);
        let mut rng = seed;
        let links = (0..geometry.volume() * N_DIM)
            .map(|_| ColorMatrix::<f64, N>::random_unitary(&mut rng).cast())
            .collect();
        Self { geometry, links }
    }

    /// `U_μ(x)`
    #[must_use]
    pub fn link(&self, x: [usize; 4], mu: usize) -> ColorMatrix<T, N> {
        self.links[self.geometry.site_index(x) * N_DIM + mu]
    }

    #[must_use]
    pub fn cast<U: Real>(&self) -> GaugeField<U, N> {
        GaugeField {
            geometry: self.geometry,
            links: self.links.iter().map(ColorMatrix::cast).collect(),
        }
    }
}

impl<T: Real> GaugeField<T, 3> {
    /// Random SU(3) links near the identity (disordered configuration).
    #[must_use]
    pub fn hot_start(dims: [usize; 4], seed: u64) -> Self {
        let geometry = Geometry::new(dims);
        let mut rng = seed;
        let links = (0..geometry.volume() * N_DIM)
            .map(|_| Su3Matrix::random_near_identity(&mut rng, HOT_START_EPSILON).cast())
            .collect();
        Self { geometry, links }
    }

    /// Adjoint-representation field of an SU(2) configuration.
    #[must_use]
    pub fn su2_adjoint_of(field: &GaugeField<f64, 2>) -> Self {
        Self {
            geometry: field.geometry,
            links: field
                .links
                .iter()
                .map(|v| Su3Matrix::su2_adjoint(v).cast())
                .collect(),
        }
    }
}

/// Eight links per local site in stencil leg order.
#[derive(Clone, Debug)]
pub struct DoubledGaugeField<T, const N: usize> {
    pub nsite: usize,
    pub links: Vec<ColorMatrix<T, N>>,
}

impl<T: Real, const N: usize> DoubledGaugeField<T, N> {
    /// Double the whole lattice.
    #[must_use]
    pub fn new(field: &GaugeField<T, N>) -> Self {
        Self::for_partition(field, &Partition::whole(field.geometry.dims))
    }

    /// Double the sites of one partition of `field`.
    #[must_use]
    pub fn for_partition(field: &GaugeField<T, N>, partition: &Partition) -> Self {
        let nsite = partition.nsite();
        let mut links = Vec::with_capacity(nsite * N_LEGS);
        for site in 0..nsite {
            let g = partition.global_coords(site);
            for mu in 0..N_DIM {
                links.push(field.link(g, mu));
            }
            for mu in 0..N_DIM {
                let back = field.geometry.neighbor(g, mu, false);
                links.push(field.link(back, mu).adjoint());
            }
        }
        Self { nsite, links }
    }

    /// Link used by leg `leg` (0..8) of local site `site`.
    #[inline]
    pub fn link(&self, site: usize, leg: usize) -> &ColorMatrix<T, N> {
        &self.links[site * N_LEGS + leg]
    }

    /// Interleaved reals in device order `[site][leg][row][col][re, im]`.
    pub fn flat(&self) -> &[T] {
        bytemuck::cast_slice(&self.links)
    }

    #[must_use]
    pub fn cast<U: Real>(&self) -> DoubledGaugeField<U, N> {
        DoubledGaugeField {
            nsite: self.nsite,
            links: self.links.iter().map(ColorMatrix::cast).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_doubles_to_identity() {
        let u = GaugeField::<f64, 3>::cold_start([2, 2, 2, 2]);
        let d = DoubledGaugeField::new(&u);
        assert_eq!(d.links.len(), 16 * 8);
        assert!(d.links.iter().all(|m| *m == Su3Matrix::identity()));
    }

    #[test]
    fn backward_link_is_adjoint_of_neighbor_forward_link() {
        let u = GaugeField::<f64, 3>::hot_start([4, 2, 2, 4], 17);
        let d = DoubledGaugeField::new(&u);
        let g = u.geometry;
        for site in [0, 5, 31, 63] {
            let x = g.site_coords(site);
            for mu in 0..4 {
                assert_eq!(*d.link(site, mu), u.link(x, mu));
                let back = g.neighbor(x, mu, false);
                let expected = u.link(back, mu).adjoint();
                assert_eq!(*d.link(site, mu + 4), expected);
            }
        }
    }

    #[test]
    fn partition_doubling_matches_whole_lattice() {
        let u = GaugeField::<f64, 3>::hot_start([2, 2, 2, 4], 3);
        let whole = DoubledGaugeField::new(&u);
        let p = Partition::split([2, 2, 2, 4], [1, 1, 1, 2], [0, 0, 0, 1]).expect("split");
        let part = DoubledGaugeField::for_partition(&u, &p);
        for site in 0..p.nsite() {
            let gs = p.global_site(site);
            for leg in 0..8 {
                assert_eq!(part.link(site, leg), whole.link(gs, leg));
            }
        }
    }

    #[test]
    fn hot_start_links_are_su3() {
        let u = GaugeField::<f64, 3>::hot_start([2, 2, 2, 2], 5);
        assert!(u.links.iter().all(|m| m.unitarity_defect() < 1e-12));
    }

    #[test]
    fn random_links_are_unitary_for_su2() {
        let u = GaugeField::<f64, 2>::random([2, 2, 2, 2], 5);
        assert!(u.links.iter().all(|m| m.unitarity_defect() < 1e-12));
        let adj = GaugeField::<f64, 3>::su2_adjoint_of(&u);
        assert!(adj.links.iter().all(|m| m.unitarity_defect() < 1e-12));
    }

    #[test]
    fn flat_view_length() {
        let u = GaugeField::<f32, 3>::cold_start([2, 2, 2, 2]);
        let d = DoubledGaugeField::new(&u);
        assert_eq!(d.flat().len(), 16 * 8 * 9 * 2);
    }
}
