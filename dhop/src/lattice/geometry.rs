// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice shapes, site indexing, and partitions of a global lattice.
//!
//! Sites are linearized with z fastest and t slowest:
//! `idx = t*NxNyNz + x*NyNz + y*Nz + z` for `dims = [Nx, Ny, Nz, Nt]`.
//!
//! A [`Partition`] is a rectangular block of a periodic global lattice, the
//! unit of work a single process owns. Hops that leave the block are the
//! exterior legs of the stencil.

use crate::error::DhopError;
use serde::{Deserialize, Serialize};

/// Extents of a 4D lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub dims: [usize; 4],
}

impl Geometry {
    #[must_use]
    pub const fn new(dims: [usize; 4]) -> Self {
        Self { dims }
    }

    /// Total number of sites.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2] * self.dims[3]
    }

    /// Linear index of `x = [x, y, z, t]`.
    #[must_use]
    pub const fn site_index(&self, x: [usize; 4]) -> usize {
        x[3] * (self.dims[0] * self.dims[1] * self.dims[2])
            + x[0] * (self.dims[1] * self.dims[2])
            + x[1] * self.dims[2]
            + x[2]
    }

    /// Inverse of [`Self::site_index`].
    #[must_use]
    pub const fn site_coords(&self, idx: usize) -> [usize; 4] {
        let nxyz = self.dims[0] * self.dims[1] * self.dims[2];
        let t = idx / nxyz;
        let rem = idx % nxyz;
        let x0 = rem / (self.dims[1] * self.dims[2]);
        let rem2 = rem % (self.dims[1] * self.dims[2]);
        [x0, rem2 / self.dims[2], rem2 % self.dims[2], t]
    }

    /// Periodic neighbor in direction `mu`.
    #[must_use]
    pub const fn neighbor(&self, x: [usize; 4], mu: usize, forward: bool) -> [usize; 4] {
        let mut y = x;
        if forward {
            y[mu] = (x[mu] + 1) % self.dims[mu];
        } else {
            y[mu] = (x[mu] + self.dims[mu] - 1) % self.dims[mu];
        }
        y
    }

    /// Whether the hop from `x` along `mu` wraps around the lattice edge.
    #[must_use]
    pub const fn wraps(&self, x: [usize; 4], mu: usize, forward: bool) -> bool {
        if forward {
            x[mu] + 1 == self.dims[mu]
        } else {
            x[mu] == 0
        }
    }
}

/// Fermion boundary conditions per direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundaryConditions {
    /// `true` flips the sign of hops across the global edge in that direction.
    pub antiperiodic: [bool; 4],
}

impl BoundaryConditions {
    #[must_use]
    pub const fn periodic() -> Self {
        Self {
            antiperiodic: [false; 4],
        }
    }

    /// Periodic in space, antiperiodic in time (thermal fermions).
    #[must_use]
    pub const fn antiperiodic_time() -> Self {
        Self {
            antiperiodic: [false, false, false, true],
        }
    }
}

/// A rectangular block `[origin, origin + local)` of a global lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub global: Geometry,
    pub local: Geometry,
    pub origin: [usize; 4],
}

impl Partition {
    /// The whole lattice as a single partition: every leg is interior.
    #[must_use]
    pub const fn whole(dims: [usize; 4]) -> Self {
        Self {
            global: Geometry::new(dims),
            local: Geometry::new(dims),
            origin: [0; 4],
        }
    }

    /// Block `rank` of a regular `splits[0] × … × splits[3]` decomposition.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] if a split is zero or does not divide
    /// the global extent, or `rank` lies outside the process grid.
    pub fn split(
        global: [usize; 4],
        splits: [usize; 4],
        rank: [usize; 4],
    ) -> Result<Self, DhopError> {
        let mut local = [0; 4];
        let mut origin = [0; 4];
        for mu in 0..4 {
            if splits[mu] == 0 || global[mu] % splits[mu] != 0 {
                return Err(DhopError::LayoutMismatch(format!(
                    "direction {mu}: {} sites do not split into {} blocks",
                    global[mu], splits[mu]
                )));
            }
            if rank[mu] >= splits[mu] {
                return Err(DhopError::LayoutMismatch(format!(
                    "direction {mu}: rank coordinate {} outside {} blocks",
                    rank[mu], splits[mu]
                )));
            }
            local[mu] = global[mu] / splits[mu];
            origin[mu] = rank[mu] * local[mu];
        }
        Ok(Self {
            global: Geometry::new(global),
            local: Geometry::new(local),
            origin,
        })
    }

    /// Local sites owned by this partition.
    #[must_use]
    pub const fn nsite(&self) -> usize {
        self.local.volume()
    }

    /// Global coordinates of a local site.
    #[must_use]
    pub const fn global_coords(&self, local_site: usize) -> [usize; 4] {
        let x = self.local.site_coords(local_site);
        [
            x[0] + self.origin[0],
            x[1] + self.origin[1],
            x[2] + self.origin[2],
            x[3] + self.origin[3],
        ]
    }

    /// Global site index of a local site.
    #[must_use]
    pub const fn global_site(&self, local_site: usize) -> usize {
        self.global.site_index(self.global_coords(local_site))
    }

    /// Local index of global coordinates, if this partition owns them.
    #[must_use]
    pub fn local_site(&self, g: [usize; 4]) -> Option<usize> {
        let mut x = [0; 4];
        for mu in 0..4 {
            let rel = g[mu].checked_sub(self.origin[mu])?;
            if rel >= self.local.dims[mu] {
                return None;
            }
            x[mu] = rel;
        }
        Some(self.local.site_index(x))
    }

    /// Whether the lattice is cut in direction `mu`.
    #[must_use]
    pub const fn is_split(&self, mu: usize) -> bool {
        self.local.dims[mu] < self.global.dims[mu]
    }
}
