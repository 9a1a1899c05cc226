// SPDX-License-Identifier: AGPL-3.0-only

//! Stencil descriptor and half-spinor halo buffer.
//!
//! The descriptor is built once per partition and boundary condition and
//! then reused for every hopping-term evaluation. For each `(site, leg)` it
//! records whether the neighbor is local, where to read it, and whether the
//! hop crosses an antiperiodic edge:
//!
//! | `is_local` | `offset` means | read from |
//! |------------|----------------|-----------|
//! | `true` | neighbor site | `in[offset * Ls + s]`, projected by the kernel |
//! | `false` | halo slot | `halo[offset * Ls + s]`, already projected |
//!
//! Halo slots are numbered in `(site, leg)` order. Each slot remembers the
//! global site and leg it stands for so an exchange can fill it.

use super::constants::N_LEGS;
use super::geometry::{BoundaryConditions, Partition};
use super::projection::Leg;
use super::scalar::Lane;
use super::spinor::HalfSpinor;
use crate::error::DhopError;

/// Device table flag: neighbor is local.
pub const FLAG_LOCAL: u32 = 1;
/// Device table flag: multiply the hop by −1.
pub const FLAG_TWIST: u32 = 2;

/// Descriptor of one stencil leg at one site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StencilEntry {
    pub offset: usize,
    pub is_local: bool,
    pub twist: bool,
}

/// What a halo slot holds: the neighbor spinor at `global_site`, projected
/// with the projector of `leg`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HaloSource {
    pub global_site: usize,
    pub leg: Leg,
}

/// Nearest-neighbor stencil of one partition.
#[derive(Clone, Debug)]
pub struct Stencil {
    partition: Partition,
    boundary: BoundaryConditions,
    entries: Vec<StencilEntry>,
    halo: Vec<HaloSource>,
    device_offsets: Vec<u32>,
    device_flags: Vec<u32>,
}

impl Stencil {
    /// Build the descriptor for `partition`.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] if the partition is empty or too large
    /// for the `u32` device table.
    pub fn new(partition: Partition, boundary: BoundaryConditions) -> Result<Self, DhopError> {
        let nsite = partition.nsite();
        if nsite == 0 {
            return Err(DhopError::LayoutMismatch("empty partition".into()));
        }
        if nsite.saturating_mul(N_LEGS) > u32::MAX as usize {
            return Err(DhopError::LayoutMismatch(format!(
                "{nsite} sites exceed the u32 device table"
            )));
        }

        let global = partition.global;
        let mut entries = Vec::with_capacity(nsite * N_LEGS);
        let mut halo = Vec::new();
        for site in 0..nsite {
            let g = partition.global_coords(site);
            for leg in Leg::ALL {
                let (mu, forward) = (leg.mu(), leg.is_forward());
                let ng = global.neighbor(g, mu, forward);
                let twist = boundary.antiperiodic[mu] && global.wraps(g, mu, forward);
                let entry = if let Some(local) = partition.local_site(ng) {
                    StencilEntry {
                        offset: local,
                        is_local: true,
                        twist,
                    }
                } else {
                    halo.push(HaloSource {
                        global_site: global.site_index(ng),
                        leg,
                    });
                    StencilEntry {
                        offset: halo.len() - 1,
                        is_local: false,
                        twist,
                    }
                };
                entries.push(entry);
            }
        }

        let device_offsets = entries.iter().map(|e| e.offset as u32).collect();
        let device_flags = entries
            .iter()
            .map(|e| {
                let mut f = 0;
                if e.is_local {
                    f |= FLAG_LOCAL;
                }
                if e.twist {
                    f |= FLAG_TWIST;
                }
                f
            })
            .collect();

        Ok(Self {
            partition,
            boundary,
            entries,
            halo,
            device_offsets,
            device_flags,
        })
    }

    /// Stencil of a whole periodic lattice (no exterior legs).
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn periodic(dims: [usize; 4]) -> Result<Self, DhopError> {
        Self::new(Partition::whole(dims), BoundaryConditions::periodic())
    }

    #[inline]
    pub fn entry(&self, site: usize, leg: usize) -> StencilEntry {
        self.entries[site * N_LEGS + leg]
    }

    #[must_use]
    pub const fn nsite(&self) -> usize {
        self.partition.nsite()
    }

    /// Number of halo slots per 5th-dimension slice.
    #[must_use]
    pub fn n_halo(&self) -> usize {
        self.halo.len()
    }

    #[must_use]
    pub fn halo_sources(&self) -> &[HaloSource] {
        &self.halo
    }

    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    #[must_use]
    pub const fn boundary(&self) -> &BoundaryConditions {
        &self.boundary
    }

    /// Per `(site, leg)` offsets for device upload.
    #[must_use]
    pub fn device_offsets(&self) -> &[u32] {
        &self.device_offsets
    }

    /// Per `(site, leg)` [`FLAG_LOCAL`] / [`FLAG_TWIST`] bits.
    #[must_use]
    pub fn device_flags(&self) -> &[u32] {
        &self.device_flags
    }

    /// Count of `(site, leg)` pairs that need halo data.
    #[must_use]
    pub fn exterior_legs(&self) -> usize {
        self.halo.len()
    }

    /// Count of `(site, leg)` pairs read from the local field.
    #[must_use]
    pub fn interior_legs(&self) -> usize {
        self.entries.len() - self.halo.len()
    }
}

/// Received half-spinors, `data[slot * Ls + s]`.
#[derive(Clone, Debug)]
pub struct HaloBuffer<T, const N: usize> {
    pub data: Vec<HalfSpinor<T, N>>,
    pub ls: usize,
}

impl<T: Lane, const N: usize> HaloBuffer<T, N> {
    /// Zeroed buffer sized for `stencil`.
    #[must_use]
    pub fn for_stencil(stencil: &Stencil, ls: usize) -> Self {
        Self {
            data: vec![HalfSpinor::zero(); stencil.n_halo() * ls],
            ls,
        }
    }

    /// Buffer with no slots, for passes that read no halo data.
    #[must_use]
    pub const fn empty(ls: usize) -> Self {
        Self {
            data: Vec::new(),
            ls,
        }
    }

    #[must_use]
    pub fn slots(&self) -> usize {
        if self.ls == 0 {
            0
        } else {
            self.data.len() / self.ls
        }
    }

    #[inline]
    pub fn get(&self, slot: usize, s: usize) -> &HalfSpinor<T, N> {
        &self.data[slot * self.ls + s]
    }
}

impl<T: Lane + bytemuck::Pod, const N: usize> HaloBuffer<T, N> {
    /// Interleaved reals `[slot][s][spin][color][re, im]`.
    pub fn flat(&self) -> &[T] {
        bytemuck::cast_slice(&self.data)
    }
}
