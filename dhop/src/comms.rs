// SPDX-License-Identifier: AGPL-3.0-only

//! Halo exchange: filling the half-spinor buffer read by exterior legs.
//!
//! A slot holds the neighbor spinor already projected with the projector
//! of the leg that reads it, so the exchange must know whether the coming
//! pass is `Dhop` or `Dhop†`. The twist sign is not applied here; kernels
//! apply it from the stencil entry.
//!
//! [`PartitionExchange`] serves a partition from a global field held in the
//! same process, standing in for message passing between ranks.

use crate::error::DhopError;
use crate::lattice::geometry::Partition;
use crate::lattice::projection::spin_project;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::FermionField;
use crate::lattice::stencil::{HaloBuffer, Stencil};
use rayon::prelude::*;

/// Source of halo data for a stencil.
pub trait HaloExchange<T, const N: usize>: Sync {
    /// Fill every slot of `halo` for a pass with the given dagger flag.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] if the source cannot serve the
    /// stencil's halo.
    fn exchange(&self, stencil: &Stencil, dag: bool, halo: &mut HaloBuffer<T, N>)
        -> Result<(), DhopError>;
}

/// Exchange for stencils with no exterior legs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExchange;

impl<T: Real, const N: usize> HaloExchange<T, N> for NoExchange {
    fn exchange(
        &self,
        stencil: &Stencil,
        _dag: bool,
        _halo: &mut HaloBuffer<T, N>,
    ) -> Result<(), DhopError> {
        if stencil.n_halo() == 0 {
            Ok(())
        } else {
            Err(DhopError::LayoutMismatch(format!(
                "stencil has {} halo slots but no exchange source",
                stencil.n_halo()
            )))
        }
    }
}

/// Exchange from a global field over the whole lattice.
#[derive(Clone, Copy, Debug)]
pub struct PartitionExchange<'a, T, const N: usize> {
    pub global: &'a FermionField<T, N>,
}

impl<'a, T, const N: usize> PartitionExchange<'a, T, N> {
    #[must_use]
    pub const fn new(global: &'a FermionField<T, N>) -> Self {
        Self { global }
    }
}

impl<T: Real, const N: usize> HaloExchange<T, N> for PartitionExchange<'_, T, N> {
    fn exchange(
        &self,
        stencil: &Stencil,
        dag: bool,
        halo: &mut HaloBuffer<T, N>,
    ) -> Result<(), DhopError> {
        let ls = self.global.ls;
        let volume = stencil.partition().global.volume();
        if ls == 0 || self.global.nsite != volume || self.global.data.len() != volume * ls {
            return Err(DhopError::LayoutMismatch(format!(
                "exchange source has {} sites, global lattice {volume}",
                self.global.nsite
            )));
        }
        if halo.ls != ls || halo.data.len() != stencil.n_halo() * ls {
            *halo = HaloBuffer::for_stencil(stencil, ls);
        }
        let global = self.global;
        halo.data
            .par_chunks_mut(ls)
            .zip(stencil.halo_sources())
            .for_each(|(slot, src)| {
                let proj = src.leg.projector(dag);
                for (s, h) in slot.iter_mut().enumerate() {
                    *h = spin_project(proj, &global.data[src.global_site * ls + s]);
                }
            });
        Ok(())
    }
}

/// Copy of the sites of `partition` out of a global field.
///
/// # Errors
///
/// [`DhopError::LayoutMismatch`] if `global` does not cover the global
/// lattice of `partition`.
pub fn scatter_to_partition<T: Real, const N: usize>(
    global: &FermionField<T, N>,
    partition: &Partition,
) -> Result<FermionField<T, N>, DhopError> {
    if global.nsite != partition.global.volume() {
        return Err(DhopError::LayoutMismatch(format!(
            "global field has {} sites, lattice {}",
            global.nsite,
            partition.global.volume()
        )));
    }
    let ls = global.ls;
    let mut local = FermionField::zeros(partition.nsite(), ls);
    for (site, chunk) in local.data.chunks_exact_mut(ls).enumerate() {
        let g = partition.global_site(site);
        chunk.copy_from_slice(&global.data[g * ls..(g + 1) * ls]);
    }
    Ok(local)
}

/// Write the sites of a partition-local field back into a global field.
///
/// # Errors
///
/// [`DhopError::LayoutMismatch`] if the extents disagree.
pub fn gather_from_partition<T: Real, const N: usize>(
    local: &FermionField<T, N>,
    partition: &Partition,
    global: &mut FermionField<T, N>,
) -> Result<(), DhopError> {
    if local.nsite != partition.nsite()
        || global.nsite != partition.global.volume()
        || local.ls != global.ls
    {
        return Err(DhopError::LayoutMismatch(
            "local field, partition and global field disagree".into(),
        ));
    }
    let ls = local.ls;
    for (site, chunk) in local.data.chunks_exact(ls).enumerate() {
        let g = partition.global_site(site);
        global.data[g * ls..(g + 1) * ls].copy_from_slice(chunk);
    }
    Ok(())
}
