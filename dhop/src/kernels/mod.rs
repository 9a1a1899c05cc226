// SPDX-License-Identifier: AGPL-3.0-only

//! Wilson hopping-term kernels and their dispatcher.
//!
//! ```text
//! out[site*Ls + s] += Σ_legs  recon_P( U[site][leg] · P ψ(neighbor) )
//! ```
//!
//! with `P = 1 − γ_μ` on forward legs and `1 + γ_μ` on backward legs
//! (swapped for the dagger). Four backends compute exactly this:
//!
//! | Option | Module | Representations | Strategy |
//! |--------|--------|-----------------|----------|
//! | `Generic` | `generic` | any N | loops over legs and colors |
//! | `HandUnroll` | `hand` | SU(3) fundamental | unrolled color algebra |
//! | `InlineAsm` | `simd` | SU(3) fundamental | `wide` vectors over sites |
//! | `Gpu` | `device` | SU(3) fundamental | flat device layout, one lane per `sF` |
//!
//! The dispatcher ([`WilsonKernels`]) splits the site range across rayon
//! workers; each worker owns a disjoint slice of `out`. Backends process a
//! contiguous range of sites for all `Ls` slices, and always accumulate.

pub mod device;
pub mod dispatch;
pub mod generic;
pub mod hand;
pub mod representation;
pub mod simd;

pub use dispatch::{dhop_kernel_code, WilsonKernels};
pub use representation::{
    GenericOnly, Representation, Su2Adjoint, Su2Fundamental, Su3Fundamental, Su4Fundamental,
};

use crate::error::DhopError;
use crate::lattice::gauge::DoubledGaugeField;
use crate::lattice::spinor::FermionField;
use crate::lattice::stencil::{HaloBuffer, Stencil};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend implementation of the per-site kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelOpt {
    Generic = 0,
    HandUnroll = 1,
    InlineAsm = 2,
    Gpu = 3,
}

impl KernelOpt {
    pub const ALL: [Self; 4] = [Self::Generic, Self::HandUnroll, Self::InlineAsm, Self::Gpu];

    /// Wire code of the option.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Option for a raw code.
    ///
    /// # Errors
    ///
    /// [`DhopError::InvalidKernelOpt`] for codes outside 0..=3.
    pub const fn from_code(code: i64) -> Result<Self, DhopError> {
        match code {
            0 => Ok(Self::Generic),
            1 => Ok(Self::HandUnroll),
            2 => Ok(Self::InlineAsm),
            3 => Ok(Self::Gpu),
            _ => Err(DhopError::InvalidKernelOpt(code)),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::HandUnroll => "HandUnroll",
            Self::InlineAsm => "InlineAsm",
            Self::Gpu => "Gpu",
        }
    }
}

impl fmt::Display for KernelOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelOpt {
    type Err = DhopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        match key.as_str() {
            "generic" => Ok(Self::Generic),
            "hand" | "handunroll" => Ok(Self::HandUnroll),
            "asm" | "inlineasm" | "simd" => Ok(Self::InlineAsm),
            "gpu" | "device" => Ok(Self::Gpu),
            other => other
                .parse::<i64>()
                .map_err(|_| DhopError::Config(format!("unknown kernel option '{s}'")))
                .and_then(Self::from_code),
        }
    }
}

/// Whether halo exchange overlaps the interior pass.
///
/// Read by the driver ([`crate::operator::WilsonOperator`]), never by a
/// per-site kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommsPolicy {
    /// Exchange concurrently with the interior pass, then run the exterior.
    #[default]
    CommsAndCompute = 0,
    /// Exchange first, then compute.
    CommsThenCompute = 1,
}

impl CommsPolicy {
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// # Errors
    ///
    /// [`DhopError::InvalidCommsPolicy`] for codes other than 0 and 1.
    pub const fn from_code(code: i64) -> Result<Self, DhopError> {
        match code {
            0 => Ok(Self::CommsAndCompute),
            1 => Ok(Self::CommsThenCompute),
            _ => Err(DhopError::InvalidCommsPolicy(code)),
        }
    }
}

impl fmt::Display for CommsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommsAndCompute => f.write_str("CommsAndCompute"),
            Self::CommsThenCompute => f.write_str("CommsThenCompute"),
        }
    }
}

impl FromStr for CommsPolicy {
    type Err = DhopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        match key.as_str() {
            "commsandcompute" | "overlap" => Ok(Self::CommsAndCompute),
            "commsthencompute" | "sequential" => Ok(Self::CommsThenCompute),
            other => other
                .parse::<i64>()
                .map_err(|_| DhopError::Config(format!("unknown comms policy '{s}'")))
                .and_then(Self::from_code),
        }
    }
}

/// Subset of stencil legs a pass includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Legs {
    /// Local and halo legs.
    All,
    /// Legs whose neighbor is in the local partition.
    Interior,
    /// Legs that read the halo buffer.
    Exterior,
}

impl Legs {
    /// Leg selection for the `interior` / `exterior` flag pair.
    ///
    /// # Errors
    ///
    /// [`DhopError::EmptyLegSelection`] for `(false, false)`.
    pub const fn from_flags(interior: bool, exterior: bool) -> Result<Self, DhopError> {
        match (interior, exterior) {
            (true, true) => Ok(Self::All),
            (true, false) => Ok(Self::Interior),
            (false, true) => Ok(Self::Exterior),
            (false, false) => Err(DhopError::EmptyLegSelection),
        }
    }

    /// Whether a leg with this locality is part of the pass.
    #[inline]
    pub const fn includes(self, is_local: bool) -> bool {
        match self {
            Self::All => true,
            Self::Interior => is_local,
            Self::Exterior => !is_local,
        }
    }

    /// Whether the pass reads the halo buffer.
    #[inline]
    pub const fn reads_halo(self) -> bool {
        !matches!(self, Self::Interior)
    }
}

/// Read-only operands of one hopping-term evaluation.
#[derive(Clone, Copy)]
pub struct DhopArgs<'a, T, const N: usize> {
    pub stencil: &'a Stencil,
    pub gauge: &'a DoubledGaugeField<T, N>,
    pub halo: &'a HaloBuffer<T, N>,
    pub input: &'a FermionField<T, N>,
    pub legs: Legs,
}

impl<T, const N: usize> DhopArgs<'_, T, N> {
    /// 5th-dimension extent.
    #[inline]
    pub fn ls(&self) -> usize {
        self.input.ls
    }

    /// Check that every operand matches the stencil geometry.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] naming the first disagreement.
    pub fn validate(&self, out: &FermionField<T, N>) -> Result<(), DhopError> {
        let nsite = self.stencil.nsite();
        let ls = self.input.ls;
        let mismatch = |what: String| Err(DhopError::LayoutMismatch(what));
        if ls == 0 {
            return mismatch("Ls = 0".into());
        }
        if self.input.nsite != nsite || self.input.data.len() != nsite * ls {
            return mismatch(format!(
                "input holds {} spinors, stencil needs {nsite} x {ls}",
                self.input.data.len()
            ));
        }
        if out.nsite != nsite || out.ls != ls || out.data.len() != nsite * ls {
            return mismatch(format!(
                "output holds {} spinors, stencil needs {nsite} x {ls}",
                out.data.len()
            ));
        }
        if self.gauge.nsite != nsite {
            return mismatch(format!(
                "gauge field has {} sites, stencil {nsite}",
                self.gauge.nsite
            ));
        }
        if self.legs.reads_halo() {
            let needed = self.stencil.n_halo() * ls;
            if self.halo.ls != ls || self.halo.data.len() != needed {
                return mismatch(format!(
                    "halo holds {} half-spinors, stencil needs {needed}",
                    self.halo.data.len()
                ));
            }
        }
        Ok(())
    }
}
