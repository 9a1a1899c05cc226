// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice data: numbers, fields, geometry and the stencil.
//!
//! Everything the hopping kernels read or write, bottom up:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `scalar` | `Lane` / `Real`: f32, f64 and their `wide` vectors |
//! | `complex` | `Complex<T>` with WGSL twin |
//! | `color` | N×N link matrices, random SU(N) |
//! | `spinor` | spinors, half-spinors, gamma matrices, fermion fields |
//! | `projection` | `(1 ± γ_μ)` projection, link product, reconstruction |
//! | `geometry` | site indexing, partitions, boundary conditions |
//! | `gauge` | gauge field and its doubled (forward + backward) form |
//! | `stencil` | per-leg neighbor table and halo buffer |
//! | `current` | conserved-current contractions |
//!
//! # References
//!
//! - Gattringer & Lang, "Quantum Chromodynamics on the Lattice" (2010), ch. 5
//! - Boyle, Cossu, Yamaguchi, Portelli, "Grid: A next generation data
//!   parallel C++ QCD library", PoS LATTICE2015 (2016) 023

pub mod color;
pub mod complex;
/// LCG PRNG, lattice constants, and shared numerical guards.
pub mod constants;
pub mod current;
pub mod gauge;
pub mod geometry;
pub mod projection;
pub mod scalar;
pub mod spinor;
pub mod stencil;
