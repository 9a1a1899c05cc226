// SPDX-License-Identifier: AGPL-3.0-only

//! hotSpring Dhop: Wilson-Dirac hopping kernels
//!
//! The hopping term of the Wilson fermion matrix on a 4D lattice (with an
//! optional 5th dimension of extent `Ls`), behind a runtime-selectable
//! kernel backend and a halo-exchange overlap policy.
//!
//! ## Modules
//!   - `lattice`: complex numbers, SU(N) links, spinors, geometry, stencil,
//!     conserved-current contractions
//!   - `kernels`: generic, hand-unrolled, SIMD and device-layout kernels
//!     plus the dispatcher
//!   - `comms`: halo exchange and partition scatter/gather
//!   - `operator`: interior/exterior driver and the Wilson matrix
//!   - `config`: kernel option and comms policy from env or JSON
//!   - `gpu`: f64 WGSL hopping shader on wgpu
//!   - `tolerances`, `validation`: thresholds and the check harness
//!
//! ## Binaries
//!   - `validate_wilson_kernels`: backend parity, decomposition, dagger
//!     and free-field checks, exit 0/1
//!   - `bench_dhop_kernels`: per-backend throughput, optional JSON report

pub mod comms;
pub mod config;
pub mod error;
pub mod gpu;
pub mod kernels;
pub mod lattice;
pub mod operator;
pub mod tolerances;
pub mod validation;
