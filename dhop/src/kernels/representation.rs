// SPDX-License-Identifier: AGPL-3.0-only

//! Field representations and the backends legal for each.
//!
//! The unrolled, SIMD and device kernels are written for 3×3 complex links
//! acting on 3-component color vectors: the SU(3) fundamental
//! representation. Every other representation only gets the generic
//! kernel, and this is enforced by type: a representation's option type
//! ([`Representation::Opt`]) simply has no variant for the other backends.
//!
//! ```compile_fail
//! use hotspring_dhop::kernels::{GenericOnly, KernelOpt, Su2Fundamental, WilsonKernels};
//! // SU(2) has no InlineAsm variant to pass.
//! let k = WilsonKernels::<Su2Fundamental, 2>::new(KernelOpt::InlineAsm);
//! ```
//!
//! Turning a runtime [`KernelOpt`] (from configuration) into a
//! representation's option is the one place the restriction is checked,
//! at setup, via [`OptionSet::restrict`].

use super::{device, generic, hand, simd, DhopArgs, KernelOpt};
use crate::error::DhopError;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::Spinor;
use std::fmt::Debug;

/// Backend options legal for some representation.
pub trait OptionSet: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Options in this set, in code order.
    const LEGAL: &'static [KernelOpt];

    /// Narrow a runtime option to this set.
    ///
    /// # Errors
    ///
    /// [`DhopError::UnsupportedOption`] if `opt` is not in the set.
    fn restrict(opt: KernelOpt, representation: &'static str) -> Result<Self, DhopError>;

    /// The runtime option this value stands for.
    fn widen(self) -> KernelOpt;
}

impl OptionSet for KernelOpt {
    const LEGAL: &'static [KernelOpt] = &KernelOpt::ALL;

    fn restrict(opt: KernelOpt, _representation: &'static str) -> Result<Self, DhopError> {
        Ok(opt)
    }

    fn widen(self) -> KernelOpt {
        self
    }
}

/// The option set of representations without specialized kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenericOnly {
    #[default]
    Generic,
}

impl OptionSet for GenericOnly {
    const LEGAL: &'static [KernelOpt] = &[KernelOpt::Generic];

    fn restrict(opt: KernelOpt, representation: &'static str) -> Result<Self, DhopError> {
        match opt {
            KernelOpt::Generic => Ok(Self::Generic),
            other => Err(DhopError::UnsupportedOption {
                opt: other.name(),
                representation,
            }),
        }
    }

    fn widen(self) -> KernelOpt {
        KernelOpt::Generic
    }
}

/// A gauge-group representation with `N`-component color vectors.
pub trait Representation<const N: usize>: Send + Sync + 'static {
    /// Human-readable name, e.g. `"SU(3) fundamental"`.
    const NAME: &'static str;

    /// Number of colors of the gauge group (not the vector size).
    const N_COLORS: usize;

    const IS_FUNDAMENTAL: bool;

    /// Backends legal for this representation.
    type Opt: OptionSet;

    /// Run the selected backend over `out.len() / Ls` sites starting at
    /// `first_site`, accumulating into `out`.
    fn dhop_sites<T: Real, const DAG: bool>(
        opt: Self::Opt,
        args: &DhopArgs<'_, T, N>,
        first_site: usize,
        out: &mut [Spinor<T, N>],
    );
}

/// Quarks: SU(3) fundamental, the only representation with every backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Su3Fundamental;

impl Representation<3> for Su3Fundamental {
    const NAME: &'static str = "SU(3) fundamental";
    const N_COLORS: usize = 3;
    const IS_FUNDAMENTAL: bool = true;
    type Opt = KernelOpt;

    #[inline]
    fn dhop_sites<T: Real, const DAG: bool>(
        opt: KernelOpt,
        args: &DhopArgs<'_, T, 3>,
        first_site: usize,
        out: &mut [Spinor<T, 3>],
    ) {
        match opt {
            KernelOpt::Generic => generic::dhop_sites::<T, 3, DAG>(args, first_site, out),
            KernelOpt::HandUnroll => hand::dhop_sites::<T, DAG>(args, first_site, out),
            KernelOpt::InlineAsm => simd::dhop_sites::<T, DAG>(args, first_site, out),
            KernelOpt::Gpu => device::dhop_sites::<T, 3, DAG>(args, first_site, out),
        }
    }
}

macro_rules! generic_only_representation {
    ($(#[$doc:meta])* $name:ident, $n:literal, $colors:literal, $fundamental:literal, $label:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name;

        impl Representation<$n> for $name {
            const NAME: &'static str = $label;
            const N_COLORS: usize = $colors;
            const IS_FUNDAMENTAL: bool = $fundamental;
            type Opt = GenericOnly;

            #[inline]
            fn dhop_sites<T: Real, const DAG: bool>(
                opt: GenericOnly,
                args: &DhopArgs<'_, T, $n>,
                first_site: usize,
                out: &mut [Spinor<T, $n>],
            ) {
                let GenericOnly::Generic = opt;
                generic::dhop_sites::<T, $n, DAG>(args, first_site, out);
            }
        }
    };
}

generic_only_representation!(
    /// Two-color QCD quarks.
    Su2Fundamental, 2, 2, true, "SU(2) fundamental"
);
generic_only_representation!(
    /// SU(2) adjoint fermions: 3-component vectors, but real orthogonal links.
    Su2Adjoint, 3, 2, false, "SU(2) adjoint"
);
generic_only_representation!(
    /// Four-color fundamental fermions.
    Su4Fundamental, 4, 4, true, "SU(4) fundamental"
);
