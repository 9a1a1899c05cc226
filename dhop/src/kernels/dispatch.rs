// SPDX-License-Identifier: AGPL-3.0-only

//! Parallel driver of the per-site backends.
//!
//! `out` is split into blocks of [`SITE_BLOCK`] sites (all `Ls` slices of
//! each site together) and each block goes to one rayon task, so every
//! `(site, s)` is written by exactly one task and no locking is needed.

use super::representation::{OptionSet, Representation};
use super::{generic, DhopArgs, KernelOpt, Legs};
use crate::config::KernelConfig;
use crate::error::DhopError;
use crate::lattice::gauge::DoubledGaugeField;
use crate::lattice::projection::Leg;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::FermionField;
use crate::lattice::stencil::{HaloBuffer, Stencil};
use rayon::prelude::*;
use std::fmt;
use std::marker::PhantomData;

/// Sites per rayon task.
pub const SITE_BLOCK: usize = 64;

/// Hopping-term kernels of representation `R` with a fixed backend.
pub struct WilsonKernels<R: Representation<N>, const N: usize> {
    opt: R::Opt,
    _rep: PhantomData<R>,
}

impl<R: Representation<N>, const N: usize> Clone for WilsonKernels<R, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Representation<N>, const N: usize> Copy for WilsonKernels<R, N> {}

impl<R: Representation<N>, const N: usize> fmt::Debug for WilsonKernels<R, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WilsonKernels")
            .field("representation", &R::NAME)
            .field("opt", &self.opt)
            .finish()
    }
}

impl<R: Representation<N>, const N: usize> WilsonKernels<R, N> {
    /// Kernels with a backend already known to be legal for `R`.
    #[must_use]
    pub const fn new(opt: R::Opt) -> Self {
        Self {
            opt,
            _rep: PhantomData,
        }
    }

    /// Kernels for a runtime option.
    ///
    /// # Errors
    ///
    /// [`DhopError::UnsupportedOption`] if `R` has no such backend.
    pub fn with_opt(opt: KernelOpt) -> Result<Self, DhopError> {
        let restricted = R::Opt::restrict(opt, R::NAME)?;
        log::debug!("{} kernels: {opt}", R::NAME);
        Ok(Self::new(restricted))
    }

    /// # Errors
    ///
    /// As [`Self::with_opt`].
    pub fn from_config(config: &KernelConfig) -> Result<Self, DhopError> {
        Self::with_opt(config.opt)
    }

    /// Kernels for the process-wide default configuration.
    ///
    /// # Errors
    ///
    /// [`KernelConfig::process_default`] errors (an unknown option code in
    /// `HOTSPRING_DHOP_KERNEL` is [`DhopError::InvalidKernelOpt`]), then as
    /// [`Self::with_opt`].
    pub fn from_process_default() -> Result<Self, DhopError> {
        Self::from_config(&KernelConfig::process_default()?)
    }

    /// Backends legal for `R`.
    #[must_use]
    pub fn legal_options() -> &'static [KernelOpt] {
        <R::Opt as OptionSet>::LEGAL
    }

    #[must_use]
    pub fn opt(&self) -> KernelOpt {
        self.opt.widen()
    }

    /// Accumulate `Dhop · input` into `out` over the legs `args.legs`.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] if the operands disagree with the
    /// stencil; `out` is untouched in that case.
    pub fn dhop_kernel<T: Real>(
        &self,
        args: &DhopArgs<'_, T, N>,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        self.run::<T, false>(args, out)
    }

    /// Accumulate `Dhop† · input` into `out`.
    ///
    /// # Errors
    ///
    /// As [`Self::dhop_kernel`].
    pub fn dhop_dag_kernel<T: Real>(
        &self,
        args: &DhopArgs<'_, T, N>,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        self.run::<T, true>(args, out)
    }

    /// [`Self::dhop_kernel`] or [`Self::dhop_dag_kernel`] by flag.
    ///
    /// # Errors
    ///
    /// As [`Self::dhop_kernel`].
    pub fn dhop<T: Real>(
        &self,
        args: &DhopArgs<'_, T, N>,
        out: &mut FermionField<T, N>,
        dag: bool,
    ) -> Result<(), DhopError> {
        if dag {
            self.run::<T, true>(args, out)
        } else {
            self.run::<T, false>(args, out)
        }
    }

    /// Accumulate a single leg's hop into `out`. Summed over all eight legs
    /// this equals the full hop. Always runs the generic backend.
    ///
    /// # Errors
    ///
    /// As [`Self::dhop_kernel`].
    pub fn dhop_dir<T: Real>(
        &self,
        args: &DhopArgs<'_, T, N>,
        leg: Leg,
        dag: bool,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        args.validate(out)?;
        let ls = args.ls();
        out.data
            .par_chunks_mut(SITE_BLOCK * ls)
            .enumerate()
            .for_each(|(block, chunk)| {
                let first = block * SITE_BLOCK;
                if dag {
                    generic::dhop_dir_sites::<T, N, true>(args, leg, first, chunk);
                } else {
                    generic::dhop_dir_sites::<T, N, false>(args, leg, first, chunk);
                }
            });
        Ok(())
    }

    fn run<T: Real, const DAG: bool>(
        &self,
        args: &DhopArgs<'_, T, N>,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        args.validate(out)?;
        let ls = args.ls();
        let opt = self.opt;
        out.data
            .par_chunks_mut(SITE_BLOCK * ls)
            .enumerate()
            .for_each(|(block, chunk)| {
                R::dhop_sites::<T, DAG>(opt, args, block * SITE_BLOCK, chunk);
            });
        Ok(())
    }
}

fn fatal<T>(e: DhopError) -> T {
    panic!("dhop kernel: {e}")
}

/// Raw entry point taking the option as an integer code and the leg
/// selection as two flags.
///
/// # Panics
///
/// On an unknown option code, an option `R` does not support,
/// `interior = exterior = false`, `(ls, nsite)` disagreeing with the
/// fields, or any other layout mismatch. These are programming errors of
/// the caller; the typed API reports them as [`DhopError`].
#[allow(clippy::too_many_arguments)]
pub fn dhop_kernel_code<R: Representation<N>, T: Real, const N: usize>(
    code: i64,
    stencil: &Stencil,
    gauge: &DoubledGaugeField<T, N>,
    halo: &HaloBuffer<T, N>,
    ls: usize,
    nsite: usize,
    input: &FermionField<T, N>,
    out: &mut FermionField<T, N>,
    interior: bool,
    exterior: bool,
    dag: bool,
) {
    let opt = KernelOpt::from_code(code).unwrap_or_else(fatal);
    let legs = Legs::from_flags(interior, exterior).unwrap_or_else(fatal);
    let kernels = WilsonKernels::<R, N>::with_opt(opt).unwrap_or_else(fatal);
    if input.ls != ls || input.nsite != nsite {
        return fatal(DhopError::LayoutMismatch(format!(
            "extents (Ls={ls}, Nsite={nsite}) but input is (Ls={}, Nsite={})",
            input.ls, input.nsite
        )));
    }
    let args = DhopArgs {
        stencil,
        gauge,
        halo,
        input,
        legs,
    };
    kernels.dhop(&args, out, dag).unwrap_or_else(fatal);
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::kernels::{Su2Fundamental, Su3Fundamental};
    use crate::lattice::gauge::GaugeField;

    struct Setup {
        stencil: Stencil,
        gauge: DoubledGaugeField<f64, 3>,
        halo: HaloBuffer<f64, 3>,
        input: FermionField<f64, 3>,
    }

    // 4x4x4x6 has 384 sites: six full blocks, exercising the block offsets.
    fn setup(ls: usize) -> Setup {
        let dims = [4, 4, 4, 6];
        let stencil = Stencil::periodic(dims).expect("stencil");
        let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 5));
        Setup {
            input: FermionField::random(stencil.nsite(), ls, 6),
            halo: HaloBuffer::empty(ls),
            stencil,
            gauge,
        }
    }

    impl Setup {
        fn args(&self) -> DhopArgs<'_, f64, 3> {
            DhopArgs {
                stencil: &self.stencil,
                gauge: &self.gauge,
                halo: &self.halo,
                input: &self.input,
                legs: Legs::All,
            }
        }
    }

    #[test]
    fn parallel_blocks_match_serial_generic() {
        let s = setup(2);
        let k = WilsonKernels::<Su3Fundamental, 3>::new(KernelOpt::Generic);
        let mut par = FermionField::zeros(s.stencil.nsite(), 2);
        k.dhop_kernel(&s.args(), &mut par).expect("dhop");
        let mut serial = FermionField::zeros(s.stencil.nsite(), 2);
        generic::dhop_sites::<f64, 3, false>(&s.args(), 0, &mut serial.data);
        assert_eq!(par, serial);
    }

    #[test]
    fn dir_legs_sum_to_full_hop() {
        let s = setup(1);
        let k = WilsonKernels::<Su3Fundamental, 3>::new(KernelOpt::HandUnroll);
        for dag in [false, true] {
            let mut full = FermionField::zeros(s.stencil.nsite(), 1);
            k.dhop(&s.args(), &mut full, dag).expect("dhop");
            let mut summed = FermionField::zeros(s.stencil.nsite(), 1);
            for leg in Leg::ALL {
                k.dhop_dir(&s.args(), leg, dag, &mut summed).expect("dir");
            }
            assert!(summed.relative_distance(&full) < 1e-14, "dag={dag}");
        }
    }

    #[test]
    fn layout_mismatch_leaves_output_untouched() {
        let s = setup(1);
        let k = WilsonKernels::<Su3Fundamental, 3>::new(KernelOpt::Gpu);
        let mut wrong = FermionField::random(10, 1, 1);
        let before = wrong.clone();
        let err = k.dhop_kernel(&s.args(), &mut wrong).unwrap_err();
        assert!(matches!(err, DhopError::LayoutMismatch(_)));
        assert_eq!(wrong, before);
    }

    #[test]
    fn with_opt_restricts_by_representation() {
        assert!(WilsonKernels::<Su3Fundamental, 3>::with_opt(KernelOpt::InlineAsm).is_ok());
        assert!(matches!(
            WilsonKernels::<Su2Fundamental, 2>::with_opt(KernelOpt::HandUnroll),
            Err(DhopError::UnsupportedOption { .. })
        ));
        assert_eq!(WilsonKernels::<Su2Fundamental, 2>::legal_options(), &[KernelOpt::Generic]);
        assert_eq!(WilsonKernels::<Su3Fundamental, 3>::legal_options().len(), 4);
    }

    #[test]
    #[should_panic(expected = "Invalid kernel option code 9")]
    fn raw_entry_panics_on_bad_code() {
        let s = setup(1);
        let mut out = FermionField::zeros(s.stencil.nsite(), 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            9, &s.stencil, &s.gauge, &s.halo, 1, s.stencil.nsite(), &s.input, &mut out, true,
            true, false,
        );
    }

    #[test]
    #[should_panic(expected = "interior=0 and exterior=0")]
    fn raw_entry_panics_on_empty_leg_selection() {
        let s = setup(1);
        let mut out = FermionField::zeros(s.stencil.nsite(), 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            0, &s.stencil, &s.gauge, &s.halo, 1, s.stencil.nsite(), &s.input, &mut out, false,
            false, false,
        );
    }

    #[test]
    fn raw_entry_accumulates() {
        let s = setup(1);
        let n = s.stencil.nsite();
        let mut a = FermionField::zeros(n, 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            1, &s.stencil, &s.gauge, &s.halo, 1, n, &s.input, &mut a, true, true, true,
        );
        let mut b = FermionField::zeros(n, 1);
        WilsonKernels::<Su3Fundamental, 3>::new(KernelOpt::HandUnroll)
            .dhop_dag_kernel(&s.args(), &mut b)
            .expect("dag");
        assert_eq!(a, b);
    }
}
