// SPDX-License-Identifier: AGPL-3.0-only

//! Wilson operator driver: halo exchange, interior and exterior passes.
//!
//! ```text
//! M ψ = (4 + m) ψ − ½ Dhop ψ
//! ```
//!
//! [`WilsonOperator::dhop`] zeroes `out` and then lets the kernels
//! accumulate into it. The comms policy decides how the exchange and the
//! interior pass are ordered:
//!
//! | Policy | Order |
//! |--------|-------|
//! | `CommsAndCompute` | `rayon::join(exchange, interior)`, then exterior |
//! | `CommsThenCompute` | exchange, interior, exterior |
//!
//! On a stencil without halo slots the exterior pass is skipped.

use crate::comms::HaloExchange;
use crate::config::KernelConfig;
use crate::error::DhopError;
use crate::kernels::{CommsPolicy, DhopArgs, Legs, Representation, WilsonKernels};
use crate::lattice::complex::Complex;
use crate::lattice::gauge::DoubledGaugeField;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::FermionField;
use crate::lattice::stencil::{HaloBuffer, Stencil};

/// Wilson fermion matrix on one partition.
pub struct WilsonOperator<R: Representation<N>, T, const N: usize> {
    kernels: WilsonKernels<R, N>,
    comms: CommsPolicy,
    stencil: Stencil,
    gauge: DoubledGaugeField<T, N>,
    halo: HaloBuffer<T, N>,
    mass: f64,
}

impl<R: Representation<N>, T: Real, const N: usize> WilsonOperator<R, T, N> {
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] if the gauge field does not cover the
    /// stencil's partition.
    pub fn new(
        kernels: WilsonKernels<R, N>,
        comms: CommsPolicy,
        stencil: Stencil,
        gauge: DoubledGaugeField<T, N>,
        mass: f64,
    ) -> Result<Self, DhopError> {
        if gauge.nsite != stencil.nsite() {
            return Err(DhopError::LayoutMismatch(format!(
                "gauge field has {} sites, stencil {}",
                gauge.nsite,
                stencil.nsite()
            )));
        }
        log::debug!(
            "{} Wilson operator: {} / {comms}, {} interior and {} exterior legs",
            R::NAME,
            kernels.opt(),
            stencil.interior_legs(),
            stencil.exterior_legs()
        );
        Ok(Self {
            kernels,
            comms,
            halo: HaloBuffer::for_stencil(&stencil, 1),
            stencil,
            gauge,
            mass,
        })
    }

    /// # Errors
    ///
    /// [`DhopError::UnsupportedOption`] if `config.opt` is illegal for `R`,
    /// or as [`Self::new`].
    pub fn from_config(
        config: &KernelConfig,
        stencil: Stencil,
        gauge: DoubledGaugeField<T, N>,
        mass: f64,
    ) -> Result<Self, DhopError> {
        let kernels = WilsonKernels::from_config(config)?;
        Self::new(kernels, config.comms, stencil, gauge, mass)
    }

    #[must_use]
    pub const fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    #[must_use]
    pub const fn kernels(&self) -> &WilsonKernels<R, N> {
        &self.kernels
    }

    #[must_use]
    pub const fn comms(&self) -> CommsPolicy {
        self.comms
    }

    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// `out = Dhop · input` (or `Dhop† · input`).
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] from the exchange or the kernels. If a
    /// pass fails after the interior legs were accumulated (the exchange of
    /// [`CommsPolicy::CommsAndCompute`] runs alongside them), `out` is
    /// zeroed again before the error is returned.
    pub fn dhop(
        &mut self,
        exchange: &impl HaloExchange<T, N>,
        input: &FermionField<T, N>,
        out: &mut FermionField<T, N>,
        dag: bool,
    ) -> Result<(), DhopError> {
        let ls = input.ls;
        if self.halo.ls != ls {
            self.halo = HaloBuffer::for_stencil(&self.stencil, ls);
        }
        let kernels = self.kernels;
        let stencil = &self.stencil;
        let gauge = &self.gauge;
        let halo = &mut self.halo;
        let no_halo = HaloBuffer::empty(ls);
        let interior = DhopArgs {
            stencil,
            gauge,
            halo: &no_halo,
            input,
            legs: Legs::Interior,
        };
        interior.validate(out)?;
        out.zero();

        let comms = self.comms;
        let result = (|| -> Result<(), DhopError> {
            match comms {
                CommsPolicy::CommsAndCompute => {
                    let (exchanged, computed) = rayon::join(
                        || exchange.exchange(stencil, dag, halo),
                        || kernels.dhop(&interior, out, dag),
                    );
                    exchanged.and(computed)?;
                }
                CommsPolicy::CommsThenCompute => {
                    exchange.exchange(stencil, dag, halo)?;
                    kernels.dhop(&interior, out, dag)?;
                }
            }
            if stencil.n_halo() > 0 {
                let exterior = DhopArgs {
                    stencil,
                    gauge,
                    halo,
                    input,
                    legs: Legs::Exterior,
                };
                kernels.dhop(&exterior, out, dag)?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            log::warn!("dhop failed, output cleared: {e}");
            out.zero();
            return Err(e);
        }
        Ok(())
    }

    /// `out = M · input`.
    ///
    /// # Errors
    ///
    /// As [`Self::dhop`].
    pub fn m(
        &mut self,
        exchange: &impl HaloExchange<T, N>,
        input: &FermionField<T, N>,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        self.apply(exchange, input, out, false)
    }

    /// `out = M† · input`.
    ///
    /// # Errors
    ///
    /// As [`Self::dhop`].
    pub fn mdag(
        &mut self,
        exchange: &impl HaloExchange<T, N>,
        input: &FermionField<T, N>,
        out: &mut FermionField<T, N>,
    ) -> Result<(), DhopError> {
        self.apply(exchange, input, out, true)
    }

    fn apply(
        &mut self,
        exchange: &impl HaloExchange<T, N>,
        input: &FermionField<T, N>,
        out: &mut FermionField<T, N>,
        dag: bool,
    ) -> Result<(), DhopError> {
        self.dhop(exchange, input, out, dag)?;
        out.scale_inplace(T::from_f64(-0.5));
        let diag = Complex::new(T::from_f64(4.0 + self.mass), T::zero());
        out.axpy(diag, input);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::comms::{gather_from_partition, scatter_to_partition, NoExchange, PartitionExchange};
    use crate::kernels::{KernelOpt, Su3Fundamental};
    use crate::lattice::gauge::GaugeField;
    use crate::lattice::geometry::{BoundaryConditions, Partition};

    type Op = WilsonOperator<Su3Fundamental, f64, 3>;

    fn periodic_op(opt: KernelOpt, comms: CommsPolicy, dims: [usize; 4]) -> Op {
        let stencil = Stencil::periodic(dims).expect("stencil");
        let gauge = DoubledGaugeField::new(&GaugeField::hot_start(dims, 17));
        Op::new(WilsonKernels::new(opt), comms, stencil, gauge, 0.1).expect("operator")
    }

    #[test]
    fn dhop_overwrites_stale_output() {
        let mut op = periodic_op(KernelOpt::Generic, CommsPolicy::CommsThenCompute, [2, 2, 2, 4]);
        let input = FermionField::random(32, 1, 2);
        let mut clean = FermionField::zeros(32, 1);
        op.dhop(&NoExchange, &input, &mut clean, false).expect("dhop");
        let mut stale = FermionField::random(32, 1, 99);
        op.dhop(&NoExchange, &input, &mut stale, false).expect("dhop");
        assert_eq!(clean, stale);
    }

    #[test]
    fn comms_policies_agree() {
        let dims = [2, 2, 2, 4];
        let input = FermionField::random(32, 2, 4);
        let mut a = FermionField::zeros(32, 2);
        let mut b = FermionField::zeros(32, 2);
        periodic_op(KernelOpt::HandUnroll, CommsPolicy::CommsAndCompute, dims)
            .m(&NoExchange, &input, &mut a)
            .expect("m");
        periodic_op(KernelOpt::HandUnroll, CommsPolicy::CommsThenCompute, dims)
            .m(&NoExchange, &input, &mut b)
            .expect("m");
        assert_eq!(a, b);
    }

    #[test]
    fn free_constant_mode_has_eigenvalue_mass() {
        // Unit links, constant spinor: Dhop ψ = 8ψ, so M ψ = m ψ.
        let dims = [2, 2, 2, 2];
        let stencil = Stencil::periodic(dims).expect("stencil");
        let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::cold_start(dims));
        let mut op = Op::new(
            WilsonKernels::new(KernelOpt::Generic),
            CommsPolicy::CommsAndCompute,
            stencil,
            gauge,
            0.25,
        )
        .expect("operator");
        let mut input = FermionField::zeros(16, 1);
        for sp in &mut input.data {
            sp.s[0][1] = Complex::new(1.0, 0.5);
        }
        let mut out = FermionField::zeros(16, 1);
        op.m(&NoExchange, &input, &mut out).expect("m");
        let mut expected = input.clone();
        expected.scale_inplace(0.25);
        assert!(out.relative_distance(&expected) < 1e-14);
    }

    #[test]
    fn split_stencil_without_source_fails() {
        let dims = [2, 2, 2, 4];
        let p = crate::lattice::geometry::Partition::split(dims, [1, 1, 1, 2], [0, 0, 0, 0])
            .expect("split");
        let stencil = Stencil::new(p, crate::lattice::geometry::BoundaryConditions::periodic())
            .expect("stencil");
        let global = GaugeField::<f64, 3>::hot_start(dims, 3);
        let gauge = DoubledGaugeField::for_partition(&global, &p);
        let mut op = Op::new(
            WilsonKernels::new(KernelOpt::Generic),
            CommsPolicy::CommsAndCompute,
            stencil,
            gauge,
            0.0,
        )
        .expect("operator");
        let input = FermionField::random(16, 1, 1);
        let mut out = FermionField::random(16, 1, 2);
        assert!(op.dhop(&NoExchange, &input, &mut out, false).is_err());
        assert_eq!(out, FermionField::zeros(16, 1));
        let global_in = FermionField::random(32, 1, 1);
        assert!(op
            .dhop(&PartitionExchange::new(&global_in), &input, &mut out, false)
            .is_ok());
    }

    /// `M` or `M†` on every block of a split lattice, gathered globally.
    fn split_apply(
        opt: KernelOpt,
        gauge: &GaugeField<f64, 3>,
        input: &FermionField<f64, 3>,
        dag: bool,
    ) -> FermionField<f64, 3> {
        let dims = gauge.geometry.dims;
        let splits = [1, 2, 1, 2];
        let mut global_out = FermionField::zeros(input.nsite, input.ls);
        for rank in [[0, 0, 0, 0], [0, 1, 0, 0], [0, 0, 0, 1], [0, 1, 0, 1]] {
            let p = Partition::split(dims, splits, rank).expect("split");
            let stencil =
                Stencil::new(p, BoundaryConditions::antiperiodic_time()).expect("stencil");
            let mut op = Op::new(
                WilsonKernels::new(opt),
                CommsPolicy::CommsAndCompute,
                stencil,
                DoubledGaugeField::for_partition(gauge, &p),
                0.1,
            )
            .expect("operator");
            let exchange = PartitionExchange::new(input);
            let local_in = scatter_to_partition(input, &p).expect("scatter");
            let mut local_out = FermionField::zeros(p.nsite(), input.ls);
            if dag {
                op.mdag(&exchange, &local_in, &mut local_out).expect("mdag");
            } else {
                op.m(&exchange, &local_in, &mut local_out).expect("m");
            }
            gather_from_partition(&local_out, &p, &mut global_out).expect("gather");
        }
        global_out
    }

    #[test]
    fn mdag_is_adjoint_of_m_on_split_lattice() {
        let dims = [2, 4, 2, 4];
        let gauge = GaugeField::<f64, 3>::hot_start(dims, 23);
        let volume = gauge.geometry.volume();
        let a = FermionField::random(volume, 2, 31);
        let b = FermionField::random(volume, 2, 32);
        for opt in [KernelOpt::Generic, KernelOpt::InlineAsm] {
            let mb = split_apply(opt, &gauge, &b, false);
            let mdag_a = split_apply(opt, &gauge, &a, true);
            let lhs = a.dot(&mb);
            let rhs = mdag_a.dot(&b);
            let scale = lhs.abs_sq().sqrt().max(1.0);
            assert!((lhs - rhs).abs_sq().sqrt() / scale < 1e-12, "{opt}: {lhs} vs {rhs}");

            let mut g5a = a.clone();
            g5a.apply_gamma5();
            let mut sandwich = split_apply(opt, &gauge, &g5a, false);
            sandwich.apply_gamma5();
            assert!(sandwich.relative_distance(&mdag_a) < 1e-13, "{opt}");
        }
    }
}
