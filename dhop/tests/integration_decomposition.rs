// SPDX-License-Identifier: AGPL-3.0-only
#![allow(clippy::expect_used)]

//! Integration tests: domain decomposition.
//!
//! On every block of a split lattice, the interior pass followed by the
//! exterior pass (with halos filled from the global field) must reproduce
//! the global hop restricted to that block, for any backend, dagger flag,
//! comms policy and boundary condition.

use hotspring_dhop::comms::{scatter_to_partition, HaloExchange, PartitionExchange};
use hotspring_dhop::kernels::{
    dhop_kernel_code, CommsPolicy, DhopArgs, KernelOpt, Legs, Su3Fundamental, WilsonKernels,
};
use hotspring_dhop::lattice::gauge::{DoubledGaugeField, GaugeField};
use hotspring_dhop::lattice::geometry::{BoundaryConditions, Partition};
use hotspring_dhop::lattice::spinor::FermionField;
use hotspring_dhop::lattice::stencil::{HaloBuffer, Stencil};
use hotspring_dhop::operator::WilsonOperator;
use hotspring_dhop::tolerances;
use proptest::prelude::*;

const DIMS: [usize; 4] = [4, 4, 2, 4];

type Kernels = WilsonKernels<Su3Fundamental, 3>;

fn global_hop(
    bc: BoundaryConditions,
    gauge: &GaugeField<f64, 3>,
    input: &FermionField<f64, 3>,
    dag: bool,
) -> FermionField<f64, 3> {
    let stencil = Stencil::new(Partition::whole(DIMS), bc).expect("global stencil");
    let doubled = DoubledGaugeField::new(gauge);
    let halo = HaloBuffer::empty(input.ls);
    let args = DhopArgs {
        stencil: &stencil,
        gauge: &doubled,
        halo: &halo,
        input,
        legs: Legs::All,
    };
    let mut out = FermionField::zeros(input.nsite, input.ls);
    Kernels::new(KernelOpt::Generic)
        .dhop(&args, &mut out, dag)
        .expect("global dhop");
    out
}

fn boundary(antiperiodic: bool) -> BoundaryConditions {
    if antiperiodic {
        BoundaryConditions::antiperiodic_time()
    } else {
        BoundaryConditions::periodic()
    }
}

fn opt_strategy() -> impl Strategy<Value = KernelOpt> {
    prop::sample::select(KernelOpt::ALL.to_vec())
}

fn split_strategy() -> impl Strategy<Value = [usize; 4]> {
    [
        prop::sample::select(vec![1usize, 2, 4]),
        prop::sample::select(vec![1usize, 2]),
        prop::sample::select(vec![1usize, 2]),
        prop::sample::select(vec![1usize, 2, 4]),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Operator-level: exchange, interior, exterior.
    #[test]
    fn split_blocks_reproduce_global_hop(
        opt in opt_strategy(),
        splits in split_strategy(),
        rank_seed in any::<[u8; 4]>(),
        antiperiodic in any::<bool>(),
        dag in any::<bool>(),
        overlap in any::<bool>(),
        seed in 0u64..1000,
    ) {
        let rank = [0, 1, 2, 3].map(|mu| usize::from(rank_seed[mu]) % splits[mu]);
        let bc = boundary(antiperiodic);
        let gauge = GaugeField::<f64, 3>::hot_start(DIMS, seed);
        let global_in = FermionField::random(gauge.geometry.volume(), 2, seed + 1);
        let reference = global_hop(bc, &gauge, &global_in, dag);

        let p = Partition::split(DIMS, splits, rank).expect("split");
        let stencil = Stencil::new(p, bc).expect("stencil");
        let comms = if overlap { CommsPolicy::CommsAndCompute } else { CommsPolicy::CommsThenCompute };
        let mut op = WilsonOperator::new(
            Kernels::new(opt),
            comms,
            stencil,
            DoubledGaugeField::for_partition(&gauge, &p),
            0.0,
        )
        .expect("operator");

        let local_in = scatter_to_partition(&global_in, &p).expect("scatter");
        let mut local_out = FermionField::random(p.nsite(), 2, seed + 2);
        op.dhop(&PartitionExchange::new(&global_in), &local_in, &mut local_out, dag)
            .expect("dhop");

        let expected = scatter_to_partition(&reference, &p).expect("scatter reference");
        let d = local_out.relative_distance(&expected);
        prop_assert!(d < tolerances::DECOMPOSITION_F64, "{opt} {splits:?} {rank:?}: {d:.2e}");
    }

    /// Raw entry: interior-only then exterior-only equals both flags set.
    #[test]
    fn raw_interior_then_exterior_equals_full(
        opt in opt_strategy(),
        antiperiodic in any::<bool>(),
        dag in any::<bool>(),
        seed in 0u64..1000,
    ) {
        let bc = boundary(antiperiodic);
        let gauge = GaugeField::<f64, 3>::hot_start(DIMS, seed);
        let global_in = FermionField::random(gauge.geometry.volume(), 1, seed + 3);
        let p = Partition::split(DIMS, [2, 1, 1, 2], [1, 0, 0, 0]).expect("split");
        let stencil = Stencil::new(p, bc).expect("stencil");
        let doubled = DoubledGaugeField::for_partition(&gauge, &p);
        let local_in = scatter_to_partition(&global_in, &p).expect("scatter");
        let mut halo = HaloBuffer::for_stencil(&stencil, 1);
        PartitionExchange::new(&global_in)
            .exchange(&stencil, dag, &mut halo)
            .expect("exchange");

        let nsite = p.nsite();
        let code = opt.code();
        let mut split = FermionField::zeros(nsite, 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            code, &stencil, &doubled, &halo, 1, nsite, &local_in, &mut split, true, false, dag,
        );
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            code, &stencil, &doubled, &halo, 1, nsite, &local_in, &mut split, false, true, dag,
        );
        let mut full = FermionField::zeros(nsite, 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            code, &stencil, &doubled, &halo, 1, nsite, &local_in, &mut full, true, true, dag,
        );
        prop_assert!(split.relative_distance(&full) < tolerances::DECOMPOSITION_F64);
    }
}

#[test]
fn every_block_of_a_hypercubic_split_agrees() {
    let bc = BoundaryConditions::antiperiodic_time();
    let gauge = GaugeField::<f64, 3>::hot_start(DIMS, 77);
    let global_in = FermionField::random(gauge.geometry.volume(), 1, 78);
    let reference = global_hop(bc, &gauge, &global_in, false);
    let splits = [2, 2, 1, 2];
    for rx in 0..2 {
        for ry in 0..2 {
            for rt in 0..2 {
                let p = Partition::split(DIMS, splits, [rx, ry, 0, rt]).expect("split");
                let stencil = Stencil::new(p, bc).expect("stencil");
                let mut op = WilsonOperator::new(
                    Kernels::new(KernelOpt::HandUnroll),
                    CommsPolicy::CommsAndCompute,
                    stencil,
                    DoubledGaugeField::for_partition(&gauge, &p),
                    0.0,
                )
                .expect("operator");
                let local_in = scatter_to_partition(&global_in, &p).expect("scatter");
                let mut out = FermionField::zeros(p.nsite(), 1);
                op.dhop(&PartitionExchange::new(&global_in), &local_in, &mut out, false)
                    .expect("dhop");
                let expected = scatter_to_partition(&reference, &p).expect("scatter");
                assert!(out.relative_distance(&expected) < tolerances::DECOMPOSITION_F64);
            }
        }
    }
}
