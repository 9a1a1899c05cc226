// SPDX-License-Identifier: AGPL-3.0-only
#![allow(clippy::expect_used)]

//! Integration tests: hopping kernels through the public API.
//!
//! Backend equivalence, the dagger as the exact adjoint, the stencil's
//! reach, the fatal paths of the raw entry point, representations with
//! only the generic kernel, and configuration end to end.

use hotspring_dhop::comms::NoExchange;
use hotspring_dhop::config::KernelConfig;
use hotspring_dhop::error::DhopError;
use hotspring_dhop::kernels::{
    dhop_kernel_code, CommsPolicy, DhopArgs, GenericOnly, KernelOpt, Legs, Representation,
    Su2Adjoint, Su2Fundamental, Su3Fundamental, Su4Fundamental, WilsonKernels,
};
use hotspring_dhop::lattice::complex::Complex;
use hotspring_dhop::lattice::gauge::{DoubledGaugeField, GaugeField};
use hotspring_dhop::lattice::projection::Leg;
use hotspring_dhop::lattice::scalar::Real;
use hotspring_dhop::lattice::spinor::FermionField;
use hotspring_dhop::lattice::stencil::{HaloBuffer, Stencil};
use hotspring_dhop::operator::WilsonOperator;
use hotspring_dhop::tolerances;

fn apply<R: Representation<N>, T: Real, const N: usize>(
    kernels: WilsonKernels<R, N>,
    stencil: &Stencil,
    gauge: &DoubledGaugeField<T, N>,
    input: &FermionField<T, N>,
    dag: bool,
) -> FermionField<T, N> {
    let halo = HaloBuffer::empty(input.ls);
    let args = DhopArgs {
        stencil,
        gauge,
        halo: &halo,
        input,
        legs: Legs::All,
    };
    let mut out = FermionField::zeros(input.nsite, input.ls);
    kernels.dhop(&args, &mut out, dag).expect("dhop");
    out
}

fn su3(opt: KernelOpt) -> WilsonKernels<Su3Fundamental, 3> {
    WilsonKernels::new(opt)
}

// ═══════════════════════════════════════════════════════════════════
//  Backend equivalence
// ═══════════════════════════════════════════════════════════════════

#[test]
fn all_backends_agree_f64_with_fifth_dimension() {
    let dims = [4, 4, 4, 6];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 1));
    let input = FermionField::random(stencil.nsite(), 3, 2);
    for dag in [false, true] {
        let reference = apply(su3(KernelOpt::Generic), &stencil, &gauge, &input, dag);
        for opt in KernelOpt::ALL {
            let got = apply(su3(opt), &stencil, &gauge, &input, dag);
            let d = got.relative_distance(&reference);
            assert!(
                d < tolerances::BACKEND_PARITY_F64,
                "{opt} dag={dag}: relative distance {d:.2e}"
            );
        }
    }
}

#[test]
fn all_backends_agree_f32() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 3).cast::<f32>());
    let input = FermionField::<f64, 3>::random(stencil.nsite(), 2, 4).cast::<f32>();
    for dag in [false, true] {
        let reference = apply(su3(KernelOpt::Generic), &stencil, &gauge, &input, dag);
        for opt in KernelOpt::ALL {
            let got = apply(su3(opt), &stencil, &gauge, &input, dag);
            assert!(got.relative_distance(&reference) < tolerances::BACKEND_PARITY_F32);
        }
    }
}

#[test]
fn f32_tracks_f64() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge64 = GaugeField::<f64, 3>::hot_start(dims, 5);
    let input = FermionField::random(stencil.nsite(), 1, 6);
    let hi = apply(
        su3(KernelOpt::InlineAsm),
        &stencil,
        &DoubledGaugeField::new(&gauge64),
        &input,
        false,
    );
    let lo = apply(
        su3(KernelOpt::InlineAsm),
        &stencil,
        &DoubledGaugeField::new(&gauge64.cast::<f32>()),
        &input.cast::<f32>(),
        false,
    );
    assert!(lo.cast::<f64>().relative_distance(&hi) < tolerances::BACKEND_PARITY_F32);
}

// ═══════════════════════════════════════════════════════════════════
//  Dagger
// ═══════════════════════════════════════════════════════════════════

/// Dense matrix of the hop on a 2⁴ lattice, `m[row][col]`.
fn dense(
    opt: KernelOpt,
    stencil: &Stencil,
    gauge: &DoubledGaugeField<f64, 3>,
    dag: bool,
) -> Vec<Vec<Complex<f64>>> {
    let nsite = stencil.nsite();
    let dim = nsite * 12;
    let mut m = vec![vec![Complex::new(0.0, 0.0); dim]; dim];
    for col in 0..dim {
        let (site, spin, color) = (col / 12, (col / 3) % 4, col % 3);
        let e = FermionField::point_source(nsite, 1, site, 0, spin, color);
        let out = apply(su3(opt), stencil, gauge, &e, dag);
        for (row, z) in out.data.iter().flat_map(|sp| sp.s.iter().flatten()).enumerate() {
            m[row][col] = *z;
        }
    }
    m
}

#[test]
fn dagger_is_conjugate_transpose_on_two_to_the_four() {
    let dims = [2, 2, 2, 2];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 7));
    for opt in KernelOpt::ALL {
        let d = dense(opt, &stencil, &gauge, false);
        let ddag = dense(opt, &stencil, &gauge, true);
        let mut worst = 0.0_f64;
        for (i, row) in ddag.iter().enumerate() {
            for (j, z) in row.iter().enumerate() {
                worst = worst.max((*z - d[j][i].conj()).abs_sq().sqrt());
            }
        }
        assert!(worst < tolerances::DAG_ADJOINT_F64, "{opt}: worst {worst:.2e}");
    }
}

#[test]
fn gamma5_sandwich_gives_dagger() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 8));
    let psi = FermionField::random(stencil.nsite(), 1, 9);
    for opt in KernelOpt::ALL {
        let mut g5 = psi.clone();
        g5.apply_gamma5();
        let mut sandwich = apply(su3(opt), &stencil, &gauge, &g5, false);
        sandwich.apply_gamma5();
        let dag = apply(su3(opt), &stencil, &gauge, &psi, true);
        assert!(sandwich.relative_distance(&dag) < tolerances::GAMMA5_HERMITICITY_F64);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Stencil reach and special inputs
// ═══════════════════════════════════════════════════════════════════

#[test]
fn zero_field_maps_to_zero() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 10));
    let zero = FermionField::zeros(stencil.nsite(), 2);
    for opt in KernelOpt::ALL {
        let out = apply(su3(opt), &stencil, &gauge, &zero, false);
        assert!(out.max_abs_diff(&zero) < tolerances::ZERO_INPUT_ABS);
    }
}

#[test]
fn impulse_reaches_exactly_eight_neighbors() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let origin = 85;
    let impulse = FermionField::point_source(stencil.nsite(), 1, origin, 0, 2, 1);
    let mut expected: Vec<usize> = (0..8).map(|leg| stencil.entry(origin, leg).offset).collect();
    expected.sort_unstable();
    for links in [GaugeField::<f64, 3>::cold_start(dims), GaugeField::hot_start(dims, 11)] {
        let gauge = DoubledGaugeField::new(&links);
        for opt in KernelOpt::ALL {
            let out = apply(su3(opt), &stencil, &gauge, &impulse, false);
            assert_eq!(out.support(), expected, "{opt}");
        }
    }
}

#[test]
fn wilson_matrix_impulse_adds_the_diagonal() {
    let dims = [4, 4, 4, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::cold_start(dims));
    let mut op = WilsonOperator::new(
        su3(KernelOpt::HandUnroll),
        CommsPolicy::CommsAndCompute,
        stencil,
        gauge,
        0.1,
    )
    .expect("operator");
    let impulse = FermionField::point_source(256, 1, 0, 0, 0, 0);
    let mut out = FermionField::zeros(256, 1);
    op.m(&NoExchange, &impulse, &mut out).expect("m");
    assert_eq!(out.support().len(), 9);
    let diag = out.data[0].s[0][0];
    assert!((diag.re - 4.1).abs() < tolerances::FREE_FIELD_ABS);
    assert!(diag.im.abs() < tolerances::FREE_FIELD_ABS);
}

#[test]
fn per_leg_hops_sum_to_full_hop() {
    let dims = [4, 4, 2, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 13));
    let input = FermionField::random(stencil.nsite(), 2, 14);
    let halo = HaloBuffer::empty(2);
    let args = DhopArgs {
        stencil: &stencil,
        gauge: &gauge,
        halo: &halo,
        input: &input,
        legs: Legs::All,
    };
    for dag in [false, true] {
        let mut sum = FermionField::zeros(stencil.nsite(), 2);
        for leg in 0..8 {
            su3(KernelOpt::InlineAsm)
                .dhop_dir(&args, Leg::from_index(leg), dag, &mut sum)
                .expect("dhop_dir");
        }
        let full = apply(su3(KernelOpt::Generic), &stencil, &gauge, &input, dag);
        assert!(sum.relative_distance(&full) < tolerances::DIR_SUM_PARITY_F64);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Raw entry point
// ═══════════════════════════════════════════════════════════════════

fn raw_fixture() -> (Stencil, DoubledGaugeField<f64, 3>, FermionField<f64, 3>) {
    let dims = [2, 2, 2, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 15));
    let input = FermionField::random(32, 1, 16);
    (stencil, gauge, input)
}

#[test]
fn raw_entry_accumulates_like_typed_api() {
    let (stencil, gauge, input) = raw_fixture();
    let halo = HaloBuffer::empty(1);
    for opt in KernelOpt::ALL {
        let mut raw = FermionField::zeros(32, 1);
        dhop_kernel_code::<Su3Fundamental, f64, 3>(
            opt.code(), &stencil, &gauge, &halo, 1, 32, &input, &mut raw, true, true, false,
        );
        let typed = apply(su3(opt), &stencil, &gauge, &input, false);
        assert_eq!(raw, typed);
    }
}

#[test]
#[should_panic(expected = "Invalid kernel option code 4")]
fn raw_entry_rejects_unknown_code() {
    let (stencil, gauge, input) = raw_fixture();
    let mut out = FermionField::zeros(32, 1);
    dhop_kernel_code::<Su3Fundamental, f64, 3>(
        4, &stencil, &gauge, &HaloBuffer::empty(1), 1, 32, &input, &mut out, true, true, false,
    );
}

#[test]
#[should_panic(expected = "interior=0 and exterior=0")]
fn raw_entry_rejects_empty_leg_selection() {
    let (stencil, gauge, input) = raw_fixture();
    let mut out = FermionField::zeros(32, 1);
    dhop_kernel_code::<Su3Fundamental, f64, 3>(
        0, &stencil, &gauge, &HaloBuffer::empty(1), 1, 32, &input, &mut out, false, false, true,
    );
}

#[test]
#[should_panic(expected = "not available for representation")]
fn raw_entry_rejects_specialized_backend_for_su2() {
    let dims = [2, 2, 2, 2];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 2>::random(dims, 17));
    let input = FermionField::random(16, 1, 18);
    let mut out = FermionField::zeros(16, 1);
    dhop_kernel_code::<Su2Fundamental, f64, 2>(
        KernelOpt::HandUnroll.code(),
        &stencil,
        &gauge,
        &HaloBuffer::empty(1),
        1,
        16,
        &input,
        &mut out,
        true,
        true,
        false,
    );
}

#[test]
fn typed_api_reports_layout_errors() {
    let (stencil, gauge, input) = raw_fixture();
    let halo = HaloBuffer::empty(1);
    let args = DhopArgs {
        stencil: &stencil,
        gauge: &gauge,
        halo: &halo,
        input: &input,
        legs: Legs::All,
    };
    let mut wrong_ls = FermionField::zeros(32, 2);
    assert!(matches!(
        su3(KernelOpt::Generic).dhop(&args, &mut wrong_ls, false),
        Err(DhopError::LayoutMismatch(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════
//  Generic-only representations
// ═══════════════════════════════════════════════════════════════════

fn adjoint_check<R: Representation<N, Opt = GenericOnly>, const N: usize>(gauge: &GaugeField<f64, N>) {
    let dims = gauge.geometry.dims;
    let stencil = Stencil::periodic(dims).expect("stencil");
    let doubled = DoubledGaugeField::new(gauge);
    let kernels = WilsonKernels::<R, N>::new(GenericOnly::Generic);
    let a = FermionField::random(stencil.nsite(), 1, 19);
    let b = FermionField::random(stencil.nsite(), 1, 20);
    let lhs = a.dot(&apply(kernels, &stencil, &doubled, &b, false));
    let rhs = apply(kernels, &stencil, &doubled, &a, true).dot(&b);
    let scale = lhs.abs_sq().sqrt().max(1.0);
    assert!((lhs - rhs).abs_sq().sqrt() / scale < tolerances::DAG_ADJOINT_F64, "{}", R::NAME);

    for opt in [KernelOpt::HandUnroll, KernelOpt::InlineAsm, KernelOpt::Gpu] {
        assert!(matches!(
            WilsonKernels::<R, N>::with_opt(opt),
            Err(DhopError::UnsupportedOption { .. })
        ));
    }
    assert!(WilsonKernels::<R, N>::with_opt(KernelOpt::Generic).is_ok());
}

#[test]
fn su2_fundamental_generic_kernel() {
    adjoint_check::<Su2Fundamental, 2>(&GaugeField::random([2, 2, 4, 4], 21));
}

#[test]
fn su2_adjoint_generic_kernel() {
    let su2 = GaugeField::<f64, 2>::random([2, 2, 4, 4], 22);
    adjoint_check::<Su2Adjoint, 3>(&GaugeField::su2_adjoint_of(&su2));
}

#[test]
fn su4_fundamental_generic_kernel() {
    adjoint_check::<Su4Fundamental, 4>(&GaugeField::random([2, 2, 2, 4], 23));
}

// ═══════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════

#[test]
fn json_config_selects_backend_and_policy() {
    let config = KernelConfig::from_json(r#"{"opt": "inline_asm", "comms": "comms_then_compute"}"#)
        .expect("config");
    let dims = [2, 2, 2, 4];
    let stencil = Stencil::periodic(dims).expect("stencil");
    let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 24));
    let op = WilsonOperator::<Su3Fundamental, f64, 3>::from_config(&config, stencil, gauge, 0.0)
        .expect("operator");
    assert_eq!(op.kernels().opt(), KernelOpt::InlineAsm);
    assert_eq!(op.comms(), CommsPolicy::CommsThenCompute);
}

#[test]
fn config_for_su2_rejects_unrolled_backend() {
    let config = KernelConfig::new(KernelOpt::HandUnroll, CommsPolicy::CommsAndCompute);
    assert!(WilsonKernels::<Su2Fundamental, 2>::from_config(&config).is_err());
    let lookup = |key: &str| (key == "HOTSPRING_DHOP_KERNEL").then(|| "generic".to_string());
    let generic = KernelConfig::from_lookup(lookup).expect("lookup");
    assert!(WilsonKernels::<Su2Fundamental, 2>::from_config(&generic).is_ok());
}
