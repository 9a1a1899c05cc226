// SPDX-License-Identifier: AGPL-3.0-only

//! Wilson Hopping Kernel Validation
//!
//! Every backend against the generic kernel, plus the operator identities
//! any correct hopping term satisfies:
//!   - backend parity in f64 and f32, plain and dagger
//!   - interior + exterior on split partitions equals the global hop
//!   - `⟨a, D b⟩ = ⟨D† a, b⟩` and `γ5 D γ5 = D†`
//!   - zero input, free-field constant mode, point-source support
//!   - per-leg hops sum to the full hop
//!   - optional: the WGSL shader against the host (`--gpu`)
//!
//! Usage: `validate_wilson_kernels [--gpu] [--json <path>]`
//!
//! Exit code 0 = all checks pass, exit code 1 = any check fails.

use hotspring_dhop::comms::{gather_from_partition, scatter_to_partition, PartitionExchange};
use hotspring_dhop::error::DhopError;
use hotspring_dhop::gpu::{GpuF64, WilsonDhopGpu};
use hotspring_dhop::kernels::{CommsPolicy, DhopArgs, KernelOpt, Legs, Su3Fundamental, WilsonKernels};
use hotspring_dhop::lattice::complex::Complex;
use hotspring_dhop::lattice::gauge::{DoubledGaugeField, GaugeField};
use hotspring_dhop::lattice::geometry::{BoundaryConditions, Partition};
use hotspring_dhop::lattice::projection::Leg;
use hotspring_dhop::lattice::scalar::Real;
use hotspring_dhop::lattice::spinor::FermionField;
use hotspring_dhop::lattice::stencil::{HaloBuffer, Stencil};
use hotspring_dhop::operator::WilsonOperator;
use hotspring_dhop::tolerances;
use hotspring_dhop::validation::ValidationHarness;

const DIMS: [usize; 4] = [4, 4, 4, 8];
const LS: usize = 2;
const SEED: u64 = 42;

type Kernels = WilsonKernels<Su3Fundamental, 3>;

fn hop<T: Real>(
    opt: KernelOpt,
    stencil: &Stencil,
    gauge: &DoubledGaugeField<T, 3>,
    input: &FermionField<T, 3>,
    dag: bool,
) -> Result<FermionField<T, 3>, DhopError> {
    let halo = HaloBuffer::empty(input.ls);
    let args = DhopArgs {
        stencil,
        gauge,
        halo: &halo,
        input,
        legs: Legs::All,
    };
    let mut out = FermionField::zeros(input.nsite, input.ls);
    Kernels::new(opt).dhop(&args, &mut out, dag)?;
    Ok(out)
}

/// Unwraps a kernel result, recording a failed check named `label` on error.
fn ran<V>(h: &mut ValidationHarness, label: &str, result: Result<V, DhopError>) -> Option<V> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!("{label}: {e}");
            h.check_bool(&format!("{label}: {e}"), false);
            None
        }
    }
}

fn check_backend_parity(h: &mut ValidationHarness, stencil: &Stencil, gauge: &GaugeField<f64, 3>) {
    h.section("Backend parity");
    let doubled = DoubledGaugeField::new(gauge);
    let input = FermionField::random(stencil.nsite(), LS, SEED + 1);
    let doubled32 = DoubledGaugeField::new(&gauge.cast::<f32>());
    let input32 = input.cast::<f32>();
    for dag in [false, true] {
        let tag = if dag { "Dhop†" } else { "Dhop" };
        let reference = hop(KernelOpt::Generic, stencil, &doubled, &input, dag);
        let reference32 = hop(KernelOpt::Generic, stencil, &doubled32, &input32, dag);
        let (Some(reference), Some(reference32)) = (
            ran(h, &format!("{tag} Generic (f64)"), reference),
            ran(h, &format!("{tag} Generic (f32)"), reference32),
        ) else {
            continue;
        };
        for opt in &KernelOpt::ALL[1..] {
            let label = format!("{tag} {opt} vs Generic (f64)");
            if let Some(got) = ran(h, &label, hop(*opt, stencil, &doubled, &input, dag)) {
                h.check_fields(&label, &got, &reference, tolerances::BACKEND_PARITY_F64);
            }
            let label = format!("{tag} {opt} vs Generic (f32)");
            if let Some(got32) = ran(h, &label, hop(*opt, stencil, &doubled32, &input32, dag)) {
                h.check_fields(&label, &got32, &reference32, tolerances::BACKEND_PARITY_F32);
            }
        }
    }
}

fn run_rank(
    opt: KernelOpt,
    comms: CommsPolicy,
    gauge: &GaugeField<f64, 3>,
    global_in: &FermionField<f64, 3>,
    splits: [usize; 4],
    rank: [usize; 4],
) -> Result<(Partition, FermionField<f64, 3>), DhopError> {
    let p = Partition::split(DIMS, splits, rank)?;
    let stencil = Stencil::new(p, BoundaryConditions::antiperiodic_time())?;
    let local_gauge = DoubledGaugeField::for_partition(gauge, &p);
    let mut op = WilsonOperator::new(Kernels::new(opt), comms, stencil, local_gauge, 0.0)?;
    let local_in = scatter_to_partition(global_in, &p)?;
    let mut local_out = FermionField::zeros(p.nsite(), LS);
    op.dhop(&PartitionExchange::new(global_in), &local_in, &mut local_out, false)?;
    Ok((p, local_out))
}

fn check_decomposition(h: &mut ValidationHarness, gauge: &GaugeField<f64, 3>) {
    h.section("Interior + exterior on split partitions");
    let bc = BoundaryConditions::antiperiodic_time();
    let global_stencil = match Stencil::new(Partition::whole(DIMS), bc) {
        Ok(s) => s,
        Err(e) => {
            h.check_bool(&format!("global stencil: {e}"), false);
            return;
        }
    };
    let global_in = FermionField::random(global_stencil.nsite(), LS, SEED + 2);
    let doubled = DoubledGaugeField::new(gauge);
    let splits = [1, 1, 2, 2];
    let global = hop(KernelOpt::Generic, &global_stencil, &doubled, &global_in, false);
    let Some(reference) = ran(h, "global Generic hop", global) else {
        return;
    };

    for opt in KernelOpt::ALL {
        for comms in [CommsPolicy::CommsAndCompute, CommsPolicy::CommsThenCompute] {
            let mut assembled = FermionField::zeros(global_stencil.nsite(), LS);
            let mut ok = true;
            for rank in [[0, 0, 0, 0], [0, 0, 0, 1], [0, 0, 1, 0], [0, 0, 1, 1]] {
                let gathered = run_rank(opt, comms, gauge, &global_in, splits, rank)
                    .and_then(|(p, local_out)| gather_from_partition(&local_out, &p, &mut assembled));
                if let Err(e) = gathered {
                    log::error!("rank {rank:?}: {e}");
                    ok = false;
                }
            }
            h.check_bool(&format!("{opt}/{comms} ranks complete"), ok);
            if !ok {
                continue;
            }
            h.check_fields(
                &format!("{opt}/{comms} gathered vs global"),
                &assembled,
                &reference,
                tolerances::DECOMPOSITION_F64,
            );
        }
    }
}

fn check_adjoint(h: &mut ValidationHarness, stencil: &Stencil, gauge: &GaugeField<f64, 3>) {
    h.section("Dagger");
    let doubled = DoubledGaugeField::new(gauge);
    let a = FermionField::random(stencil.nsite(), LS, SEED + 3);
    let b = FermionField::random(stencil.nsite(), LS, SEED + 4);
    let mut g5a = a.clone();
    g5a.apply_gamma5();
    for opt in KernelOpt::ALL {
        let hops = hop(opt, stencil, &doubled, &b, false).and_then(|db| {
            let dag_a = hop(opt, stencil, &doubled, &a, true)?;
            let sandwich = hop(opt, stencil, &doubled, &g5a, false)?;
            Ok((db, dag_a, sandwich))
        });
        let Some((db, dag_a, mut sandwich)) = ran(h, &format!("{opt} dagger hops"), hops) else {
            continue;
        };
        let lhs = a.dot(&db);
        let rhs = dag_a.dot(&b);
        let scale = lhs.abs_sq().sqrt().max(1.0);
        let diff = (lhs - rhs).abs_sq().sqrt() / scale;
        h.check_upper(&format!("{opt} ⟨a, D b⟩ = ⟨D† a, b⟩"), diff, tolerances::DAG_ADJOINT_F64);

        sandwich.apply_gamma5();
        h.check_fields(
            &format!("{opt} γ5 D γ5 = D†"),
            &sandwich,
            &dag_a,
            tolerances::GAMMA5_HERMITICITY_F64,
        );
    }
}

fn check_special_inputs(h: &mut ValidationHarness) {
    h.section("Zero, free field and point source");
    let stencil = match Stencil::periodic([4, 4, 4, 4]) {
        Ok(s) => s,
        Err(e) => {
            h.check_bool(&format!("4^4 stencil: {e}"), false);
            return;
        }
    };
    let nsite = stencil.nsite();
    let hot = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start([4, 4, 4, 4], SEED + 5));
    let cold = DoubledGaugeField::new(&GaugeField::<f64, 3>::cold_start([4, 4, 4, 4]));

    let zero = FermionField::zeros(nsite, 1);
    let mut constant = FermionField::zeros(nsite, 1);
    for sp in &mut constant.data {
        sp.s[0][0] = Complex::new(1.0, 0.0);
        sp.s[3][2] = Complex::new(0.0, -0.5);
    }
    let mut eight = constant.clone();
    eight.scale_inplace(8.0);
    let impulse = FermionField::point_source(nsite, 1, 0, 0, 1, 2);

    for opt in KernelOpt::ALL {
        let hops = hop(opt, &stencil, &hot, &zero, false).and_then(|out| {
            let free = hop(opt, &stencil, &cold, &constant, false)?;
            let spread = hop(opt, &stencil, &hot, &impulse, false)?;
            Ok((out, free, spread))
        });
        let Some((out, free, spread)) = ran(h, &format!("{opt} special-input hops"), hops) else {
            continue;
        };
        h.check_upper(
            &format!("{opt} zero input"),
            out.max_abs_diff(&zero),
            tolerances::ZERO_INPUT_ABS,
        );
        h.check_upper(
            &format!("{opt} free constant mode = 8ψ"),
            free.max_abs_diff(&eight),
            tolerances::FREE_FIELD_ABS,
        );
        let support = spread
            .data
            .iter()
            .filter(|sp| sp.norm_sq() > tolerances::IMPULSE_SUPPORT_FLOOR)
            .count();
        h.check_abs(&format!("{opt} impulse reaches 8 neighbors"), support as f64, 8.0, 0.5);
    }
}

fn check_dir_sum(h: &mut ValidationHarness, stencil: &Stencil, gauge: &GaugeField<f64, 3>) {
    h.section("Per-leg hops");
    let doubled = DoubledGaugeField::new(gauge);
    let input = FermionField::random(stencil.nsite(), LS, SEED + 6);
    let halo = HaloBuffer::empty(LS);
    let args = DhopArgs {
        stencil,
        gauge: &doubled,
        halo: &halo,
        input: &input,
        legs: Legs::All,
    };
    for dag in [false, true] {
        let mut sum = FermionField::zeros(stencil.nsite(), LS);
        let kernels = Kernels::new(KernelOpt::HandUnroll);
        let ok = (0..8).all(|leg| kernels.dhop_dir(&args, Leg::from_index(leg), dag, &mut sum).is_ok());
        h.check_bool(&format!("dhop_dir all legs (dag={dag})"), ok);
        let label = format!("Σ dhop_dir = dhop (dag={dag})");
        let Some(full) = ran(h, &label, hop(KernelOpt::Generic, stencil, &doubled, &input, dag))
        else {
            continue;
        };
        h.check_fields(
            &label,
            &sum,
            &full,
            tolerances::DIR_SUM_PARITY_F64,
        );
    }
}

fn check_gpu(h: &mut ValidationHarness, stencil: &Stencil, gauge: &GaugeField<f64, 3>) {
    h.section("WGSL shader");
    let gpu = match tokio::runtime::Runtime::new()
        .map_err(|e| e.to_string())
        .and_then(|rt| rt.block_on(GpuF64::new()).map_err(|e| e.to_string()))
    {
        Ok(g) => g,
        Err(e) => {
            println!("  GPU not available: {e}");
            GpuF64::print_available_adapters();
            h.check_bool("GPU available", false);
            return;
        }
    };
    gpu.print_info();
    let doubled = DoubledGaugeField::new(gauge);
    let input = FermionField::random(stencil.nsite(), LS, SEED + 7);
    let halo = HaloBuffer::empty(LS);
    let dev = match WilsonDhopGpu::new(&gpu, stencil, &doubled) {
        Ok(d) => d,
        Err(e) => {
            h.check_bool(&format!("shader setup: {e}"), false);
            return;
        }
    };
    for dag in [false, true] {
        let Some(host) = ran(
            h,
            &format!("host Gpu kernel (dag={dag})"),
            hop(KernelOpt::Gpu, stencil, &doubled, &input, dag),
        ) else {
            continue;
        };
        let mut shader = FermionField::zeros(stencil.nsite(), LS);
        let dispatched = dev.dhop(&gpu, &halo, &input, &mut shader, Legs::All, dag);
        if ran(h, &format!("shader dispatch (dag={dag})"), dispatched).is_none() {
            continue;
        }
        h.check_fields(
            &format!("shader vs host (dag={dag})"),
            &shader,
            &host,
            tolerances::GPU_SHADER_PARITY_F64,
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Wilson Hopping Kernel Validation                          ║");
    println!("║  Generic / HandUnroll / InlineAsm / Gpu, Dhop and Dhop†     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");

    let args: Vec<String> = std::env::args().collect();
    let with_gpu = args.iter().any(|a| a == "--gpu");
    let json_path = args
        .iter()
        .position(|a| a == "--json")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let mut harness = ValidationHarness::new("wilson_kernels");
    let gauge = GaugeField::<f64, 3>::hot_start(DIMS, SEED);
    let stencil = match Stencil::periodic(DIMS) {
        Ok(s) => s,
        Err(e) => {
            harness.check_bool(&format!("periodic stencil: {e}"), false);
            harness.finish();
        }
    };
    println!("  Lattice {DIMS:?}, Ls = {LS}, {} rayon threads", rayon::current_num_threads());
    match Kernels::from_process_default() {
        Ok(k) => println!("  Process default backend: {}", k.opt()),
        Err(e) => harness.check_bool(&format!("process default: {e}"), false),
    }

    check_backend_parity(&mut harness, &stencil, &gauge);
    check_decomposition(&mut harness, &gauge);
    check_adjoint(&mut harness, &stencil, &gauge);
    check_special_inputs(&mut harness);
    check_dir_sum(&mut harness, &stencil, &gauge);
    if with_gpu {
        check_gpu(&mut harness, &stencil, &gauge);
    }

    if let Some(path) = json_path {
        match harness.to_json() {
            Ok(text) => {
                if let Err(e) = std::fs::write(&path, text) {
                    eprintln!("  cannot write {path}: {e}");
                } else {
                    println!("  report written to {path}");
                }
            }
            Err(e) => eprintln!("  {e}"),
        }
    }
    harness.finish();
}
