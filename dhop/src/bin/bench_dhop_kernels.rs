// SPDX-License-Identifier: AGPL-3.0-only

//! Wilson Hopping Kernel Benchmark
//!
//! Times every backend on the same hot gauge field and reports:
//!   - wall time per application (median of the timed repetitions)
//!   - sustained GFLOP/s at 1320 flops per 4D site and 5th-dimension slice
//!   - speedup over the generic kernel
//!
//! Usage: `bench_dhop_kernels [--gpu] [--json <path>] [--reps <n>]`

use hotspring_dhop::gpu::{GpuF64, WilsonDhopGpu};
use hotspring_dhop::kernels::{DhopArgs, KernelOpt, Legs, Su3Fundamental, WilsonKernels};
use hotspring_dhop::lattice::gauge::{DoubledGaugeField, GaugeField};
use hotspring_dhop::lattice::spinor::FermionField;
use hotspring_dhop::lattice::stencil::{HaloBuffer, Stencil};
use serde::Serialize;
use std::time::Instant;

/// Flops of one SU(3) Wilson hop at one `sF`.
const FLOPS_PER_SITE: f64 = 1320.0;

const LATTICES: [([usize; 4], usize); 3] = [([8, 8, 8, 8], 1), ([8, 8, 8, 16], 1), ([8, 8, 8, 8], 8)];

#[derive(Debug, Serialize)]
struct Timing {
    backend: String,
    dims: [usize; 4],
    ls: usize,
    median_ms: f64,
    gflops: f64,
    speedup: f64,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    threads: usize,
    reps: usize,
    gpu: Option<String>,
    timings: Vec<Timing>,
}

fn median_ms(mut samples: Vec<f64>) -> f64 {
    samples.sort_by(f64::total_cmp);
    samples.get(samples.len() / 2).copied().unwrap_or(f64::NAN)
}

fn time_reps(reps: usize, mut f: impl FnMut()) -> f64 {
    f();
    let samples = (0..reps)
        .map(|_| {
            let t0 = Instant::now();
            f();
            t0.elapsed().as_secs_f64() * 1000.0
        })
        .collect();
    median_ms(samples)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Wilson Hopping Kernel Benchmark                           ║");
    println!("║  Generic / HandUnroll / InlineAsm / Gpu (+ WGSL shader)     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");

    let args: Vec<String> = std::env::args().collect();
    let flag_value = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let with_gpu = args.iter().any(|a| a == "--gpu");
    let json_path = flag_value("--json");
    let reps = flag_value("--reps")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20usize);

    let gpu = if with_gpu {
        match tokio::runtime::Runtime::new()
            .map_err(|e| e.to_string())
            .and_then(|rt| rt.block_on(GpuF64::new()).map_err(|e| e.to_string()))
        {
            Ok(g) => {
                g.print_info();
                Some(g)
            }
            Err(e) => {
                println!("  GPU not available: {e}");
                GpuF64::print_available_adapters();
                None
            }
        }
    } else {
        None
    };

    let mut report = BenchReport {
        threads: rayon::current_num_threads(),
        reps,
        gpu: gpu.as_ref().map(|g| g.adapter_name.clone()),
        timings: Vec::new(),
    };
    println!("  {} rayon threads, {reps} timed repetitions", report.threads);

    for (dims, ls) in LATTICES {
        println!();
        println!("═══ {dims:?}, Ls = {ls} ════════════════════════════════════");
        let stencil = match Stencil::periodic(dims) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("  {e}");
                continue;
            }
        };
        let gauge = DoubledGaugeField::new(&GaugeField::<f64, 3>::hot_start(dims, 42));
        let input = FermionField::random(stencil.nsite(), ls, 7);
        let halo = HaloBuffer::empty(ls);
        let dargs = DhopArgs {
            stencil: &stencil,
            gauge: &gauge,
            halo: &halo,
            input: &input,
            legs: Legs::All,
        };
        let work = FLOPS_PER_SITE * (stencil.nsite() * ls) as f64;
        let mut out = FermionField::zeros(stencil.nsite(), ls);
        let mut generic_ms = f64::NAN;

        let mut record = |backend: String, ms: f64, generic_ms: f64| {
            let gflops = work / (ms * 1e6);
            let speedup = generic_ms / ms;
            println!("  {backend:<12} {ms:>9.3} ms  {gflops:>7.2} GFLOP/s  ×{speedup:.2}");
            report.timings.push(Timing {
                backend,
                dims,
                ls,
                median_ms: ms,
                gflops,
                speedup,
            });
        };

        for opt in KernelOpt::ALL {
            let kernels = WilsonKernels::<Su3Fundamental, 3>::new(opt);
            let mut failed = None;
            let ms = time_reps(reps, || {
                out.zero();
                if let Err(e) = kernels.dhop(&dargs, &mut out, false) {
                    failed = Some(e);
                }
            });
            if let Some(e) = failed {
                eprintln!("  {opt}: {e}");
                continue;
            }
            if opt == KernelOpt::Generic {
                generic_ms = ms;
            }
            record(opt.to_string(), ms, generic_ms);
        }

        if let Some(gpu) = &gpu {
            let dev = match WilsonDhopGpu::new(gpu, &stencil, &gauge) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("  shader: {e}");
                    continue;
                }
            };
            let mut failed = None;
            let ms = time_reps(reps, || {
                out.zero();
                if let Err(e) = dev.dhop(gpu, &halo, &input, &mut out, Legs::All, false) {
                    failed = Some(e);
                }
            });
            match failed {
                Some(e) => eprintln!("  shader: {e}"),
                None => record("WGSL".to_string(), ms, generic_ms),
            }
        }
    }

    if let Some(path) = json_path {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => match std::fs::write(&path, text) {
                Ok(()) => println!("\n  report written to {path}"),
                Err(e) => eprintln!("  cannot write {path}: {e}"),
            },
            Err(e) => eprintln!("  {e}"),
        }
    }
}
