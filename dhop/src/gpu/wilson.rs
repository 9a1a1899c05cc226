// SPDX-License-Identifier: AGPL-3.0-only

//! Wilson hopping term as an f64 WGSL compute shader.
//!
//! One invocation per fermion index `sF`, reading the same flat buffers as
//! [`crate::kernels::device`]: links `[site][leg][row][col][re, im]`, the
//! stencil's `[site][leg]` offset and flag tables, spinors
//! `[sF][spin][color][re, im]` and halo `[slot][s][half][color][re, im]`.
//! The output buffer is seeded with the caller's field and accumulated
//! into, so the shader has the same add-into semantics as the host
//! kernels.
//!
//! SU(3) fundamental only; `params.legs` bit 0 selects local legs, bit 1
//! halo legs.

use super::GpuF64;
use crate::error::DhopError;
use crate::kernels::Legs;
use crate::lattice::complex::WGSL_COMPLEX64;
use crate::lattice::constants::N_SPIN;
use crate::lattice::gauge::DoubledGaugeField;
use crate::lattice::spinor::FermionField;
use crate::lattice::stencil::{HaloBuffer, Stencil};

const WORKGROUP_SIZE: usize = 64;

/// Kernel body; prepend [`WGSL_COMPLEX64`] (see [`shader_source`]).
pub const WGSL_WILSON_DHOP_F64: &str = r"
struct Params {
    nsite: u32,
    ls: u32,
    legs: u32,
    dag: u32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> links: array<f64>;
@group(0) @binding(2) var<storage, read> offsets: array<u32>;
@group(0) @binding(3) var<storage, read> flags: array<u32>;
@group(0) @binding(4) var<storage, read> psi_in: array<f64>;
@group(0) @binding(5) var<storage, read> halo: array<f64>;
@group(0) @binding(6) var<storage, read_write> psi_out: array<f64>;

fn psi_at(sf: u32, sp: u32, c: u32) -> Complex64 {
    let k = sf * 24u + (sp * 3u + c) * 2u;
    return Complex64(psi_in[k], psi_in[k + 1u]);
}

fn halo_at(idx: u32, h: u32, c: u32) -> Complex64 {
    let k = idx * 12u + (h * 3u + c) * 2u;
    return Complex64(halo[k], halo[k + 1u]);
}

fn link_at(k: u32, i: u32, j: u32) -> Complex64 {
    let b = k * 18u + (i * 3u + j) * 2u;
    return Complex64(links[b], links[b + 1u]);
}

fn pm(a: Complex64, b: Complex64, plus: bool) -> Complex64 {
    if plus {
        return c64_add(a, b);
    }
    return c64_sub(a, b);
}

fn times_i(a: Complex64, plus: bool) -> Complex64 {
    if plus {
        return c64_mul_i(a);
    }
    return c64_mul_minus_i(a);
}

fn with_sign(a: Complex64, plus: bool) -> Complex64 {
    if plus {
        return a;
    }
    return c64_neg(a);
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>,
        @builtin(num_workgroups) nwg: vec3<u32>) {
    let sf = gid.x + gid.y * nwg.x * 64u;
    if sf >= params.nsite * params.ls {
        return;
    }
    let site = sf / params.ls;
    let s = sf % params.ls;

    var acc: array<array<Complex64, 3>, 4>;
    for (var sp = 0u; sp < 4u; sp = sp + 1u) {
        for (var c = 0u; c < 3u; c = c + 1u) {
            acc[sp][c] = c64_zero();
        }
    }

    for (var leg = 0u; leg < 8u; leg = leg + 1u) {
        let k = site * 8u + leg;
        let f = flags[k];
        let is_local = (f & 1u) != 0u;
        if is_local && (params.legs & 1u) == 0u {
            continue;
        }
        if !is_local && (params.legs & 2u) == 0u {
            continue;
        }
        let mu = leg % 4u;
        let plus = (leg < 4u) == (params.dag != 0u);
        let at = offsets[k] * params.ls + s;

        var chi: array<array<Complex64, 3>, 2>;
        for (var c = 0u; c < 3u; c = c + 1u) {
            var h0: Complex64;
            var h1: Complex64;
            if is_local {
                let p0 = psi_at(at, 0u, c);
                let p1 = psi_at(at, 1u, c);
                let p2 = psi_at(at, 2u, c);
                let p3 = psi_at(at, 3u, c);
                switch mu {
                    case 0u: {
                        h0 = pm(p0, c64_mul_i(p3), plus);
                        h1 = pm(p1, c64_mul_i(p2), plus);
                    }
                    case 1u: {
                        h0 = pm(p0, p3, !plus);
                        h1 = pm(p1, p2, plus);
                    }
                    case 2u: {
                        h0 = pm(p0, c64_mul_i(p2), plus);
                        h1 = pm(p1, c64_mul_i(p3), !plus);
                    }
                    default: {
                        h0 = pm(p0, p2, plus);
                        h1 = pm(p1, p3, plus);
                    }
                }
            } else {
                h0 = halo_at(at, 0u, c);
                h1 = halo_at(at, 1u, c);
            }
            if (f & 2u) != 0u {
                h0 = c64_neg(h0);
                h1 = c64_neg(h1);
            }
            chi[0][c] = h0;
            chi[1][c] = h1;
        }

        for (var i = 0u; i < 3u; i = i + 1u) {
            var u0 = c64_zero();
            var u1 = c64_zero();
            for (var j = 0u; j < 3u; j = j + 1u) {
                let u = link_at(k, i, j);
                u0 = c64_add(u0, c64_mul(u, chi[0][j]));
                u1 = c64_add(u1, c64_mul(u, chi[1][j]));
            }
            var r2: Complex64;
            var r3: Complex64;
            switch mu {
                case 0u: {
                    r2 = times_i(u1, !plus);
                    r3 = times_i(u0, !plus);
                }
                case 1u: {
                    r2 = with_sign(u1, plus);
                    r3 = with_sign(u0, !plus);
                }
                case 2u: {
                    r2 = times_i(u0, !plus);
                    r3 = times_i(u1, plus);
                }
                default: {
                    r2 = with_sign(u0, plus);
                    r3 = with_sign(u1, plus);
                }
            }
            acc[0][i] = c64_add(acc[0][i], u0);
            acc[1][i] = c64_add(acc[1][i], u1);
            acc[2][i] = c64_add(acc[2][i], r2);
            acc[3][i] = c64_add(acc[3][i], r3);
        }
    }

    for (var sp = 0u; sp < 4u; sp = sp + 1u) {
        for (var c = 0u; c < 3u; c = c + 1u) {
            let k = sf * 24u + (sp * 3u + c) * 2u;
            psi_out[k] = psi_out[k] + acc[sp][c].re;
            psi_out[k + 1u] = psi_out[k + 1u] + acc[sp][c].im;
        }
    }
}
";

/// Complete shader: complex helpers followed by the kernel body.
#[must_use]
pub fn shader_source() -> String {
    format!("{WGSL_COMPLEX64}\n{WGSL_WILSON_DHOP_F64}")
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DhopParams {
    nsite: u32,
    ls: u32,
    legs: u32,
    dag: u32,
}

const fn legs_bits(legs: Legs) -> u32 {
    match legs {
        Legs::All => 3,
        Legs::Interior => 1,
        Legs::Exterior => 2,
    }
}

/// Resident links and stencil tables plus the compiled pipeline.
pub struct WilsonDhopGpu {
    pipeline: wgpu::ComputePipeline,
    links: wgpu::Buffer,
    offsets: wgpu::Buffer,
    flags: wgpu::Buffer,
    nsite: usize,
    n_halo: usize,
}

impl WilsonDhopGpu {
    /// Upload the gauge links and stencil tables once.
    ///
    /// # Errors
    ///
    /// [`DhopError::NoShaderF64`] without f64 shader support,
    /// [`DhopError::LayoutMismatch`] if gauge and stencil disagree.
    pub fn new(
        gpu: &GpuF64,
        stencil: &Stencil,
        gauge: &DoubledGaugeField<f64, 3>,
    ) -> Result<Self, DhopError> {
        if !gpu.has_f64 {
            return Err(DhopError::NoShaderF64);
        }
        if gauge.nsite != stencil.nsite() {
            return Err(DhopError::LayoutMismatch(format!(
                "gauge field has {} sites, stencil {}",
                gauge.nsite,
                stencil.nsite()
            )));
        }
        log::debug!(
            "uploading {} sites of links and stencil to {}",
            stencil.nsite(),
            gpu.adapter_name
        );
        Ok(Self {
            pipeline: gpu.create_pipeline(&shader_source(), "wilson_dhop_f64"),
            links: gpu.create_f64_buffer(gauge.flat(), "links"),
            offsets: gpu.create_u32_buffer(stencil.device_offsets(), "offsets"),
            flags: gpu.create_u32_buffer(stencil.device_flags(), "flags"),
            nsite: stencil.nsite(),
            n_halo: stencil.n_halo(),
        })
    }

    /// `out += Dhop · input` (or `Dhop†`) over the legs in `legs`.
    ///
    /// # Errors
    ///
    /// [`DhopError::LayoutMismatch`] on inconsistent extents,
    /// [`DhopError::GpuCompute`] if the readback fails.
    pub fn dhop(
        &self,
        gpu: &GpuF64,
        halo: &HaloBuffer<f64, 3>,
        input: &FermionField<f64, 3>,
        out: &mut FermionField<f64, 3>,
        legs: Legs,
        dag: bool,
    ) -> Result<(), DhopError> {
        let ls = input.ls;
        if ls == 0 || input.nsite != self.nsite || out.nsite != self.nsite || out.ls != ls {
            return Err(DhopError::LayoutMismatch(format!(
                "fields {}x{} / {}x{} on a {}-site stencil",
                input.nsite, ls, out.nsite, out.ls, self.nsite
            )));
        }
        if legs.reads_halo() && halo.data.len() < self.n_halo * ls {
            return Err(DhopError::LayoutMismatch(format!(
                "halo holds {} half spinors, stencil needs {}",
                halo.data.len(),
                self.n_halo * ls
            )));
        }
        let lanes = self.nsite * ls;
        let to_u32 = |v: usize| {
            u32::try_from(v).map_err(|_| DhopError::LayoutMismatch(format!("{v} exceeds u32")))
        };
        let params = DhopParams {
            nsite: to_u32(self.nsite)?,
            ls: to_u32(ls)?,
            legs: legs_bits(legs),
            dag: u32::from(dag),
        };
        let params_buf = gpu.create_uniform_buffer(bytemuck::bytes_of(&params), "dhop_params");
        let input_buf = gpu.create_f64_buffer(input.flat(), "psi_in");
        let halo_buf = gpu.create_f64_buffer(halo.flat(), "halo");
        let out_buf = gpu.create_f64_output_buffer(out.flat(), "psi_out");

        let bind_group = gpu.create_bind_group(
            &self.pipeline,
            &[
                &params_buf,
                &self.links,
                &self.offsets,
                &self.flags,
                &input_buf,
                &halo_buf,
                &out_buf,
            ],
        );
        let workgroups = to_u32(lanes.div_ceil(WORKGROUP_SIZE))?;
        let count = lanes * N_SPIN * 3 * 2;
        let result = gpu.dispatch_and_read(&self.pipeline, &bind_group, workgroups, &out_buf, count)?;
        if result.len() != count {
            return Err(DhopError::GpuCompute(format!(
                "read back {} values, expected {count}",
                result.len()
            )));
        }
        out.flat_mut().copy_from_slice(&result);
        Ok(())
    }
}
