// SPDX-License-Identifier: AGPL-3.0-only

//! Kernel configuration: backend option and comms policy.
//!
//! Explicit configuration is threaded into [`crate::kernels::WilsonKernels`]
//! and [`crate::operator::WilsonOperator`]. A process-wide default exists for
//! binaries that want one knob:
//!
//! | Variable | Values |
//! |----------|--------|
//! | `HOTSPRING_DHOP_KERNEL` | `generic`, `hand_unroll`, `inline_asm`, `gpu`, or `0`–`3` |
//! | `HOTSPRING_DHOP_COMMS` | `comms_and_compute`, `comms_then_compute`, or `0`–`1` |
//!
//! The default is installed at most once ([`KernelConfig::install`]); the
//! first read without an install takes the environment, and an unparsable
//! environment is an error.

use crate::error::DhopError;
use crate::kernels::{CommsPolicy, KernelOpt};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const ENV_KERNEL: &str = "HOTSPRING_DHOP_KERNEL";
pub const ENV_COMMS: &str = "HOTSPRING_DHOP_COMMS";

static PROCESS_DEFAULT: OnceLock<KernelConfig> = OnceLock::new();

/// Backend and comms policy of a Dhop evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub opt: KernelOpt,
    pub comms: CommsPolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            opt: KernelOpt::Generic,
            comms: CommsPolicy::CommsAndCompute,
        }
    }
}

impl KernelConfig {
    #[must_use]
    pub const fn new(opt: KernelOpt, comms: CommsPolicy) -> Self {
        Self { opt, comms }
    }

    /// Read `HOTSPRING_DHOP_KERNEL` / `HOTSPRING_DHOP_COMMS`; unset
    /// variables keep their defaults.
    ///
    /// # Errors
    ///
    /// [`DhopError::Config`], [`DhopError::InvalidKernelOpt`] or
    /// [`DhopError::InvalidCommsPolicy`] for values that do not parse.
    pub fn from_env() -> Result<Self, DhopError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// As [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DhopError> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_KERNEL).filter(|v| !v.trim().is_empty()) {
            config.opt = v.parse()?;
        }
        if let Some(v) = lookup(ENV_COMMS).filter(|v| !v.trim().is_empty()) {
            config.comms = v.parse()?;
        }
        Ok(config)
    }

    /// Parse a JSON object such as `{"opt": "hand_unroll"}`.
    ///
    /// # Errors
    ///
    /// [`DhopError::Config`] with the serde message.
    pub fn from_json(text: &str) -> Result<Self, DhopError> {
        serde_json::from_str(text).map_err(|e| DhopError::Config(format!("kernel config: {e}")))
    }

    /// # Errors
    ///
    /// [`DhopError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DhopError> {
        serde_json::to_string(self).map_err(|e| DhopError::Config(e.to_string()))
    }

    /// Install as the process default.
    ///
    /// # Errors
    ///
    /// [`DhopError::AlreadyInstalled`] if a default was already installed
    /// or already read.
    pub fn install(self) -> Result<(), DhopError> {
        PROCESS_DEFAULT
            .set(self)
            .map_err(|_| DhopError::AlreadyInstalled)?;
        log::info!("dhop default: {} / {}", self.opt, self.comms);
        Ok(())
    }

    /// The process default; the environment when nothing was installed.
    ///
    /// # Errors
    ///
    /// As [`Self::from_env`]. An invalid environment is never replaced by
    /// [`Self::default`], and nothing is cached until it parses.
    pub fn process_default() -> Result<Self, DhopError> {
        let config = Self::resolve(PROCESS_DEFAULT.get().copied(), |key| std::env::var(key).ok())?;
        Ok(*PROCESS_DEFAULT.get_or_init(|| config))
    }

    fn resolve(
        installed: Option<Self>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DhopError> {
        match installed {
            Some(config) => Ok(config),
            None => Self::from_lookup(lookup),
        }
    }
}
