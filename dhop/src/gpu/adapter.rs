// SPDX-License-Identifier: AGPL-3.0-only

//! GPU adapter discovery and selection.
//!
//! Runtime capability probing, no hardcoded GPU assumptions. The adapter is
//! chosen by `HOTSPRING_GPU_ADAPTER` or auto-detected by `SHADER_F64`
//! support, and the backend set by `HOTSPRING_WGPU_BACKEND`.

use crate::error::DhopError;

pub const ENV_ADAPTER: &str = "HOTSPRING_GPU_ADAPTER";
pub const ENV_BACKEND: &str = "HOTSPRING_WGPU_BACKEND";

/// Summary of a discovered GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Enumeration index (stable within a single run).
    pub index: usize,
    pub name: String,
    /// Driver name (e.g. `"NVIDIA"`, `"NVK"`, `"radv"`).
    pub driver: String,
    pub has_f64: bool,
    pub device_type: wgpu::DeviceType,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let precision = if self.has_f64 { "f64" } else { "f32" };
        let kind = match self.device_type {
            wgpu::DeviceType::DiscreteGpu => "discrete",
            wgpu::DeviceType::IntegratedGpu => "integrated",
            wgpu::DeviceType::VirtualGpu => "virtual",
            wgpu::DeviceType::Cpu => "cpu",
            wgpu::DeviceType::Other => "other",
        };
        write!(
            f,
            "[{}] {} ({}, {kind}, {precision})",
            self.index, self.name, self.driver
        )
    }
}

/// Parsed value of `HOTSPRING_GPU_ADAPTER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterSelector {
    /// Unset or `auto`: first discrete `SHADER_F64` adapter, then any.
    Auto,
    /// Enumeration index, falling back to a name match on the digits.
    Index(usize),
    /// Case-insensitive name substring (e.g. `"titan"`, `"4070"`).
    Name(String),
}

impl AdapterSelector {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let v = value.trim().to_lowercase();
        if v.is_empty() || v == "auto" {
            Self::Auto
        } else if let Ok(idx) = v.parse() {
            Self::Index(idx)
        } else {
            Self::Name(v)
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&std::env::var(ENV_ADAPTER).unwrap_or_default())
    }
}

/// Backend set named by `HOTSPRING_WGPU_BACKEND` (`vulkan`, `metal`,
/// `dx12`; anything else means all).
#[must_use]
pub fn backends_from(value: Option<&str>) -> wgpu::Backends {
    match value.map(str::trim) {
        Some("vulkan") => wgpu::Backends::VULKAN,
        Some("metal") => wgpu::Backends::METAL,
        Some("dx12") => wgpu::Backends::DX12,
        _ => wgpu::Backends::all(),
    }
}

pub fn create_instance() -> wgpu::Instance {
    let backends = backends_from(std::env::var(ENV_BACKEND).ok().as_deref());
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

fn info_of(index: usize, adapter: &wgpu::Adapter) -> AdapterInfo {
    let info = adapter.get_info();
    AdapterInfo {
        index,
        name: info.name,
        driver: info.driver,
        has_f64: adapter.features().contains(wgpu::Features::SHADER_F64),
        device_type: info.device_type,
    }
}

#[must_use]
pub fn enumerate_adapters() -> Vec<AdapterInfo> {
    create_instance()
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .enumerate()
        .map(|(i, a)| info_of(i, a))
        .collect()
}

/// Index of the adapter `selector` picks among `infos`.
///
/// # Errors
///
/// [`DhopError::NoAdapter`] when nothing qualifies for `Auto`;
/// [`DhopError::DeviceCreation`] when an index or name matches nothing.
pub fn choose(infos: &[AdapterInfo], selector: &AdapterSelector) -> Result<usize, DhopError> {
    if infos.is_empty() {
        return Err(DhopError::NoAdapter);
    }
    let by_name = |needle: &str| {
        infos
            .iter()
            .position(|a| a.name.to_ascii_lowercase().contains(needle))
            .ok_or_else(|| DhopError::DeviceCreation(format!("no adapter matching '{needle}'")))
    };
    match selector {
        AdapterSelector::Auto => infos
            .iter()
            .position(|a| a.has_f64 && a.device_type == wgpu::DeviceType::DiscreteGpu)
            .or_else(|| infos.iter().position(|a| a.has_f64))
            .ok_or(DhopError::NoAdapter),
        AdapterSelector::Index(i) if *i < infos.len() => Ok(*i),
        AdapterSelector::Index(i) => by_name(&i.to_string()),
        AdapterSelector::Name(name) => by_name(name),
    }
}

/// Select an adapter per `HOTSPRING_GPU_ADAPTER`.
///
/// # Errors
///
/// See [`choose`].
pub fn select_adapter() -> Result<wgpu::Adapter, DhopError> {
    let selector = AdapterSelector::from_env();
    let adapters = create_instance().enumerate_adapters(wgpu::Backends::all());
    let infos: Vec<AdapterInfo> = adapters.iter().enumerate().map(|(i, a)| info_of(i, a)).collect();
    let idx = choose(&infos, &selector)?;
    log::info!("GPU adapter {} (selector {selector:?})", infos[idx]);
    adapters.into_iter().nth(idx).ok_or(DhopError::NoAdapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(index: usize, name: &str, has_f64: bool, device_type: wgpu::DeviceType) -> AdapterInfo {
        AdapterInfo {
            index,
            name: name.into(),
            driver: "test".into(),
            has_f64,
            device_type,
        }
    }

    fn pool() -> Vec<AdapterInfo> {
        vec![
            info(0, "llvmpipe", true, wgpu::DeviceType::Cpu),
            info(1, "Intel UHD 770", false, wgpu::DeviceType::IntegratedGpu),
            info(2, "NVIDIA TITAN V", true, wgpu::DeviceType::DiscreteGpu),
        ]
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(AdapterSelector::parse(""), AdapterSelector::Auto);
        assert_eq!(AdapterSelector::parse(" AUTO "), AdapterSelector::Auto);
        assert_eq!(AdapterSelector::parse("2"), AdapterSelector::Index(2));
        assert_eq!(AdapterSelector::parse("Titan"), AdapterSelector::Name("titan".into()));
    }

    #[test]
    fn auto_prefers_discrete_f64() {
        assert_eq!(choose(&pool(), &AdapterSelector::Auto), Ok(2));
        let no_discrete = &pool()[..2];
        assert_eq!(choose(no_discrete, &AdapterSelector::Auto), Ok(0));
        let no_f64 = &pool()[1..2];
        assert_eq!(choose(no_f64, &AdapterSelector::Auto), Err(DhopError::NoAdapter));
    }

    #[test]
    fn index_then_name_fallback() {
        assert_eq!(choose(&pool(), &AdapterSelector::Index(1)), Ok(1));
        // "770" is not an index, but matches a name.
        assert_eq!(choose(&pool(), &AdapterSelector::Index(770)), Ok(1));
        assert!(matches!(
            choose(&pool(), &AdapterSelector::Name("radeon".into())),
            Err(DhopError::DeviceCreation(_))
        ));
        assert_eq!(choose(&[], &AdapterSelector::Auto), Err(DhopError::NoAdapter));
    }

    #[test]
    fn backend_names() {
        assert_eq!(backends_from(Some("vulkan")), wgpu::Backends::VULKAN);
        assert_eq!(backends_from(None), wgpu::Backends::all());
        assert_eq!(backends_from(Some("opengl")), wgpu::Backends::all());
    }
}
