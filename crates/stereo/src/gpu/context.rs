use crate::error::StereoError;

/// Power preference passed to adapter selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Device and queue owned by a headless compositor instance.
///
/// Hosts that already own a device can skip this and hand theirs straight to
/// [`WgpuBackend::new`](super::WgpuBackend::new).
pub struct GpuContext {
    _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
    pub backend: wgpu::Backend,
    /// Whether samplers may use a transparent-black border.
    pub clamp_to_border: bool,
}

impl GpuContext {
    pub fn headless() -> Result<Self, StereoError> {
        Self::headless_with(GpuPowerPreference::default())
    }

    pub fn headless_with(gpu_power: GpuPowerPreference) -> Result<Self, StereoError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let power_preference = match gpu_power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| StereoError::allocation("GPU adapter", err.to_string()))?;

        let adapter_info = adapter.get_info();
        let clamp_to_border = adapter
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            clamp_to_border,
            "selected GPU adapter"
        );

        let mut required_features = wgpu::Features::empty();
        if clamp_to_border {
            required_features |= wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("stereo device"),
            required_features,
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| StereoError::allocation("GPU device", err.to_string()))?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_name: adapter_info.name,
            backend: adapter_info.backend,
            clamp_to_border,
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter_name", &self.adapter_name)
            .field("backend", &self.backend)
            .field("clamp_to_border", &self.clamp_to_border)
            .finish_non_exhaustive()
    }
}
