use std::fmt;

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Round to two decimals, the precision every memory figure is reported in.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Which query produced the GPU section of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuSource {
    NvidiaSmi,
    Runtime,
    /// Every query failed.
    None,
}

impl fmt::Display for GpuSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuSource::NvidiaSmi => f.write_str("nvidia-smi"),
            GpuSource::Runtime => f.write_str("runtime (nvidia-smi failed)"),
            GpuSource::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpuDevice {
    pub index: u32,
    pub name: String,
    pub memory_total_gb: Option<f64>,
    pub memory_free_gb: Option<f64>,
    pub memory_used_gb: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HardwareDescriptor {
    pub platform: String,
    pub architecture: String,
    pub cpu_cores: Option<usize>,
    pub cpu_logical: usize,
    pub ram_total_gb: f64,
    pub ram_available_gb: f64,
    pub gpu_available: bool,
    pub gpu_devices: Vec<GpuDevice>,
    pub gpu_source: GpuSource,
    pub gpu_error: Option<String>,
}

impl HardwareDescriptor {
    pub fn gpu_count(&self) -> usize {
        self.gpu_devices.len()
    }

    pub fn first_gpu(&self) -> Option<&GpuDevice> {
        self.gpu_devices.first()
    }
}
