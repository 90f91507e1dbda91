use sysinfo::System;
use tracing::{debug, instrument, warn};

use crate::descriptor::{round2, GpuDevice, GpuSource, HardwareDescriptor, BYTES_PER_GB};
use crate::gpu::{GpuQuery, NvidiaSmi, RuntimeDevices};

struct GpuProbe {
    source: GpuSource,
    devices: Vec<GpuDevice>,
    error: Option<String>,
}

/// Builds a fresh `HardwareDescriptor` on every call. Never fails; GPU query
/// errors degrade to the runtime fallback and finally to "no GPU".
pub struct HardwareProber {
    vendor: Box<dyn GpuQuery>,
    runtime: Box<dyn GpuQuery>,
}

impl HardwareProber {
    pub fn new(vendor: Box<dyn GpuQuery>, runtime: Box<dyn GpuQuery>) -> Self {
        Self { vendor, runtime }
    }

    pub fn system() -> Self {
        Self::new(Box::new(NvidiaSmi::default()), Box::new(RuntimeDevices::default()))
    }

    #[instrument(skip(self))]
    pub fn probe(&self) -> HardwareDescriptor {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();

        let gpu = self.probe_gpus();
        debug!("GPU probe via {} found {} device(s)", gpu.source, gpu.devices.len());

        HardwareDescriptor {
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: sys.physical_core_count(),
            cpu_logical: sys.cpus().len(),
            ram_total_gb: round2(sys.total_memory() as f64 / BYTES_PER_GB),
            ram_available_gb: round2(sys.available_memory() as f64 / BYTES_PER_GB),
            gpu_available: !gpu.devices.is_empty(),
            gpu_devices: gpu.devices,
            gpu_source: gpu.source,
            gpu_error: gpu.error,
        }
    }

    fn probe_gpus(&self) -> GpuProbe {
        let runtime = self.runtime.query();

        match self.vendor.query() {
            Ok(devices) => {
                let runtime_sees_devices = matches!(&runtime, Ok(found) if !found.is_empty());
                if !devices.is_empty() && !runtime_sees_devices {
                    warn!(
                        "{} found {} GPU(s), but the runtime query saw none. Check driver/runtime installation.",
                        self.vendor.source(),
                        devices.len()
                    );
                } else if devices.is_empty() && runtime_sees_devices {
                    warn!(
                        "The runtime query sees GPUs, but {} found none. Check driver/runtime consistency.",
                        self.vendor.source()
                    );
                }
                GpuProbe {
                    source: self.vendor.source(),
                    devices,
                    error: None,
                }
            }
            Err(e) => {
                warn!("{} unavailable, falling back to runtime query: {:#}", self.vendor.source(), e);
                match runtime {
                    Ok(devices) => GpuProbe {
                        source: self.runtime.source(),
                        devices,
                        error: None,
                    },
                    Err(e) => {
                        warn!("Could not get GPU info from the runtime query: {:#}", e);
                        GpuProbe {
                            source: GpuSource::None,
                            devices: Vec::new(),
                            error: Some(format!("{:#}", e)),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    struct Fixed {
        source: GpuSource,
        devices: Option<Vec<GpuDevice>>,
    }

    impl GpuQuery for Fixed {
        fn source(&self) -> GpuSource {
            self.source
        }

        fn query(&self) -> Result<Vec<GpuDevice>> {
            self.devices.clone().ok_or_else(|| anyhow!("query failed"))
        }
    }

    fn gpu(name: &str, total: Option<f64>) -> GpuDevice {
        GpuDevice {
            index: 0,
            name: name.to_string(),
            memory_total_gb: total,
            memory_free_gb: None,
            memory_used_gb: None,
        }
    }

    fn prober(vendor: Option<Vec<GpuDevice>>, runtime: Option<Vec<GpuDevice>>) -> HardwareProber {
        HardwareProber::new(
            Box::new(Fixed { source: GpuSource::NvidiaSmi, devices: vendor }),
            Box::new(Fixed { source: GpuSource::Runtime, devices: runtime }),
        )
    }

    #[test]
    fn test_vendor_query_wins_when_it_answers() {
        let descriptor = prober(Some(vec![gpu("A100", Some(40.0))]), Some(vec![gpu("A100", None)])).probe();

        assert!(descriptor.gpu_available);
        assert_eq!(descriptor.gpu_source, GpuSource::NvidiaSmi);
        assert_eq!(descriptor.gpu_devices[0].memory_total_gb, Some(40.0));
    }

    #[test]
    fn test_runtime_fallback_when_vendor_fails() {
        let descriptor = prober(None, Some(vec![gpu("RTX 3090", None)])).probe();

        assert!(descriptor.gpu_available);
        assert_eq!(descriptor.gpu_count(), 1);
        assert_eq!(descriptor.gpu_source, GpuSource::Runtime);
        assert!(descriptor.gpu_error.is_none());
    }

    #[test]
    fn test_mismatch_is_only_a_warning() {
        let descriptor = prober(Some(vec![gpu("A100", Some(40.0))]), Some(vec![])).probe();
        assert!(descriptor.gpu_available);

        let descriptor = prober(Some(vec![]), Some(vec![gpu("A100", None)])).probe();
        assert!(!descriptor.gpu_available);
        assert_eq!(descriptor.gpu_source, GpuSource::NvidiaSmi);
    }

    #[test]
    fn test_both_queries_failing_degrades_to_no_gpu() {
        let descriptor = prober(None, None).probe();

        assert!(!descriptor.gpu_available);
        assert_eq!(descriptor.gpu_count(), 0);
        assert_eq!(descriptor.gpu_source, GpuSource::None);
        assert!(descriptor.gpu_error.is_some());
    }

    #[test]
    fn test_host_fields_are_populated() {
        let descriptor = prober(Some(vec![]), Some(vec![])).probe();

        assert!(!descriptor.platform.is_empty());
        assert!(!descriptor.architecture.is_empty());
        assert!(descriptor.ram_total_gb > 0.0);
    }
}
