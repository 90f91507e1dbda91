use bench_runner::Backend;

use crate::descriptor::{GpuSource, HardwareDescriptor};

pub const VLLM_MIN_GPU_GB: f64 = 20.0;
pub const MODERATE_GPU_GB: f64 = 10.0;

/// Advisory backend choice plus the reasoning shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub backend: Backend,
    pub reason: String,
}

/// Only the first enumerated device drives the decision.
pub fn recommend(descriptor: &HardwareDescriptor) -> Recommendation {
    let first_gpu = match descriptor.first_gpu() {
        Some(gpu) if descriptor.gpu_available => gpu,
        _ => {
            return Recommendation {
                backend: Backend::Accelerate,
                reason: "No compatible GPU detected or issue obtaining GPU info.".to_string(),
            }
        }
    };

    let (backend, reason) = match first_gpu.memory_total_gb {
        Some(gb) if gb >= VLLM_MIN_GPU_GB => (Backend::Vllm, "Sufficient total GPU memory detected."),
        Some(gb) if gb >= MODERATE_GPU_GB => (Backend::Accelerate, "Moderate total GPU memory detected."),
        Some(_) => (Backend::Accelerate, "Limited total GPU memory detected."),
        None => (Backend::Accelerate, "Could not determine numeric GPU memory."),
    };

    let mut reason = reason.to_string();
    if descriptor.gpu_source == GpuSource::NvidiaSmi {
        if let Some(free) = first_gpu.memory_free_gb {
            reason.push_str(&format!(" Currently free memory on GPU 0 is approx. {} GB.", free));
        }
    }

    Recommendation { backend, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::GpuDevice;

    fn descriptor(totals: &[Option<f64>]) -> HardwareDescriptor {
        let gpu_devices = totals
            .iter()
            .enumerate()
            .map(|(i, total)| GpuDevice {
                index: i as u32,
                name: format!("GPU {}", i),
                memory_total_gb: *total,
                memory_free_gb: total.map(|t| t / 2.0),
                memory_used_gb: None,
            })
            .collect::<Vec<_>>();

        HardwareDescriptor {
            platform: "linux".into(),
            architecture: "x86_64".into(),
            cpu_cores: Some(8),
            cpu_logical: 16,
            ram_total_gb: 64.0,
            ram_available_gb: 32.0,
            gpu_available: !gpu_devices.is_empty(),
            gpu_devices,
            gpu_source: GpuSource::NvidiaSmi,
            gpu_error: None,
        }
    }

    #[test]
    fn test_no_gpu_recommends_accelerate() {
        assert_eq!(recommend(&descriptor(&[])).backend, Backend::Accelerate);
    }

    #[test]
    fn test_memory_thresholds() {
        assert_eq!(recommend(&descriptor(&[Some(80.0)])).backend, Backend::Vllm);
        assert_eq!(recommend(&descriptor(&[Some(20.0)])).backend, Backend::Vllm);
        assert_eq!(recommend(&descriptor(&[Some(19.99)])).backend, Backend::Accelerate);
        assert_eq!(recommend(&descriptor(&[Some(10.0)])).backend, Backend::Accelerate);
        assert_eq!(recommend(&descriptor(&[Some(4.0)])).backend, Backend::Accelerate);
    }

    #[test]
    fn test_unknown_memory_is_conservative() {
        assert_eq!(recommend(&descriptor(&[None])).backend, Backend::Accelerate);
        assert_eq!(recommend(&descriptor(&[Some(f64::NAN)])).backend, Backend::Accelerate);
    }

    #[test]
    fn test_only_first_device_counts() {
        assert_eq!(recommend(&descriptor(&[Some(8.0), Some(80.0)])).backend, Backend::Accelerate);
        assert_eq!(recommend(&descriptor(&[Some(24.0), Some(4.0)])).backend, Backend::Vllm);
    }

    #[test]
    fn test_unavailable_flag_overrides_device_list() {
        let mut d = descriptor(&[Some(40.0)]);
        d.gpu_available = false;
        assert_eq!(recommend(&d).backend, Backend::Accelerate);
    }

    #[test]
    fn test_free_memory_note_from_vendor_source() {
        let rec = recommend(&descriptor(&[Some(24.0)]));
        assert!(rec.reason.contains("approx. 12 GB"));

        let mut d = descriptor(&[Some(24.0)]);
        d.gpu_source = GpuSource::Runtime;
        assert!(!recommend(&d).reason.contains("free memory"));
    }
}
