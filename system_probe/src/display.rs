use std::fmt::Write;

use crate::descriptor::{GpuSource, HardwareDescriptor};

const LOW_RAM_GB: f64 = 16.0;
const LOW_GPU_FREE_GB: f64 = 8.0;

fn gb(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Human readable block describing the probed host.
pub fn render(info: &HardwareDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- System Information ---");
    let _ = writeln!(out, "Platform: {} ({})", info.platform, info.architecture);
    let _ = writeln!(
        out,
        "CPU Cores: {} (Physical), {} (Logical)",
        info.cpu_cores.map_or_else(|| "N/A".to_string(), |c| c.to_string()),
        info.cpu_logical
    );
    let _ = writeln!(
        out,
        "RAM: {} GB Available / {} GB Total",
        info.ram_available_gb, info.ram_total_gb
    );
    let _ = writeln!(out, "GPU Source: {}", info.gpu_source);

    if info.gpu_available {
        let _ = writeln!(out, "GPU: Detected {} device(s)", info.gpu_count());
        for gpu in &info.gpu_devices {
            let _ = writeln!(
                out,
                "  GPU {}: {} | Total Mem: {} GB | Free Mem: {} GB | Used Mem: {} GB",
                gpu.index,
                gpu.name,
                gb(gpu.memory_total_gb),
                gb(gpu.memory_free_gb),
                gb(gpu.memory_used_gb)
            );
        }
    } else if let Some(err) = &info.gpu_error {
        let _ = writeln!(out, "GPU: Error detecting GPU details: {}", err);
    } else {
        let _ = writeln!(out, "GPU: No compatible devices detected by '{}'.", info.gpu_source);
    }
    let _ = writeln!(out, "--------------------------");

    for note in notes(info) {
        let _ = writeln!(out, "NOTE: {}", note);
    }
    out
}

/// Hardware warnings worth surfacing before a run.
pub fn notes(info: &HardwareDescriptor) -> Vec<String> {
    let mut notes = Vec::new();
    if info.ram_available_gb < LOW_RAM_GB {
        notes.push(format!(
            "Available RAM is less than {}GB. Large models might lead to performance issues or errors.",
            LOW_RAM_GB
        ));
    }
    if info.gpu_source == GpuSource::NvidiaSmi {
        if let Some(free) = info.first_gpu().and_then(|gpu| gpu.memory_free_gb) {
            if free < LOW_GPU_FREE_GB {
                notes.push(format!(
                    "Available GPU memory on device 0 is less than {}GB ({}GB free). Loading large models might fail.",
                    LOW_GPU_FREE_GB, free
                ));
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::GpuDevice;

    fn host(ram_available_gb: f64, free: Option<f64>) -> HardwareDescriptor {
        HardwareDescriptor {
            platform: "linux".into(),
            architecture: "x86_64".into(),
            cpu_cores: None,
            cpu_logical: 4,
            ram_total_gb: 32.0,
            ram_available_gb,
            gpu_available: true,
            gpu_devices: vec![GpuDevice {
                index: 0,
                name: "Tesla T4".into(),
                memory_total_gb: Some(15.0),
                memory_free_gb: free,
                memory_used_gb: None,
            }],
            gpu_source: GpuSource::NvidiaSmi,
            gpu_error: None,
        }
    }

    #[test]
    fn test_render_lists_devices() {
        let text = render(&host(24.0, Some(14.5)));
        assert!(text.contains("CPU Cores: N/A (Physical), 4 (Logical)"));
        assert!(text.contains("GPU 0: Tesla T4 | Total Mem: 15 GB | Free Mem: 14.5 GB | Used Mem: N/A GB"));
        assert!(!text.contains("NOTE"));
    }

    #[test]
    fn test_low_resources_produce_notes() {
        let notes = notes(&host(8.0, Some(2.0)));
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("RAM"));
        assert!(notes[1].contains("2GB free"));
    }

    #[test]
    fn test_failed_queries_report_the_error() {
        let mut info = host(24.0, None);
        info.gpu_available = false;
        info.gpu_devices.clear();
        info.gpu_source = GpuSource::None;
        info.gpu_error = Some("no driver".into());

        let text = render(&info);
        assert!(text.contains("GPU: Error detecting GPU details: no driver"));
        assert!(!text.contains("nvidia-smi failed"));
    }
}
