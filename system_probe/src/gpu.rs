use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::descriptor::{round2, GpuDevice, GpuSource, BYTES_PER_GB};

const NVIDIA_SMI_QUERY: &str = "--query-gpu=index,name,memory.total,memory.used,memory.free";
const NVIDIA_SMI_FORMAT: &str = "--format=csv,noheader,nounits";
const NVIDIA_SMI_FIELDS: usize = 5;

const NVIDIA_PROC_ROOT: &str = "/proc/driver/nvidia/gpus";
const DRM_CLASS_ROOT: &str = "/sys/class/drm";
const AMD_VENDOR_ID: &str = "0x1002";

/// One way of enumerating accelerator devices.
pub trait GpuQuery {
    fn source(&self) -> GpuSource;
    fn query(&self) -> Result<Vec<GpuDevice>>;
}

/// Vendor utility query; reports total, used and free memory per device.
pub struct NvidiaSmi {
    program: String,
}

impl Default for NvidiaSmi {
    fn default() -> Self {
        Self {
            program: "nvidia-smi".to_string(),
        }
    }
}

impl NvidiaSmi {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl GpuQuery for NvidiaSmi {
    fn source(&self) -> GpuSource {
        GpuSource::NvidiaSmi
    }

    fn query(&self) -> Result<Vec<GpuDevice>> {
        let output = Command::new(&self.program)
            .args([NVIDIA_SMI_QUERY, NVIDIA_SMI_FORMAT])
            .output()
            .with_context(|| format!("Failed to run '{}'; is the NVIDIA driver installed and on PATH?", self.program))?;

        if !output.status.success() {
            bail!(
                "{} failed ({}): {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_nvidia_smi_csv(&String::from_utf8_lossy(&output.stdout))
    }
}

fn mib_to_gb(mib: u64) -> f64 {
    round2(mib as f64 / 1024.0)
}

/// Parse `index,name,memory.total,memory.used,memory.free` rows in MiB.
/// Rows that do not parse are skipped with a warning.
pub fn parse_nvidia_smi_csv(raw: &str) -> Result<Vec<GpuDevice>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut devices = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read nvidia-smi output")?;
        match parse_row(&record) {
            Ok(device) => devices.push(device),
            Err(e) => warn!("Could not parse nvidia-smi output row {:?}: {:#}", record, e),
        }
    }
    Ok(devices)
}

fn parse_row(record: &csv::StringRecord) -> Result<GpuDevice> {
    if record.len() != NVIDIA_SMI_FIELDS {
        bail!("expected {} fields, got {}", NVIDIA_SMI_FIELDS, record.len());
    }

    let field = |i: usize| record.get(i).context("Missing field");
    let mib = |i: usize| -> Result<f64> {
        let value = field(i)?;
        let parsed: u64 = value
            .parse()
            .with_context(|| format!("Failed to parse memory value '{}'", value))?;
        Ok(mib_to_gb(parsed))
    };

    Ok(GpuDevice {
        index: field(0)?.parse().context("Failed to parse index")?,
        name: field(1)?.to_string(),
        memory_total_gb: Some(mib(2)?),
        memory_used_gb: Some(mib(3)?),
        memory_free_gb: Some(mib(4)?),
    })
}

/// Fallback enumeration through the OS driver interfaces.
///
/// Names come from the NVIDIA procfs tree, AMD cards are read from DRM sysfs
/// together with their VRAM size. Free memory is never known here.
pub struct RuntimeDevices {
    nvidia_proc: PathBuf,
    drm_class: PathBuf,
}

impl Default for RuntimeDevices {
    fn default() -> Self {
        Self::with_roots(NVIDIA_PROC_ROOT, DRM_CLASS_ROOT)
    }
}

impl RuntimeDevices {
    pub fn with_roots(nvidia_proc: impl Into<PathBuf>, drm_class: impl Into<PathBuf>) -> Self {
        Self {
            nvidia_proc: nvidia_proc.into(),
            drm_class: drm_class.into(),
        }
    }

    fn nvidia_devices(&self) -> Result<Vec<GpuDevice>> {
        let mut devices = Vec::new();
        for dir in sorted_entries(&self.nvidia_proc)? {
            let info = match fs::read_to_string(dir.join("information")) {
                Ok(info) => info,
                Err(e) => {
                    debug!("Skipping {:?}: {}", dir, e);
                    continue;
                }
            };
            let name = info
                .lines()
                .find_map(|line| line.strip_prefix("Model:"))
                .map(|name| name.trim().to_string())
                .unwrap_or_else(|| "NVIDIA GPU".to_string());

            devices.push(GpuDevice {
                index: 0,
                name,
                memory_total_gb: None,
                memory_free_gb: None,
                memory_used_gb: None,
            });
        }
        Ok(devices)
    }

    fn amd_devices(&self) -> Result<Vec<GpuDevice>> {
        let mut devices = Vec::new();
        for card in sorted_entries(&self.drm_class)? {
            let is_card = card
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("card"))
                .map_or(false, |rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
            if !is_card {
                continue;
            }

            let device = card.join("device");
            let vendor = read_trimmed(&device.join("vendor"));
            if vendor.as_deref() != Some(AMD_VENDOR_ID) {
                continue;
            }

            let memory_total_gb = read_trimmed(&device.join("mem_info_vram_total"))
                .and_then(|bytes| bytes.parse::<u64>().ok())
                .map(|bytes| round2(bytes as f64 / BYTES_PER_GB));
            let name = read_trimmed(&device.join("product_name"))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "AMD GPU".to_string());

            devices.push(GpuDevice {
                index: 0,
                name,
                memory_total_gb,
                memory_free_gb: None,
                memory_used_gb: None,
            });
        }
        Ok(devices)
    }
}

impl GpuQuery for RuntimeDevices {
    fn source(&self) -> GpuSource {
        GpuSource::Runtime
    }

    fn query(&self) -> Result<Vec<GpuDevice>> {
        if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            // Apple Silicon exposes a single MPS device; its memory is shared with the host.
            return Ok(vec![GpuDevice {
                index: 0,
                name: "Apple MPS".to_string(),
                memory_total_gb: None,
                memory_free_gb: None,
                memory_used_gb: None,
            }]);
        }

        let mut devices = self.nvidia_devices()?;
        devices.extend(self.amd_devices()?);
        for (index, device) in devices.iter_mut().enumerate() {
            device.index = index as u32;
        }
        Ok(devices)
    }
}

fn sorted_entries(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(root)
        .with_context(|| format!("Failed to list {:?}", root))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
