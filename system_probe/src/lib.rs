mod descriptor;
mod gpu;
mod probe;
mod recommend;

pub mod display;

pub use descriptor::{round2, GpuDevice, GpuSource, HardwareDescriptor};
pub use gpu::{parse_nvidia_smi_csv, GpuQuery, NvidiaSmi, RuntimeDevices};
pub use probe::HardwareProber;
pub use recommend::{recommend, Recommendation, MODERATE_GPU_GB, VLLM_MIN_GPU_GB};
