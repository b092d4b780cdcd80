//! Per-process GPU utilization and memory sampling via `nvidia-smi pmon`.

pub mod utils {
    pub mod command;
    pub mod errors;
    pub mod logger;
    pub mod psutils;
}

pub mod collectors;
pub mod config;
pub mod parser;
pub mod sampler;
pub mod snapshot;

pub use collectors::{FixtureSampler, NvidiaSmi};
pub use config::SamplerConfig;
pub use parser::{
    DeviceId, FrameBufferMap, FrameBufferSample, ProcessId, UtilizationMap, UtilizationSample,
};
pub use sampler::GpuSampler;
pub use snapshot::{GpuSnapshot, ProcessDeviceRow};
pub use utils::errors::{ExecutionError, MonitoringError};
