pub mod fixture;
pub mod nvidia_smi;

pub use fixture::FixtureSampler;
pub use nvidia_smi::NvidiaSmi;
