use crate::config::{SHOW_ALL_DEVICES_ENV, SamplerConfig};
use crate::parser::{FrameBufferMap, UtilizationMap, parse_frame_buffer, parse_utilization};
use crate::sampler::GpuSampler;
use crate::utils::command::{resolve_on_path, run_with_timeout};
use crate::utils::errors::ExecutionError;
use async_trait::async_trait;
use log::{debug, warn};

const UTILIZATION_ARGS: &[&str] = &["pmon", "-c", "1"];
const FRAME_BUFFER_ARGS: &[&str] = &["pmon", "-c", "1", "-s", "m"];

/// Sampler backed by `nvidia-smi pmon`.
#[derive(Debug, Clone, Default)]
pub struct NvidiaSmi {
    config: SamplerConfig,
}

impl NvidiaSmi {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    async fn query(&self, args: &[&str]) -> Result<String, ExecutionError> {
        let envs: &[(&str, &str)] = if self.config.show_all_devices {
            &[(SHOW_ALL_DEVICES_ENV, "1")]
        } else {
            &[]
        };
        run_with_timeout(&self.config.command, args, envs, self.config.timeout).await
    }
}

#[async_trait]
impl GpuSampler for NvidiaSmi {
    async fn sample_utilization(&self) -> Result<UtilizationMap, ExecutionError> {
        let out = self.query(UTILIZATION_ARGS).await?;
        let parsed = parse_utilization(&out);
        debug!("pmon utilization: {} processes", parsed.len());
        Ok(parsed)
    }

    async fn sample_frame_buffer(&self) -> Result<FrameBufferMap, ExecutionError> {
        let out = self.query(FRAME_BUFFER_ARGS).await?;
        let parsed = parse_frame_buffer(&out);
        debug!("pmon frame buffer: {} processes", parsed.len());
        Ok(parsed)
    }

    fn is_available(&self) -> bool {
        match resolve_on_path(&self.config.command) {
            Some(path) => {
                debug!("{} resolved to {}", self.config.command, path.display());
                true
            }
            None => {
                warn!("{} is not in your PATH", self.config.command);
                false
            }
        }
    }
}
