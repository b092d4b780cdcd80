use crate::parser::{FrameBufferMap, UtilizationMap, parse_frame_buffer, parse_utilization};
use crate::sampler::GpuSampler;
use crate::utils::errors::ExecutionError;
use async_trait::async_trait;
use log::debug;

/// Sampler that replays captured pmon output instead of running the tool.
#[derive(Debug, Clone, Default)]
pub struct FixtureSampler {
    utilization_output: String,
    frame_buffer_output: String,
}

impl FixtureSampler {
    pub fn new(
        utilization_output: impl Into<String>,
        frame_buffer_output: impl Into<String>,
    ) -> Self {
        Self {
            utilization_output: utilization_output.into(),
            frame_buffer_output: frame_buffer_output.into(),
        }
    }
}

#[async_trait]
impl GpuSampler for FixtureSampler {
    async fn sample_utilization(&self) -> Result<UtilizationMap, ExecutionError> {
        debug!("Fixture utilization sample");
        Ok(parse_utilization(&self.utilization_output))
    }

    async fn sample_frame_buffer(&self) -> Result<FrameBufferMap, ExecutionError> {
        debug!("Fixture frame buffer sample");
        Ok(parse_frame_buffer(&self.frame_buffer_output))
    }

    fn is_available(&self) -> bool {
        true // Fixture is always available
    }
}
