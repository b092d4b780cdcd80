use crate::parser::{FrameBufferMap, UtilizationMap};
use crate::utils::errors::ExecutionError;
use async_trait::async_trait;

/// Source of per-process GPU metrics.
///
/// Every call is an independent request/response cycle and returns a fresh
/// map. Implementations hold no state between calls.
#[async_trait]
pub trait GpuSampler: Send + Sync {
    /// pid -> device -> (sm %, mem %)
    async fn sample_utilization(&self) -> Result<UtilizationMap, ExecutionError>;

    /// pid -> device -> frame buffer MB
    async fn sample_frame_buffer(&self) -> Result<FrameBufferMap, ExecutionError>;

    /// Check if this sampler can run on the current system.
    ///
    /// When it cannot, the reason is reported through the `log` facade
    /// (`warn!`) and nothing is printed directly, so callers that want the
    /// notice on stderr must initialise a logger first, e.g.
    /// `utils::logger::setup_logger()`.
    fn is_available(&self) -> bool;
}
