use log::warn;
use std::time::Duration;

pub const DEFAULT_COMMAND: &str = "nvidia-smi";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
/// Makes the tool report devices without an active context too.
pub const SHOW_ALL_DEVICES_ENV: &str = "NVSMI_SHOW_ALL_DEVICES";

/// Configuration for the command-backed sampler
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Executable name (resolved on PATH) or path (default: nvidia-smi)
    pub command: String,
    /// Upper bound for a single invocation, measured from spawn (default: 8s)
    pub timeout: Duration,
    /// Export NVSMI_SHOW_ALL_DEVICES=1 to the child (default: true)
    pub show_all_devices: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            timeout: DEFAULT_TIMEOUT,
            show_all_devices: true,
        }
    }
}

impl SamplerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_show_all_devices(mut self, show_all_devices: bool) -> Self {
        self.show_all_devices = show_all_devices;
        self
    }

    /// Defaults overridden by GPU_PMON_COMMAND, GPU_PMON_TIMEOUT_SECS and
    /// GPU_PMON_SHOW_ALL_DEVICES.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(command) = lookup("GPU_PMON_COMMAND").filter(|c| !c.trim().is_empty()) {
            config.command = command.trim().to_string();
        }

        if let Some(raw) = lookup("GPU_PMON_TIMEOUT_SECS") {
            match raw.trim().parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs > 0.0 => {
                    config.timeout = Duration::from_secs_f64(secs);
                }
                _ => warn!(
                    "Ignoring GPU_PMON_TIMEOUT_SECS={:?}, keeping {:?}",
                    raw, config.timeout
                ),
            }
        }

        if let Some(raw) = lookup("GPU_PMON_SHOW_ALL_DEVICES") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.show_all_devices = true,
                "0" | "false" | "no" => config.show_all_devices = false,
                other => warn!("Ignoring GPU_PMON_SHOW_ALL_DEVICES={:?}", other),
            }
        }

        config
    }
}
