use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single external tool invocation. Terminal for that call.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

impl ExecutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }
}

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("DataFrame error: {0}")]
    DataFrame(String),
}
