use gpu_pmon::utils::logger::setup_logger;
use gpu_pmon::{GpuSampler, GpuSnapshot, NvidiaSmi, SamplerConfig};
use log::{error, info, warn};
use std::time::Duration;

const DEFAULT_POLLS: usize = 1;
const DEFAULT_INTERVAL_SECS: f64 = 1.0;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() {
    setup_logger();
    info!("Application started");

    let config = SamplerConfig::from_env();
    let polls: usize = env_or("GPU_PMON_POLLS", DEFAULT_POLLS);
    let interval_secs: f64 = env_or("GPU_PMON_INTERVAL_SECS", DEFAULT_INTERVAL_SECS);
    let interval = if interval_secs.is_finite() && interval_secs >= 0.0 {
        Duration::from_secs_f64(interval_secs)
    } else {
        Duration::from_secs_f64(DEFAULT_INTERVAL_SECS)
    };

    let sampler = NvidiaSmi::new(config);
    if !sampler.is_available() {
        info!("GPU sampling skipped");
        return;
    }
    info!("Sampling {} time(s) with {:?}", polls, sampler.config());

    for poll in 1..=polls {
        match GpuSnapshot::capture(&sampler).await {
            Ok(snapshot) => {
                info!("Poll {}: {} process/device rows", poll, snapshot.rows().len());
                for row in snapshot.rows() {
                    info!(
                        "  pid {} gpu {}: sm={} mem={} fb={}MB",
                        row.pid,
                        row.device,
                        row.sm.as_deref().unwrap_or("-"),
                        row.mem.as_deref().unwrap_or("-"),
                        row.fb.as_deref().unwrap_or("-"),
                    );
                }
                info!("Process groups: {:?}", snapshot.attribute());
            }
            Err(e) => error!("Poll {} failed: {}", poll, e),
        }

        if poll < polls {
            tokio::time::sleep(interval).await;
        }
    }

    info!("Program ended successfully.");
}
