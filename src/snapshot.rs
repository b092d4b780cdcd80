use crate::parser::{DeviceId, FrameBufferMap, ProcessId, UtilizationMap};
use crate::sampler::GpuSampler;
use crate::utils::errors::MonitoringError;
use crate::utils::psutils::{ProcessGroup, collect_process_groups};
use itertools::{Itertools, multiunzip};
use log::debug;
use polars::prelude::*;
use std::collections::BTreeSet;

/// One poll of both pmon queries.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuSnapshot {
    /// Milliseconds since the UNIX epoch at which the poll started
    pub timestamp: i64,
    pub utilization: UtilizationMap,
    pub frame_buffer: FrameBufferMap,
}

/// Merged view of a (pid, device) pair across both queries
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDeviceRow {
    pub pid: ProcessId,
    pub device: DeviceId,
    pub sm: Option<String>,
    pub mem: Option<String>,
    pub fb: Option<String>,
}

impl GpuSnapshot {
    /// Run both queries for a single poll. Either failing fails the poll.
    pub async fn capture<S: GpuSampler + ?Sized>(sampler: &S) -> Result<Self, MonitoringError> {
        let timestamp = chrono::Utc::now().timestamp_millis();

        let (utilization, frame_buffer) =
            tokio::join!(sampler.sample_utilization(), sampler.sample_frame_buffer());

        let snapshot = Self {
            timestamp,
            utilization: utilization?,
            frame_buffer: frame_buffer?,
        };
        debug!(
            "Captured snapshot at {}: {} utilization pids, {} frame buffer pids",
            snapshot.timestamp,
            snapshot.utilization.len(),
            snapshot.frame_buffer.len()
        );
        Ok(snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.utilization.is_empty() && self.frame_buffer.is_empty()
    }

    /// Every (pid, device) seen by either query, sorted by pid then device
    pub fn rows(&self) -> Vec<ProcessDeviceRow> {
        let keys: BTreeSet<(&ProcessId, &DeviceId)> = self
            .utilization
            .iter()
            .flat_map(|(pid, devices)| devices.keys().map(move |dev| (pid, dev)))
            .chain(
                self.frame_buffer
                    .iter()
                    .flat_map(|(pid, devices)| devices.keys().map(move |dev| (pid, dev))),
            )
            .collect();

        keys.into_iter()
            .sorted_by(|a, b| {
                sort_key(a.0)
                    .cmp(&sort_key(b.0))
                    .then(sort_key(a.1).cmp(&sort_key(b.1)))
            })
            .map(|(pid, device)| {
                let util = self.utilization.get(pid).and_then(|d| d.get(device));
                let fb = self.frame_buffer.get(pid).and_then(|d| d.get(device));
                ProcessDeviceRow {
                    pid: pid.clone(),
                    device: device.clone(),
                    sm: util.map(|u| u.sm.clone()),
                    mem: util.map(|u| u.mem.clone()),
                    fb: fb.map(|f| f.fb.clone()),
                }
            })
            .collect()
    }

    /// Distinct numeric pids from both queries
    pub fn pids(&self) -> Vec<usize> {
        self.utilization
            .keys()
            .chain(self.frame_buffer.keys())
            .filter_map(|pid| pid.parse::<usize>().ok())
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// DataFrame: pid | device | sm | mem | fb | timestamp
    pub fn to_dataframe(&self) -> Result<DataFrame, MonitoringError> {
        let rows = self.rows();
        let (pids, devices, sm, mem, fb): (
            Vec<String>,
            Vec<String>,
            Vec<Option<f64>>,
            Vec<Option<f64>>,
            Vec<Option<f64>>,
        ) = multiunzip(rows.into_iter().map(|row| {
            (
                row.pid,
                row.device,
                parse_number(row.sm.as_deref()),
                parse_number(row.mem.as_deref()),
                parse_number(row.fb.as_deref()),
            )
        }));
        let timestamps = vec![self.timestamp; pids.len()];

        df![
            "pid" => pids,
            "device" => devices,
            "sm" => sm,
            "mem" => mem,
            "fb" => fb,
            "timestamp" => timestamps,
        ]
        .map_err(|e| {
            MonitoringError::DataFrame(format!("Failed to create snapshot DataFrame: {}", e))
        })
    }

    /// Attribute the sampled pids to (user, application) groups
    pub fn attribute(&self) -> Vec<ProcessGroup> {
        collect_process_groups(&self.pids())
    }
}

// Numeric ids sort numerically, anything else after them lexically.
fn sort_key(id: &str) -> (u64, &str) {
    (id.parse::<u64>().unwrap_or(u64::MAX), id)
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok())
}
