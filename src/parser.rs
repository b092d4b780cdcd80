//! Parsers for `nvidia-smi pmon` tables.
//!
//! Output looks like this (utilization mode):
//!
//! ```text
//! # gpu     pid  type    sm   mem   enc   dec   command
//! # Idx       #   C/G     %     %     %     %   name
//!     0       -     -     -     -     -     -   -
//!    10   64756     C     0     0     0     0   pulpf
//! ```
//!
//! Columns are extracted by position. Values are returned as the raw
//! strings the tool printed; nothing is validated as numeric.

use log::debug;
use std::collections::HashMap;

pub type ProcessId = String;
pub type DeviceId = String;

/// pid -> device -> sample
pub type UtilizationMap = HashMap<ProcessId, HashMap<DeviceId, UtilizationSample>>;
/// pid -> device -> sample
pub type FrameBufferMap = HashMap<ProcessId, HashMap<DeviceId, FrameBufferSample>>;

/// Marker the tool prints in every column of an idle device slot.
pub const PLACEHOLDER: &str = "-";
const HEADER_LINES: usize = 2;

const UTILIZATION_FIELDS: usize = 8;
const FRAME_BUFFER_FIELDS: usize = 5;

const DEVICE_COLUMN: usize = 0;
const PID_COLUMN: usize = 1;
const SM_COLUMN: usize = 3;
const MEM_COLUMN: usize = 4;
const FB_COLUMN: usize = 3;

/// SM and memory-bandwidth utilization percentages, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilizationSample {
    pub sm: String,
    pub mem: String,
}

impl UtilizationSample {
    pub fn new(sm: impl Into<String>, mem: impl Into<String>) -> Self {
        Self {
            sm: sm.into(),
            mem: mem.into(),
        }
    }

    pub fn sm_percent(&self) -> Option<f64> {
        self.sm.parse().ok()
    }

    pub fn mem_percent(&self) -> Option<f64> {
        self.mem.parse().ok()
    }

    pub fn as_pair(&self) -> [&str; 2] {
        [self.sm.as_str(), self.mem.as_str()]
    }
}

/// Frame buffer memory in MB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBufferSample {
    pub fb: String,
}

impl FrameBufferSample {
    pub fn new(fb: impl Into<String>) -> Self {
        Self { fb: fb.into() }
    }

    pub fn megabytes(&self) -> Option<f64> {
        self.fb.parse().ok()
    }
}

/// Parse `pmon -c 1` output (gpu pid type sm mem enc dec command).
pub fn parse_utilization(text: &str) -> UtilizationMap {
    parse_rows(text, UTILIZATION_FIELDS, |fields| {
        UtilizationSample::new(fields[SM_COLUMN], fields[MEM_COLUMN])
    })
}

/// Parse `pmon -c 1 -s m` output (gpu pid type fb command).
pub fn parse_frame_buffer(text: &str) -> FrameBufferMap {
    parse_rows(text, FRAME_BUFFER_FIELDS, |fields| {
        FrameBufferSample::new(fields[FB_COLUMN])
    })
}

fn parse_rows<V>(
    text: &str,
    expected_fields: usize,
    extract: impl Fn(&[&str]) -> V,
) -> HashMap<ProcessId, HashMap<DeviceId, V>> {
    let mut result: HashMap<ProcessId, HashMap<DeviceId, V>> = HashMap::new();

    for (index, line) in text.lines().enumerate().skip(HEADER_LINES) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != expected_fields {
            if !fields.is_empty() {
                debug!(
                    "Skipping line {}: {} fields, expected {}",
                    index,
                    fields.len(),
                    expected_fields
                );
            }
            continue;
        }

        let pid = fields[PID_COLUMN];
        if pid == PLACEHOLDER {
            continue;
        }

        result
            .entry(pid.to_string())
            .or_default()
            .insert(fields[DEVICE_COLUMN].to_string(), extract(&fields));
    }

    result
}
