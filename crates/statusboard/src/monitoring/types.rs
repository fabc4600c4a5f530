use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ProbeStatus;

/// Result of one reachability check
///
/// Probes never fail: timeouts, refused connections and lookup errors are
/// reported as [`ProbeStatus::Offline`] with a zero response time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u32,
    /// When the probe completed
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn new(status: ProbeStatus, response_time_ms: u32) -> Self {
        Self { status, response_time_ms, timestamp: Utc::now() }
    }

    /// Mark the check as successful with latency
    pub fn online(response_time_ms: u32) -> Self {
        Self::new(ProbeStatus::Online, response_time_ms)
    }

    /// Mark the check as failed
    pub fn offline() -> Self {
        Self::new(ProbeStatus::Offline, 0)
    }

    /// Override the completion time
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn reachable(&self) -> bool {
        self.status != ProbeStatus::Offline
    }
}

/// JSON answer of the on-demand check endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub address: String,
    pub port: u16,
    pub status: ProbeStatus,
    pub reachable: bool,
    pub response_time: u32,
    pub timestamp: DateTime<Utc>,
}

impl ProbeReport {
    pub fn new(address: impl Into<String>, port: u16, outcome: &ProbeOutcome) -> Self {
        Self {
            address: address.into(),
            port,
            status: outcome.status,
            reachable: outcome.reachable(),
            response_time: outcome.response_time_ms,
            timestamp: outcome.timestamp,
        }
    }
}
