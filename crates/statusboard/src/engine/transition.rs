use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{ProbeStatus, ServiceStatus};

/// One closed offline episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DowntimeRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_sec: u64,
    pub reason: Option<String>,
}

impl DowntimeRecord {
    /// Close an episode that started at `start_time`
    pub fn closed(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            duration_sec: seconds_between(start_time, end_time),
            reason: None,
        }
    }
}

/// A confirmed change of a service's status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub service_id: String,
    pub from: ServiceStatus,
    pub to: ServiceStatus,
    pub at: DateTime<Utc>,
    /// Downtime episode closed by this transition
    pub downtime: Option<DowntimeRecord>,
}

/// What a single probe result did to a service's state
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Raw result matched the confirmed status
    Agreed,
    /// Raw result differs but has not been seen often enough yet
    Pending { candidate: ProbeStatus, count: u32 },
    /// The status changed
    Confirmed(StatusTransition),
}

impl Observation {
    pub fn transition(&self) -> Option<&StatusTransition> {
        match self {
            Observation::Confirmed(transition) => Some(transition),
            Observation::Agreed | Observation::Pending { .. } => None,
        }
    }
}

/// Whole seconds from `start` to `end`, zero if the clock went backwards
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}
