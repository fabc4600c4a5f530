//! Per-service state and the debounce algorithm.
//!
//! A raw probe result only changes the confirmed status after
//! [`STATUS_CHANGE_THRESHOLD`] consecutive agreeing observations that differ
//! from it. Uptime counters, history and downtime episodes move only on a
//! confirmed change.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::history::History;
use super::history::HistoryPoint;
use super::transition::{DowntimeRecord, Observation, StatusTransition, seconds_between};
use crate::config::ServiceConfig;
use crate::status::{ProbeStatus, ServiceStatus};

/// Consecutive agreeing observations needed to confirm a status change
pub const STATUS_CHANGE_THRESHOLD: u32 = 3;

/// Uptime shown before the first confirmed check
const INITIAL_UPTIME: f64 = 100.0;

/// Mutable state of one monitored service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub id: String,
    pub name_key: String,
    pub address: String,
    pub port: u16,

    pub status: ServiceStatus,
    pub pending_status: Option<ProbeStatus>,
    pub pending_status_count: u32,

    /// Raw streaks, informational only
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,

    pub check_count: u64,
    pub success_count: u64,
    pub uptime: f64,

    pub response_time_ms: u32,
    pub last_checked_at: DateTime<Utc>,

    pub last_downtime_start: Option<DateTime<Utc>>,
    pub current_downtime_duration_sec: u64,
    pub downtime_history: Vec<DowntimeRecord>,

    pub history: History,
}

impl ServiceState {
    /// Fresh state for a configured service, with a placeholder timeline
    pub fn new<R>(config: &ServiceConfig, now: DateTime<Utc>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            id: config.id.clone(),
            name_key: config.name_key.clone(),
            address: config.address.clone(),
            port: config.port,
            status: ServiceStatus::Unknown,
            pending_status: None,
            pending_status_count: 0,
            consecutive_successes: 0,
            consecutive_failures: 0,
            check_count: 0,
            success_count: 0,
            uptime: INITIAL_UPTIME,
            response_time_ms: 0,
            last_checked_at: now,
            last_downtime_start: None,
            current_downtime_duration_sec: 0,
            downtime_history: Vec::new(),
            history: History::seeded(now, INITIAL_UPTIME, ServiceStatus::Online, rng),
        }
    }

    /// Apply one raw probe result observed at `now`
    pub fn observe(&mut self, raw: ProbeStatus, response_time_ms: u32, now: DateTime<Utc>) -> Observation {
        if raw == ProbeStatus::Online {
            self.consecutive_successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.consecutive_successes = 0;
        }

        if self.status == raw {
            self.clear_pending();
            self.last_checked_at = now;
            if raw != ProbeStatus::Offline {
                self.response_time_ms = response_time_ms;
            }
            return Observation::Agreed;
        }

        if self.pending_status != Some(raw) {
            self.pending_status = Some(raw);
            self.pending_status_count = 1;
            self.last_checked_at = now;
            debug!(service = %self.id, from = %self.status, to = %raw, count = 1, "pending status change");
            return Observation::Pending { candidate: raw, count: 1 };
        }

        self.pending_status_count += 1;
        if self.pending_status_count < STATUS_CHANGE_THRESHOLD {
            self.last_checked_at = now;
            debug!(
                service = %self.id,
                from = %self.status,
                to = %raw,
                count = self.pending_status_count,
                "pending status change"
            );
            return Observation::Pending { candidate: raw, count: self.pending_status_count };
        }

        Observation::Confirmed(self.confirm(raw, response_time_ms, now))
    }

    /// Recompute the live downtime duration while offline
    pub fn refresh_downtime(&mut self, now: DateTime<Utc>) {
        if self.status != ServiceStatus::Offline {
            return;
        }
        if let Some(start) = self.last_downtime_start {
            self.current_downtime_duration_sec = seconds_between(start, now);
        }
    }

    /// Whether a downtime episode is currently open
    pub fn is_down(&self) -> bool {
        self.last_downtime_start.is_some()
    }

    fn confirm(&mut self, raw: ProbeStatus, response_time_ms: u32, now: DateTime<Utc>) -> StatusTransition {
        let previous = self.status;
        let next = ServiceStatus::from(raw);
        let mut closed = None;

        match (previous, next) {
            (ServiceStatus::Unknown, _) => {}
            (ServiceStatus::Offline, ServiceStatus::Offline) => {
                // Agreement short-circuits in `observe`, kept for completeness.
                self.refresh_downtime(now);
            }
            (ServiceStatus::Offline, _) => {
                if let Some(start) = self.last_downtime_start.take() {
                    let record = DowntimeRecord::closed(start, now);
                    self.downtime_history.push(record.clone());
                    closed = Some(record);
                }
                self.current_downtime_duration_sec = 0;
            }
            (_, ServiceStatus::Offline) => {
                self.last_downtime_start = Some(now);
                self.current_downtime_duration_sec = 0;
            }
            _ => {}
        }

        self.history.record(HistoryPoint::observed(now, next, response_time_ms));

        self.check_count += 1;
        if next == ServiceStatus::Online {
            self.success_count += 1;
        }
        self.uptime = self.compute_uptime();

        self.status = next;
        self.response_time_ms = if next != ServiceStatus::Offline { response_time_ms } else { 0 };
        self.last_checked_at = now;
        self.clear_pending();

        info!(
            service = %self.id,
            from = %previous,
            to = %next,
            threshold = STATUS_CHANGE_THRESHOLD,
            "status change confirmed"
        );

        StatusTransition { service_id: self.id.clone(), from: previous, to: next, at: now, downtime: closed }
    }

    fn compute_uptime(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.check_count as f64 * 100.0).clamp(0.0, 100.0)
    }

    fn clear_pending(&mut self) {
        self.pending_status = None;
        self.pending_status_count = 0;
    }
}
