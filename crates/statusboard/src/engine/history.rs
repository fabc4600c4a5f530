//! Fixed-size rolling history backing the 24 hour timeline.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::status::ServiceStatus;

/// Number of points kept per service, one per hour over the last day plus now
pub const HISTORY_CAPACITY: usize = 25;

/// A single point on the status timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub status: ServiceStatus,
    pub response_time_ms: u32,
    /// Placeholder point generated at startup, not an observation
    pub synthetic: bool,
}

impl HistoryPoint {
    /// A point produced by a confirmed status change
    pub fn observed(timestamp: DateTime<Utc>, status: ServiceStatus, response_time_ms: u32) -> Self {
        Self { timestamp, status, response_time_ms, synthetic: false }
    }
}

/// Ring buffer of [`HISTORY_CAPACITY`] points, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    points: VecDeque<HistoryPoint>,
}

impl History {
    /// Build a placeholder timeline covering the 24 hours before `now`
    ///
    /// Each hourly point is online with probability `target_uptime` percent,
    /// otherwise maintenance or offline with equal odds. The newest point is
    /// forced to `current`. Every point is flagged synthetic.
    pub fn seeded<R>(now: DateTime<Utc>, target_uptime: f64, current: ServiceStatus, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let target = target_uptime.clamp(0.0, 100.0);
        let mut points = VecDeque::with_capacity(HISTORY_CAPACITY);

        for hours_ago in (0..HISTORY_CAPACITY as i64).rev() {
            let status = if hours_ago == 0 {
                current
            } else {
                let draw: f64 = rng.gen_range(0.0..100.0);
                if draw < target {
                    ServiceStatus::Online
                } else if draw < target + (100.0 - target) / 2.0 {
                    ServiceStatus::Maintenance
                } else {
                    ServiceStatus::Offline
                }
            };

            points.push_back(HistoryPoint {
                timestamp: now - Duration::hours(hours_ago),
                status,
                response_time_ms: synthetic_response_time(status, rng),
                synthetic: true,
            });
        }

        Self { points }
    }

    /// Drop the oldest point and append `point` as the newest
    pub fn record(&mut self, point: HistoryPoint) {
        if self.points.len() >= HISTORY_CAPACITY {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    /// Owned copy of all points, oldest first
    pub fn points(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }

    /// Points that came from real observations
    pub fn real_points(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter().filter(|point| !point.synthetic)
    }
}

fn synthetic_response_time<R>(status: ServiceStatus, rng: &mut R) -> u32
where
    R: Rng + ?Sized,
{
    match status {
        ServiceStatus::Online => rng.gen_range(30..90),
        ServiceStatus::Maintenance => rng.gen_range(100..200),
        ServiceStatus::Offline | ServiceStatus::Unknown => 0,
    }
}
