use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ServiceState;
use crate::status::OverallStatus;

/// Point-in-time copy of every service, taken under a single lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub services: Vec<ServiceState>,
    pub last_updated_at: DateTime<Utc>,
    pub is_refreshing: bool,
    pub overall: OverallStatus,
}

impl StatusSnapshot {
    pub fn new(services: Vec<ServiceState>, last_updated_at: DateTime<Utc>, is_refreshing: bool) -> Self {
        let overall = OverallStatus::from_statuses(services.iter().map(|s| s.status));
        Self { services, last_updated_at, is_refreshing, overall }
    }

    pub fn service(&self, id: &str) -> Option<&ServiceState> {
        self.services.iter().find(|s| s.id == id)
    }
}
