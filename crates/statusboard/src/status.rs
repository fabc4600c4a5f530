use serde::{Deserialize, Serialize};

/// Confirmed, debounced status of a monitored service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Startup state, left on the first confirmed transition and never re-entered
    Unknown,
    Online,
    Offline,
    Maintenance,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Unknown => write!(f, "unknown"),
            ServiceStatus::Online => write!(f, "online"),
            ServiceStatus::Offline => write!(f, "offline"),
            ServiceStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// Raw status reported by a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Online,
    Offline,
    /// Reachable but degraded, e.g. an HTTP 4xx answer
    Maintenance,
}

impl ProbeStatus {
    /// Classify an HTTP status code
    ///
    /// 200-399 is online, 400-499 maintenance, everything else offline.
    pub fn from_http_code(code: u16) -> Self {
        match code {
            200..=399 => ProbeStatus::Online,
            400..=499 => ProbeStatus::Maintenance,
            _ => ProbeStatus::Offline,
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        ServiceStatus::from(*self).fmt(f)
    }
}

impl From<ProbeStatus> for ServiceStatus {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Online => ServiceStatus::Online,
            ProbeStatus::Offline => ServiceStatus::Offline,
            ProbeStatus::Maintenance => ServiceStatus::Maintenance,
        }
    }
}

impl PartialEq<ProbeStatus> for ServiceStatus {
    fn eq(&self, other: &ProbeStatus) -> bool {
        *self == ServiceStatus::from(*other)
    }
}

/// Banner state for the whole dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Operational,
    Disruption,
}

impl OverallStatus {
    /// Operational only when there is at least one service and all of them are online
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ServiceStatus>,
    {
        let mut any = false;
        for status in statuses {
            any = true;
            if status != ServiceStatus::Online {
                return OverallStatus::Disruption;
            }
        }

        if any { OverallStatus::Operational } else { OverallStatus::Disruption }
    }
}
