//! Statusboard - debounced service status tracking
//!
//! This library polls a fixed list of network services, turns the noisy
//! per-check probe results into a stable status signal and keeps the
//! rolling history, uptime and downtime bookkeeping a dashboard needs.

pub mod config;
pub mod duration;
pub mod engine;
pub mod monitoring;
pub mod status;
pub mod subscriptions;

// Re-export main types
pub use config::{Config, ConfigError, Defaults, ProbeConfig, ServiceConfig};
pub use duration::format_duration;
pub use engine::{
    DowntimeRecord, History, HistoryPoint, Observation, STATUS_CHANGE_THRESHOLD, ServiceState,
    StatusTransition,
};
pub use monitoring::{
    CompositeProber, Monitor, MonitorConfig, ProbeOutcome, ProbeReport, Prober, RemoteProber, StatusSnapshot,
    build_prober,
};
pub use status::{OverallStatus, ProbeStatus, ServiceStatus};
pub use subscriptions::{SubscribeOutcome, SubscriptionError, SubscriptionStore};

/// Default interval between two checks of the same service
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 5_000;

/// Default time a single probe may take before it counts as offline
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;

/// Default port probed when a service does not name one
pub const DEFAULT_PORT: u16 = 80;
