/// Stability engine - turns raw probe results into a debounced status
///
/// This module is responsible for:
/// - Debouncing raw observations before a status change is confirmed
/// - Uptime and downtime bookkeeping
/// - The rolling timeline history
pub mod history;
pub mod state;
pub mod transition;

pub use history::{HISTORY_CAPACITY, History, HistoryPoint};
pub use state::{STATUS_CHANGE_THRESHOLD, ServiceState};
pub use transition::{DowntimeRecord, Observation, StatusTransition};
