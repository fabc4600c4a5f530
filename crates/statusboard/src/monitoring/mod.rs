pub mod checker;
/// Monitoring module - probes services and feeds the results to the engine
///
/// This module is responsible for:
/// - Executing HTTP/TCP/DNS/ICMP/Minecraft reachability checks
/// - Scheduling one timer per service
/// - Coordinating whole-dashboard refreshes
pub mod prober;
pub mod scheduler;
pub mod snapshot;
pub mod types;

pub use prober::{CompositeProber, Prober, RemoteProber, build_prober};
pub use scheduler::{Monitor, MonitorConfig};
pub use snapshot::StatusSnapshot;
pub use types::{ProbeOutcome, ProbeReport};
