use std::sync::Arc;

use statusboard::{Monitor, Prober, SubscriptionStore};

/// Shared by every worker of the HTTP server
pub struct AppState {
    pub monitor: Monitor,
    /// Used for on-demand checks, independent of the monitor's timers
    pub prober: Arc<dyn Prober>,
    pub subscriptions: SubscriptionStore,
}
