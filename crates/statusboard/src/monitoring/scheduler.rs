use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, Weak};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::prober::Prober;
use super::snapshot::StatusSnapshot;
use crate::config::{Config, Defaults, ServiceConfig};
use crate::engine::{Observation, ServiceState, StatusTransition};

/// Buffered confirmed transitions per receiver before it starts lagging
const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Monitor configuration for scheduling
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub defaults: Defaults,
    pub services: Vec<ServiceConfig>,
}

impl From<&Config> for MonitorConfig {
    fn from(config: &Config) -> Self {
        Self { defaults: config.defaults.clone(), services: config.services.clone() }
    }
}

struct Board {
    services: Vec<ServiceState>,
    last_updated_at: DateTime<Utc>,
}

struct MonitorInner {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    board: RwLock<Board>,
    /// One gate per service, held across probe and apply
    gates: Vec<Mutex<()>>,
    refreshing: AtomicBool,
    timers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    transitions: broadcast::Sender<StatusTransition>,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for timer in timers.drain(..) {
            timer.abort();
        }
    }
}

/// Clears the refresh flag however `refresh_all` exits
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Monitoring scheduler - owns every service state and the probe timers
///
/// Cloning is cheap; all clones drive the same monitor.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    /// Create a monitor with one fresh state per configured service
    ///
    /// `config` is expected to have passed [`Config::validate`]; a service
    /// whose effective interval is zero is never put on a timer.
    pub fn new(config: MonitorConfig, prober: Arc<dyn Prober>) -> Self {
        Self::with_rng(config, prober, &mut rand::thread_rng())
    }

    /// Like [`Monitor::new`], seeding placeholder histories from `rng`
    pub fn with_rng<R>(config: MonitorConfig, prober: Arc<dyn Prober>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let now = Utc::now();
        let services = config.services.iter().map(|service| ServiceState::new(service, now, rng)).collect();
        let gates = config.services.iter().map(|_| Mutex::new(())).collect();
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(MonitorInner {
                config,
                prober,
                board: RwLock::new(Board { services, last_updated_at: now }),
                gates,
                refreshing: AtomicBool::new(false),
                timers: std::sync::Mutex::new(Vec::new()),
                transitions,
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Run an initial refresh and schedule every service on its own interval
    ///
    /// Calling `start` on a running monitor does nothing.
    pub fn start(&self) {
        let mut timers = self.inner.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if !timers.is_empty() {
            debug!("monitor already running");
            return;
        }

        let initial = self.clone();
        timers.push(tokio::spawn(async move {
            initial.refresh_all().await;
        }));

        for (index, service) in self.inner.config.services.iter().enumerate() {
            let period = service.effective_interval(&self.inner.config.defaults);
            if period.is_zero() {
                warn!(service = %service.id, "zero check interval, service is only checked on refresh");
                continue;
            }
            timers.push(Self::schedule_service(Arc::downgrade(&self.inner), index, period));
        }

        info!(services = self.inner.config.services.len(), "monitor started");
    }

    fn schedule_service(weak: Weak<MonitorInner>, index: usize, period: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let monitor = Monitor { inner };
                monitor.check_service(index).await;
                monitor.inner.board.write().await.last_updated_at = Utc::now();
            }
        })
    }

    /// Cancel all timers; a stopped monitor can be started again
    pub fn stop(&self) {
        let mut timers = self.inner.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if timers.is_empty() {
            return;
        }

        for timer in timers.drain(..) {
            timer.abort();
        }
        info!("monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.inner.timers.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// Probe one service and feed the result through the debounce
    ///
    /// Returns `None` when `index` names no service.
    pub async fn check_service(&self, index: usize) -> Option<Observation> {
        let service = self.inner.config.services.get(index)?;
        let _gate = self.inner.gates[index].lock().await;

        let timeout = service.effective_timeout(&self.inner.config.defaults);
        let outcome = self.inner.prober.probe(&service.address, service.port, timeout).await;

        let observation = {
            let mut board = self.inner.board.write().await;
            board.services[index].observe(outcome.status, outcome.response_time_ms, outcome.timestamp)
        };

        if let Some(transition) = observation.transition() {
            // no receivers is fine
            let _ = self.inner.transitions.send(transition.clone());
        }

        Some(observation)
    }

    /// Probe one service by id
    pub async fn check_service_by_id(&self, id: &str) -> Option<Observation> {
        let index = self.inner.config.services.iter().position(|s| s.id == id)?;
        self.check_service(index).await
    }

    /// Probe every service concurrently
    ///
    /// Returns `false` without probing anything if a refresh is already in
    /// flight.
    pub async fn refresh_all(&self) -> bool {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("refresh already in progress");
            return false;
        }
        let _guard = RefreshGuard(&self.inner.refreshing);

        let checks = (0..self.inner.config.services.len()).map(|index| self.check_service(index));
        let confirmed = join_all(checks)
            .await
            .iter()
            .flatten()
            .filter(|observation| observation.transition().is_some())
            .count();

        self.inner.board.write().await.last_updated_at = Utc::now();
        info!(services = self.inner.config.services.len(), confirmed, "refreshed all services");
        true
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    pub async fn last_updated_at(&self) -> DateTime<Utc> {
        self.inner.board.read().await.last_updated_at
    }

    /// Consistent copy of all services with live downtime durations
    pub async fn snapshot(&self) -> StatusSnapshot {
        let (mut services, last_updated_at) = {
            let board = self.inner.board.read().await;
            (board.services.clone(), board.last_updated_at)
        };

        let now = Utc::now();
        for service in &mut services {
            service.refresh_downtime(now);
        }

        StatusSnapshot::new(services, last_updated_at, self.is_refreshing())
    }

    pub async fn service(&self, id: &str) -> Option<ServiceState> {
        let mut service = self.inner.board.read().await.services.iter().find(|s| s.id == id).cloned()?;
        service.refresh_downtime(Utc::now());
        Some(service)
    }

    /// Receive every confirmed status change from now on
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<StatusTransition> {
        self.inner.transitions.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::ProbeOutcome;
    use crate::status::ServiceStatus;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    struct AlwaysOffline;

    #[async_trait]
    impl Prober for AlwaysOffline {
        async fn probe(&self, _address: &str, _port: u16, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome::offline()
        }
    }

    fn monitor(interval_ms: u64) -> Monitor {
        let config = MonitorConfig {
            defaults: Defaults { check_interval_ms: interval_ms, timeout_ms: 100 },
            services: vec![ServiceConfig {
                id: "db".into(),
                name_key: "database".into(),
                address: "192.0.2.1".into(),
                port: 3306,
                check_interval_ms: None,
                timeout_ms: None,
            }],
        };
        Monitor::with_rng(config, Arc::new(AlwaysOffline), &mut StdRng::seed_from_u64(1))
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let monitor = monitor(60_000);
        monitor.start();
        let count = monitor.inner.timers.lock().unwrap().len();
        monitor.start();

        assert_eq!(monitor.inner.timers.lock().unwrap().len(), count);
        assert_eq!(count, 2);
        assert!(monitor.is_running());

        monitor.stop();
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_zero_interval_is_not_scheduled() {
        let monitor = monitor(0);
        monitor.start();

        // only the initial refresh task
        assert_eq!(monitor.inner.timers.lock().unwrap().len(), 1);
        assert!(monitor.is_running());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_unknown_index_is_noop() {
        let monitor = monitor(60_000);
        assert!(monitor.check_service(7).await.is_none());
        assert!(monitor.check_service_by_id("missing").await.is_none());
        assert!(monitor.service("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_timer_confirms_offline() {
        let monitor = monitor(20);
        let mut transitions = monitor.subscribe_transitions();
        monitor.start();

        let transition = tokio::time::timeout(Duration::from_secs(5), transitions.recv())
            .await
            .expect("Timeout waiting for transition")
            .expect("Channel closed");

        assert_eq!(transition.service_id, "db");
        assert_eq!(transition.to, ServiceStatus::Offline);
        monitor.stop();

        let state = monitor.service("db").await.unwrap();
        assert_eq!(state.status, ServiceStatus::Offline);
        // confirmed straight from unknown, so no downtime episode is open
        assert!(!state.is_down());
        assert!(state.downtime_history.is_empty());
    }
}
