use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use statusboard::{
    Defaults, Monitor, MonitorConfig, OverallStatus, ProbeOutcome, ProbeStatus, Prober, ServiceConfig, ServiceStatus,
};
use tokio::sync::Mutex;

/// Replays a fixed script of results per address, then repeats the last one
struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<ProbeStatus>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    fn new(scripts: Vec<(&str, Vec<ProbeStatus>)>, delay: Duration) -> Arc<Self> {
        let scripts = scripts
            .into_iter()
            .map(|(address, script)| (address.to_string(), script.into_iter().collect()))
            .collect();

        Arc::new(Self {
            scripts: Mutex::new(scripts),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str, _port: u16, _timeout: Duration) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let status = {
            let mut scripts = self.scripts.lock().await;
            let script = scripts.get_mut(address).expect("address is scripted");
            if script.len() > 1 { script.pop_front() } else { script.front().copied() }
        }
        .unwrap_or(ProbeStatus::Offline);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match status {
            ProbeStatus::Offline => ProbeOutcome::offline(),
            other => ProbeOutcome::new(other, 42),
        }
    }
}

fn service(id: &str, address: &str) -> ServiceConfig {
    ServiceConfig {
        id: id.into(),
        name_key: id.into(),
        address: address.into(),
        port: 80,
        check_interval_ms: None,
        timeout_ms: None,
    }
}

fn monitor(services: Vec<ServiceConfig>, interval_ms: u64, prober: Arc<ScriptedProber>) -> Monitor {
    let config = MonitorConfig { defaults: Defaults { check_interval_ms: interval_ms, timeout_ms: 1000 }, services };
    Monitor::with_rng(config, prober, &mut StdRng::seed_from_u64(9))
}

#[tokio::test]
async fn refresh_all_probes_every_service_concurrently() {
    let prober = ScriptedProber::new(
        vec![("a", vec![ProbeStatus::Online]), ("b", vec![ProbeStatus::Online]), ("c", vec![ProbeStatus::Online])],
        Duration::from_millis(50),
    );
    let monitor = monitor(vec![service("a", "a"), service("b", "b"), service("c", "c")], 60_000, prober.clone());
    let before = monitor.last_updated_at().await;

    assert!(monitor.refresh_all().await);

    assert_eq!(prober.calls.load(Ordering::SeqCst), 3);
    assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 3);
    assert!(monitor.last_updated_at().await >= before);
    assert!(!monitor.is_refreshing());
}

#[tokio::test]
async fn overlapping_refresh_is_a_noop() {
    let prober = ScriptedProber::new(vec![("a", vec![ProbeStatus::Online])], Duration::from_millis(200));
    let monitor = monitor(vec![service("a", "a")], 60_000, prober.clone());

    let first = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.refresh_all().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(monitor.is_refreshing());
    assert!(monitor.snapshot().await.is_refreshing);
    assert!(!monitor.refresh_all().await);

    assert!(first.await.unwrap());
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    assert!(!monitor.is_refreshing());
    assert!(monitor.refresh_all().await);
}

#[tokio::test]
async fn results_for_one_service_apply_in_order() {
    use ProbeStatus::{Maintenance, Online};
    let prober = ScriptedProber::new(
        vec![("a", vec![Online, Online, Online, Maintenance, Maintenance, Maintenance])],
        Duration::from_millis(10),
    );
    let monitor = monitor(vec![service("a", "a")], 60_000, prober.clone());
    let mut transitions = monitor.subscribe_transitions();

    let checks: Vec<_> = (0..6)
        .map(|_| {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.check_service(0).await })
        })
        .collect();
    for check in checks {
        assert!(check.await.unwrap().is_some());
    }

    // probes for the same service never overlap
    assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 1);

    let first = transitions.recv().await.unwrap();
    let second = transitions.recv().await.unwrap();
    assert_eq!((first.from, first.to), (ServiceStatus::Unknown, ServiceStatus::Online));
    assert_eq!((second.from, second.to), (ServiceStatus::Online, ServiceStatus::Maintenance));

    let state = monitor.service("a").await.unwrap();
    assert_eq!(state.status, ServiceStatus::Maintenance);
    assert_eq!(state.check_count, 2);
}

#[tokio::test]
async fn snapshot_reports_overall_status_and_live_downtime() {
    use ProbeStatus::{Offline, Online};
    let prober = ScriptedProber::new(
        vec![("up", vec![Online]), ("flaky", vec![Online, Online, Online, Offline])],
        Duration::from_millis(1),
    );
    let monitor = monitor(vec![service("up", "up"), service("flaky", "flaky")], 60_000, prober);

    for _ in 0..3 {
        monitor.refresh_all().await;
    }
    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.overall, OverallStatus::Operational);
    assert_eq!(snapshot.services.len(), 2);
    assert_eq!(snapshot.services[0].id, "up");

    for _ in 0..3 {
        monitor.refresh_all().await;
    }
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.overall, OverallStatus::Disruption);
    let flaky = snapshot.service("flaky").unwrap();
    assert_eq!(flaky.status, ServiceStatus::Offline);
    assert!(flaky.current_downtime_duration_sec >= 1);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["overall"], "disruption");
    assert_eq!(json["services"][1]["status"], "offline");
    assert_eq!(json["services"][1]["history"].as_array().unwrap().len(), 25);
    assert!(json["lastUpdatedAt"].is_string());
}

#[tokio::test]
async fn timers_probe_each_service_on_its_own_interval() {
    let prober = ScriptedProber::new(
        vec![("fast", vec![ProbeStatus::Online]), ("slow", vec![ProbeStatus::Online])],
        Duration::ZERO,
    );
    let mut fast = service("fast", "fast");
    fast.check_interval_ms = Some(20);
    let monitor = monitor(vec![fast, service("slow", "slow")], 60_000, prober.clone());

    monitor.start();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    monitor.stop();

    let calls = prober.calls.load(Ordering::SeqCst);
    // one initial refresh of both plus several fast ticks, never doubled timers
    assert!(calls >= 2 + 5, "calls = {calls}");
    assert!(calls <= 2 + 20, "calls = {calls}");

    let fast = monitor.service("fast").await.unwrap();
    assert_eq!(fast.status, ServiceStatus::Online);
    let slow = monitor.service("slow").await.unwrap();
    assert_eq!(slow.status, ServiceStatus::Unknown);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(prober.calls.load(Ordering::SeqCst), calls);
}
