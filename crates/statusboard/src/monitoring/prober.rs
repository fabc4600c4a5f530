use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::checker::{
    Checker, DnsChecker, HttpChecker, IcmpChecker, MINECRAFT_PORT, MinecraftChecker, Reachable, Target,
    TcpChecker,
};
use super::types::ProbeOutcome;
use crate::config::ProbeConfig;
use crate::status::ProbeStatus;

/// Answers "is this service reachable right now?"
///
/// Implementations swallow every failure and report it as
/// [`ProbeStatus::Offline`]; the caller never sees an error.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> ProbeOutcome;
}

/// Build the prober selected by `config`
pub fn build_prober(config: &ProbeConfig) -> Result<Arc<dyn Prober>> {
    match &config.remote_url {
        Some(remote) => Ok(Arc::new(RemoteProber::new(remote)?)),
        None => Ok(Arc::new(CompositeProber::new(config)?)),
    }
}

/// Default prober: tries the socket level strategies in turn
pub struct CompositeProber {
    http: HttpChecker,
    enable_icmp: bool,
}

impl CompositeProber {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        Ok(Self { http: HttpChecker::new()?, enable_icmp: config.enable_icmp })
    }

    /// Checkers applicable to a non-URL target, in the order they are tried
    fn chain(&self, address: &str, port: u16) -> Vec<&dyn Checker> {
        let mut chain: Vec<&dyn Checker> = Vec::with_capacity(4);
        chain.push(&TcpChecker);
        if DnsChecker::applies_to(address) {
            chain.push(&DnsChecker);
        }
        if self.enable_icmp {
            chain.push(&IcmpChecker);
        }
        if port == MINECRAFT_PORT {
            chain.push(&MinecraftChecker);
        }
        chain
    }

    async fn first_success(&self, target: &Target<'_>) -> Option<Reachable> {
        let start = Instant::now();

        if HttpChecker::applies_to(target.address) {
            return match self.http.check(target).await {
                Ok(found) => Some(found),
                Err(e) => {
                    debug!(address = target.address, error = %e, "http check failed");
                    None
                }
            };
        }

        for checker in self.chain(target.address, target.port) {
            let remaining = target.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                debug!(address = target.address, "probe budget exhausted");
                break;
            }

            if remaining < checker.min_budget() {
                debug!(address = target.address, checker = checker.name(), ?remaining, "not enough budget, skipped");
                continue;
            }

            let attempt = Target { timeout: remaining, ..*target };
            match checker.check(&attempt).await {
                Ok(found) => {
                    debug!(address = target.address, port = target.port, checker = checker.name(), "check succeeded");
                    return Some(found);
                }
                Err(e) => {
                    debug!(
                        address = target.address,
                        port = target.port,
                        checker = checker.name(),
                        error = %e,
                        "check failed"
                    );
                }
            }
        }

        None
    }
}

#[async_trait]
impl Prober for CompositeProber {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> ProbeOutcome {
        let target = Target { address: address.trim(), port, timeout };
        match self.first_success(&target).await {
            Some(found) => ProbeOutcome::new(found.status, found.latency_ms),
            None => ProbeOutcome::offline(),
        }
    }
}

/// Round trip allowance on top of the remote side's own budget
const REMOTE_MARGIN: Duration = Duration::from_millis(250);

/// Delegates checks to a remote `/api/check-status` endpoint
///
/// The remote is asked to finish `REMOTE_MARGIN` early and the request is
/// cut off `REMOTE_MARGIN` late, so a call never outlives
/// `timeout + REMOTE_MARGIN`.
pub struct RemoteProber {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAnswer {
    status: ProbeStatus,
    #[serde(default)]
    response_time: f64,
}

impl RemoteProber {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).with_context(|| format!("invalid remote checker URL: {endpoint}"))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("statusboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn ask(&self, address: &str, port: u16, timeout: Duration) -> Result<RemoteAnswer> {
        let budget = timeout.saturating_sub(REMOTE_MARGIN).max(Duration::from_millis(1));
        let millis = budget.as_millis().to_string();
        let port = port.to_string();

        let answer = self
            .client
            .get(self.endpoint.clone())
            .query(&[("address", address), ("port", port.as_str()), ("timeout", millis.as_str())])
            .timeout(timeout + REMOTE_MARGIN)
            .send()
            .await?
            .error_for_status()?
            .json::<RemoteAnswer>()
            .await?;

        Ok(answer)
    }
}

#[async_trait]
impl Prober for RemoteProber {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> ProbeOutcome {
        match self.ask(address, port, timeout).await {
            Ok(answer) => {
                let latency = if answer.status == ProbeStatus::Offline {
                    0
                } else {
                    answer.response_time.max(0.0).round() as u32
                };
                ProbeOutcome::new(answer.status, latency)
            }
            Err(e) => {
                debug!(address, port, endpoint = %self.endpoint, error = %e, "remote check failed");
                ProbeOutcome::offline()
            }
        }
    }
}
