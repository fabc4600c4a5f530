use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

use crate::status::ProbeStatus;

/// Port the Minecraft server list ping is attempted on
pub const MINECRAFT_PORT: u16 = 25565;

/// Protocol version sent in the Minecraft handshake
const MINECRAFT_PROTOCOL_VERSION: i32 = 4;

static PING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)time[=<]\s*([\d.]+)\s*ms").expect("ping time pattern is valid"));

/// Where a check should go and how long it may take
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub address: &'a str,
    pub port: u16,
    pub timeout: Duration,
}

/// A successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reachable {
    pub status: ProbeStatus,
    pub latency_ms: u32,
}

impl Reachable {
    fn online(latency_ms: u32) -> Self {
        Self { status: ProbeStatus::Online, latency_ms }
    }
}

/// Checker trait for different types of monitoring checks
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Budget below which the check cannot finish in time
    fn min_budget(&self) -> Duration {
        Duration::ZERO
    }

    /// Perform the check; any error means the target is unreachable
    async fn check(&self, target: &Target<'_>) -> Result<Reachable>;
}

fn elapsed_ms(start: Instant) -> u32 {
    u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX)
}

async fn connect_within(addr: impl tokio::net::ToSocketAddrs, limit: Duration) -> Result<TcpStream> {
    timeout(limit, TcpStream::connect(addr))
        .await
        .map_err(|_| anyhow!("TCP connection timeout"))?
        .context("TCP connection failed")
}

/// TCP port checker
pub struct TcpChecker;

#[async_trait::async_trait]
impl Checker for TcpChecker {
    fn name(&self) -> &'static str {
        "tcp"
    }

    async fn check(&self, target: &Target<'_>) -> Result<Reachable> {
        let start = Instant::now();
        connect_within((target.address, target.port), target.timeout).await?;
        Ok(Reachable::online(elapsed_ms(start)))
    }
}

/// Resolves a host name and connects to each resolved address in turn
pub struct DnsChecker;

impl DnsChecker {
    /// IP literals have nothing to resolve
    pub fn applies_to(address: &str) -> bool {
        address.parse::<IpAddr>().is_err()
    }
}

#[async_trait::async_trait]
impl Checker for DnsChecker {
    fn name(&self) -> &'static str {
        "dns"
    }

    async fn check(&self, target: &Target<'_>) -> Result<Reachable> {
        if !Self::applies_to(target.address) {
            bail!("{} is an IP literal", target.address);
        }

        let start = Instant::now();
        let resolved: Vec<SocketAddr> = timeout(
            target.timeout,
            tokio::net::lookup_host((target.address, target.port)),
        )
        .await
        .map_err(|_| anyhow!("DNS lookup timeout"))?
        .context("DNS lookup failed")?
        .collect();

        if resolved.is_empty() {
            bail!("no DNS records for {}", target.address);
        }

        for addr in resolved {
            let remaining = target.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            if connect_within(addr, remaining).await.is_ok() {
                return Ok(Reachable::online(elapsed_ms(start)));
            }
        }

        Err(anyhow!("no resolved address of {} accepted a connection", target.address))
    }
}

/// Smallest budget `ping -W` can honour
pub const ICMP_MIN_BUDGET: Duration = Duration::from_secs(1);

/// ICMP checker using the system `ping` binary
pub struct IcmpChecker;

impl IcmpChecker {
    fn command(target: &Target<'_>) -> Command {
        let mut command = Command::new("ping");
        if cfg!(windows) {
            command.args(["-n", "1", "-w"]).arg(target.timeout.as_millis().to_string());
        } else {
            // whole seconds, rounded down so ping gives up inside the budget
            command.args(["-c", "1", "-W"]).arg(target.timeout.as_secs().to_string());
        }
        command.arg(target.address).kill_on_drop(true);
        command
    }
}

/// Round trip time reported by `ping`, in whole milliseconds
pub fn parse_ping_time(output: &str) -> Option<u32> {
    let captures = PING_TIME.captures(output)?;
    let millis: f64 = captures.get(1)?.as_str().parse().ok()?;
    (millis > 0.0).then(|| millis.round() as u32)
}

#[async_trait::async_trait]
impl Checker for IcmpChecker {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn min_budget(&self) -> Duration {
        ICMP_MIN_BUDGET
    }

    async fn check(&self, target: &Target<'_>) -> Result<Reachable> {
        if target.address.starts_with('-') {
            bail!("refusing to ping {:?}", target.address);
        }
        if target.timeout < self.min_budget() {
            bail!("{:?} left, ping needs at least {:?}", target.timeout, self.min_budget());
        }

        let start = Instant::now();
        let output = timeout(target.timeout, Self::command(target).output())
            .await
            .map_err(|_| anyhow!("ping timeout"))?
            .context("failed to run ping")?;

        if !output.status.success() {
            bail!("ping exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let latency = parse_ping_time(&stdout).unwrap_or_else(|| elapsed_ms(start));
        Ok(Reachable::online(latency))
    }
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("statusboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Whether an address should be probed over HTTP
    pub fn applies_to(address: &str) -> bool {
        let lower = address.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Parse an address as URL, assuming `http://` for bare hosts
    pub fn normalize_url(address: &str) -> Result<Url> {
        let address = address.trim();
        let url = if Self::applies_to(address) {
            Url::parse(address)
        } else {
            Url::parse(&format!("http://{address}"))
        }
        .map_err(|e| anyhow!("Invalid URL: {}", e))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("Unsupported URL scheme: {}", other)),
        }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn check(&self, target: &Target<'_>) -> Result<Reachable> {
        let url = Self::normalize_url(target.address)?;
        let start = Instant::now();

        let response = self
            .client
            .head(url)
            .timeout(target.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let latency_ms = elapsed_ms(start);
        let code = response.status().as_u16();

        match ProbeStatus::from_http_code(code) {
            ProbeStatus::Offline => Err(anyhow!("HTTP check failed with status code: {}", code)),
            status => Ok(Reachable { status, latency_ms }),
        }
    }
}

/// Minecraft server list ping checker
pub struct MinecraftChecker;

fn write_varint(buffer: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            buffer.push(value as u8);
            return;
        }
        buffer.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
}

/// Length-prefixed handshake packet followed by the status request
pub fn minecraft_handshake(host: &str, port: u16) -> Vec<u8> {
    let mut packet = Vec::with_capacity(host.len() + 8);
    write_varint(&mut packet, 0x00);
    write_varint(&mut packet, MINECRAFT_PROTOCOL_VERSION);
    write_varint(&mut packet, host.len() as i32);
    packet.extend_from_slice(host.as_bytes());
    packet.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut packet, 1);

    let mut framed = Vec::with_capacity(packet.len() + 4);
    write_varint(&mut framed, packet.len() as i32);
    framed.extend_from_slice(&packet);
    framed.extend_from_slice(&[0x01, 0x00]);
    framed
}

#[async_trait::async_trait]
impl Checker for MinecraftChecker {
    fn name(&self) -> &'static str {
        "minecraft"
    }

    async fn check(&self, target: &Target<'_>) -> Result<Reachable> {
        let start = Instant::now();
        let exchange = async {
            let mut stream = TcpStream::connect((target.address, target.port))
                .await
                .context("TCP connection failed")?;
            stream.write_all(&minecraft_handshake(target.address, target.port)).await?;

            let mut reply = [0u8; 4];
            let read = stream.read(&mut reply).await?;
            if read == 0 {
                bail!("server closed the connection without a status reply");
            }
            Ok(())
        };

        timeout(target.timeout, exchange)
            .await
            .map_err(|_| anyhow!("Minecraft status timeout"))??;

        Ok(Reachable::online(elapsed_ms(start)))
    }
}
