//! Configuration types for statusboard.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CHECK_INTERVAL_MS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};

/// Top level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub subscriptions: SubscriptionConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    /// Monitored services, in display order
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Fallbacks for services that do not set their own interval or timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_check_interval_ms")]
    pub check_interval_ms: u64,
    #[serde(default = "Defaults::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Defaults {
    const fn default_check_interval_ms() -> u64 {
        DEFAULT_CHECK_INTERVAL_MS
    }

    const fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT_MS
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            check_interval_ms: Self::default_check_interval_ms(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_bind() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: Self::default_bind(), port: Self::default_port() }
    }
}

/// Email subscription mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "SubscriptionConfig::default_path")]
    pub path: PathBuf,
}

impl SubscriptionConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("data/subscriptions.txt")
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { path: Self::default_path() }
    }
}

/// Probe strategy switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Fall back to the system `ping` when socket checks fail
    #[serde(default = "default_true")]
    pub enable_icmp: bool,
    /// Delegate checks to another instance's `/api/check-status`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { enable_icmp: true, remote_url: None }
    }
}

/// One monitored service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique key
    pub id: String,
    /// Translation key of the display name
    pub name_key: String,
    /// IP, host name or http(s) URL
    pub address: String,
    #[serde(default = "ServiceConfig::default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ServiceConfig {
    const fn default_port() -> u16 {
        DEFAULT_PORT
    }

    /// Interval between checks, falling back to `defaults`
    pub fn effective_interval(&self, defaults: &Defaults) -> Duration {
        Duration::from_millis(self.check_interval_ms.unwrap_or(defaults.check_interval_ms))
    }

    /// Probe timeout, falling back to `defaults`
    pub fn effective_timeout(&self, defaults: &Defaults) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(defaults.timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        let service = |id: &str, name_key: &str, address: &str, port: u16| ServiceConfig {
            id: id.into(),
            name_key: name_key.into(),
            address: address.into(),
            port,
            check_interval_ms: None,
            timeout_ms: None,
        };

        Self {
            defaults: Defaults::default(),
            server: ServerConfig::default(),
            subscriptions: SubscriptionConfig::default(),
            probe: ProbeConfig::default(),
            services: vec![
                service("web-server", "webServer", "https://example.com", 80),
                service("minecraft-server", "minecraftServer", "mc.example.com", 25565),
                service("api-server", "apiServer", "api.example.com", 80),
                service("database", "database", "db.example.com", 3306),
                service("storage", "storage", "storage.example.com", 80),
            ],
        }
    }
}
