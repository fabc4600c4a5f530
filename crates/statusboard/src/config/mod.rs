//! Configuration for statusboard.
//!
//! This module defines the TOML configuration file, its defaults and the
//! checks applied before a monitor is started.

mod error;
mod methods;
mod types;

pub use error::ConfigError;
pub use types::{Config, Defaults, ProbeConfig, ServerConfig, ServiceConfig, SubscriptionConfig};
