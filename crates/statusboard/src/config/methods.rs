//! Loading, writing and validating the configuration file.

use std::collections::HashSet;
use std::{env, fmt, fs, path};

use tracing::info;

use super::error::ConfigError;
use super::types::Config;

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/statusboard/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("statusboard/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Defaults")?;
        write_1(f, "Check Interval (ms)", &self.defaults.check_interval_ms)?;
        write_1(f, "Timeout (ms)", &self.defaults.timeout_ms)?;
        write_title_1(f, "Subscriptions")?;
        write_1(f, "Store", &self.subscriptions.path.display())?;
        write_title_1(f, "Probes")?;
        write_1(f, "ICMP Fallback", &self.probe.enable_icmp)?;
        if let Some(remote) = &self.probe.remote_url {
            write_1(f, "Remote Checker", remote)?;
        }
        write_title_1(f, "Services")?;
        for service in &self.services {
            write_1(f, service.id.as_str(), &format_args!("{}:{}", service.address, service.port))?;
            write_2(f, "Interval", &format_args!("{:?}", service.effective_interval(&self.defaults)))?;
            write_2(f, "Timeout", &format_args!("{:?}", service.effective_timeout(&self.defaults)))?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/statusboard/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// use statusboard::Config;
    ///
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), statusboard::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            info!(path = %config_path.display(), "loaded configuration");
            Self::from_toml(&raw_string)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            info!(path = %config_path.display(), "config file not found; wrote defaults");
            Ok(config)
        }
    }

    /// Parse a TOML document
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        fs::write(path, config_str).map_err(ConfigError::Write)
    }

    /// Override listener and store settings from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Override settings from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("STATUSBOARD_BIND").filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }

        if let Some(port) = lookup("STATUSBOARD_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("STATUSBOARD_PORT is not a port: {port}")))?;
        }

        if let Some(path) = lookup("STATUSBOARD_SUBSCRIPTIONS").filter(|v| !v.trim().is_empty()) {
            self.subscriptions.path = path.into();
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// A service without a target is rejected rather than monitored as nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::Invalid("at least one service must be configured".into()));
        }

        if self.defaults.check_interval_ms == 0 {
            return Err(ConfigError::Invalid("defaults.check_interval_ms must be greater than 0".into()));
        }

        if self.defaults.timeout_ms == 0 {
            return Err(ConfigError::Invalid("defaults.timeout_ms must be greater than 0".into()));
        }

        if let Some(remote) = &self.probe.remote_url
            && url::Url::parse(remote).is_err()
        {
            return Err(ConfigError::Invalid(format!("probe.remote_url is not a URL: {remote}")));
        }

        let mut seen = HashSet::new();
        for (index, service) in self.services.iter().enumerate() {
            if service.id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("service #{index} has an empty id")));
            }

            if !seen.insert(service.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate service id: {}", service.id)));
            }

            if service.address.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("service {} has no address", service.id)));
            }

            if service.check_interval_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "service {} check_interval_ms must be greater than 0",
                    service.id
                )));
            }

            if service.timeout_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "service {} timeout_ms must be greater than 0",
                    service.id
                )));
            }
        }

        Ok(())
    }
}
