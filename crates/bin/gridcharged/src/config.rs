//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `gridcharge.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use gridcharge_adapter_modbus_tcp::Config as ModbusConfig;
use gridcharge_app::command_executor::{ExecutorOptions, WritePolicy};
use gridcharge_app::scheduler::SchedulerOptions;
use gridcharge_domain::profile::DeviceProfile;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Inverter connection.
    pub device: DeviceConfig,
    /// Command execution behaviour.
    pub commands: CommandsConfig,
    pub scheduler: SchedulerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Inverter connection settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name of a built-in device profile.
    pub profile: String,
    pub host: String,
    /// Modbus TCP port, defaults to the profile's usual port.
    pub port: Option<u16>,
    pub unit_id: u8,
    /// Connect and request timeout, in seconds.
    pub timeout_secs: u64,
}

/// How register writes are performed.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub write_policy: WritePolicyConfig,
    /// Tries per write, at least 1.
    pub write_attempts: u32,
    pub retry_delay_ms: u64,
    pub serialize_device_access: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicyConfig {
    #[default]
    BestEffort,
    FailFast,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How many minutes late a tick may still fire its jobs.
    pub misfire_grace_minutes: u32,
}

impl Config {
    /// Load configuration from `gridcharge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("gridcharge.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("GRIDCHARGE_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("GRIDCHARGE_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = lookup("GRIDCHARGE_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("GRIDCHARGE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("GRIDCHARGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("GRIDCHARGE_DEVICE_HOST") {
            self.device.host = val;
        }
        if let Some(port) = lookup("GRIDCHARGE_DEVICE_PORT").and_then(|val| val.parse().ok()) {
            self.device.port = Some(port);
        }
        if let Some(val) = lookup("GRIDCHARGE_PROFILE") {
            self.device.profile = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if DeviceProfile::by_name(&self.device.profile).is_none() {
            let known: Vec<&str> = DeviceProfile::builtin().iter().map(|p| p.name).collect();
            return Err(ConfigError::Validation(format!(
                "unknown device profile {:?}, expected one of {}",
                self.device.profile,
                known.join(", ")
            )));
        }
        if self.device.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "device host must not be empty".to_string(),
            ));
        }
        if self.device.port == Some(0) {
            return Err(ConfigError::Validation(
                "device port must be non-zero".to_string(),
            ));
        }
        if self.device.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "device timeout must be at least one second".to_string(),
            ));
        }
        if self.commands.write_attempts == 0 {
            return Err(ConfigError::Validation(
                "write_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// The selected device profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown profile name.
    pub fn profile(&self) -> Result<DeviceProfile, ConfigError> {
        DeviceProfile::by_name(&self.device.profile).ok_or_else(|| {
            ConfigError::Validation(format!("unknown device profile {:?}", self.device.profile))
        })
    }

    /// Connection settings for the Modbus adapter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown profile name.
    pub fn modbus(&self) -> Result<ModbusConfig, ConfigError> {
        let profile = self.profile()?;
        Ok(ModbusConfig {
            host: self.device.host.clone(),
            port: self.device.port.unwrap_or(profile.default_port),
            unit_id: self.device.unit_id,
            timeout: Duration::from_secs(self.device.timeout_secs),
        })
    }

    #[must_use]
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            policy: match self.commands.write_policy {
                WritePolicyConfig::BestEffort => WritePolicy::BestEffort,
                WritePolicyConfig::FailFast => WritePolicy::FailFast,
            },
            write_attempts: self.commands.write_attempts,
            retry_delay: Duration::from_millis(self.commands.retry_delay_ms),
            serialize_device_access: self.commands.serialize_device_access,
        }
    }

    #[must_use]
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            misfire_grace_minutes: self.scheduler.misfire_grace_minutes,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:gridcharge.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "gridcharged=info,gridcharge=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::GENERIC.name.to_string(),
            host: "192.168.178.2".to_string(),
            port: None,
            unit_id: 1,
            timeout_secs: 10,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        let defaults = ExecutorOptions::default();
        Self {
            write_policy: WritePolicyConfig::default(),
            write_attempts: defaults.write_attempts,
            retry_delay_ms: u64::try_from(defaults.retry_delay.as_millis()).unwrap_or(500),
            serialize_device_access: defaults.serialize_device_access,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            misfire_grace_minutes: SchedulerOptions::default().misfire_grace_minutes,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.url, "sqlite:gridcharge.db?mode=rwc");
        assert_eq!(config.device.profile, "generic");
        assert_eq!(config.device.unit_id, 1);
        assert_eq!(config.device.timeout_secs, 10);
        assert_eq!(config.commands.write_policy, WritePolicyConfig::BestEffort);
        assert_eq!(config.commands.write_attempts, 1);
        assert!(config.commands.serialize_device_access);
        assert_eq!(config.scheduler.misfire_grace_minutes, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [device]
            profile = 'huawei_luna2000'
            host = '10.0.0.7'
            port = 502
            unit_id = 3
            timeout_secs = 4

            [commands]
            write_policy = 'fail_fast'
            write_attempts = 3
            retry_delay_ms = 250
            serialize_device_access = false

            [scheduler]
            misfire_grace_minutes = 0
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.device.profile, "huawei_luna2000");
        assert_eq!(config.device.host, "10.0.0.7");
        assert_eq!(config.device.port, Some(502));
        assert_eq!(config.device.unit_id, 3);

        let options = config.executor_options();
        assert_eq!(options.policy, WritePolicy::FailFast);
        assert_eq!(options.write_attempts, 3);
        assert_eq!(options.retry_delay, Duration::from_millis(250));
        assert!(!options.serialize_device_access);
        assert_eq!(config.scheduler_options().misfire_grace_minutes, 0);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_unknown_profile() {
        let mut config = Config::default();
        config.device.profile = "sma".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sma"));
        assert!(config.profile().is_err());
    }

    #[test]
    fn should_reject_empty_device_host() {
        let mut config = Config::default();
        config.device.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_write_attempts() {
        let mut config = Config::default();
        config.commands.write_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_unknown_write_policy() {
        let result: Result<Config, _> = toml::from_str("[commands]\nwrite_policy = 'maybe'");
        assert!(result.is_err());
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("GRIDCHARGE_BIND", "127.0.0.1:8081"),
            ("GRIDCHARGE_DATABASE_URL", "sqlite::memory:"),
            ("GRIDCHARGE_DEVICE_HOST", "10.1.1.1"),
            ("GRIDCHARGE_DEVICE_PORT", "1502"),
            ("GRIDCHARGE_PROFILE", "huawei_luna2000"),
            ("GRIDCHARGE_LOG", "debug"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:8081");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.device.host, "10.1.1.1");
        assert_eq!(config.device.port, Some(1502));
        assert_eq!(config.device.profile, "huawei_luna2000");
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_let_rust_log_win_over_gridcharge_log() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("GRIDCHARGE_LOG", "debug"), ("RUST_LOG", "warn")]));
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("GRIDCHARGE_PORT", "http"),
            ("GRIDCHARGE_DEVICE_PORT", "-1"),
        ]));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.device.port, None);
    }

    #[test]
    fn should_default_device_port_to_profile_port() {
        let mut config = Config::default();
        assert_eq!(config.modbus().unwrap().port, 502);

        config.device.profile = "huawei_luna2000".to_string();
        let modbus = config.modbus().unwrap();
        assert_eq!(modbus.port, 6607);
        assert_eq!(modbus.timeout, Duration::from_secs(10));

        config.device.port = Some(1502);
        assert_eq!(config.modbus().unwrap().port, 1502);
    }

    #[test]
    fn should_format_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
