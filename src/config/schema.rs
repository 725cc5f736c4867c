//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::coordinator::NetworkIdentity;
use crate::port::{LinkSettings, ZNP_BAUD_RATE};
use crate::transport::{
    NotificationMode, NotificationSettings, TransportSettings, CLOSE_RECEIVE_TIMEOUT,
    DEFAULT_MAGIC_NUMBER,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial transport configuration
    pub transport: TransportConfig,
    /// ZigBee network identity (diagnostics only)
    pub network: NetworkConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every section for out-of-range values.
    pub fn validate(&self) -> ConfigResult<()> {
        self.transport.validate()?;
        self.network.validate()?;
        Ok(())
    }
}

/// Serial transport section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Device name or alias, e.g. "/dev/ttyACM0", "COM3", "cc2531"
    pub port: Option<String>,
    /// Handshake byte written after the link is configured
    pub magic_number: u8,
    /// Link speed; ZNP firmware runs at 230400
    pub baud_rate: u32,
    /// How long to wait for a port held by another process
    pub acquire_timeout_ms: u64,
    /// Blocking read timeout
    pub receive_timeout_ms: u64,
    /// Minimum bytes before a blocking read returns
    pub receive_threshold: usize,
    /// Data-available notification tuning
    pub notification: NotificationConfig,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: None,
            magic_number: DEFAULT_MAGIC_NUMBER,
            baud_rate: ZNP_BAUD_RATE,
            acquire_timeout_ms: 2000,
            receive_timeout_ms: 2000,
            receive_threshold: 1,
            notification: NotificationConfig::default(),
            port_aliases: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.baud_rate == 0 {
            return Err(ConfigError::validation(
                "transport.baud_rate",
                "must be greater than zero",
            ));
        }
        if self.receive_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "transport.receive_timeout_ms",
                "must be at least 1 ms; reads must not block forever",
            ));
        }
        if self.receive_threshold == 0 {
            return Err(ConfigError::validation(
                "transport.receive_threshold",
                "must be at least one byte",
            ));
        }
        if self.notification.poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "transport.notification.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Build the immutable transport settings. Requires `port`.
    pub fn settings(&self) -> ConfigResult<TransportSettings> {
        self.validate()?;
        let port = self
            .port
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired("transport.port".to_string()))?;

        Ok(TransportSettings {
            port: self.resolve_port(port),
            magic_number: self.magic_number,
            link: LinkSettings::eight_n_one(self.baud_rate),
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            receive_threshold: self.receive_threshold,
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
            close_receive_timeout: CLOSE_RECEIVE_TIMEOUT,
            notification: self.notification.settings(),
        })
    }
}

/// Data-available notification section.
///
/// These are platform tuning knobs: drivers that busy-poll their event
/// thread want a longer `idle_backoff_ms`; consumers that only use blocking
/// reads can set `mode = "disabled"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub mode: NotificationModeCfg,
    /// Hold time on the event thread after each notification
    pub idle_backoff_ms: u64,
    /// Pending-input poll interval
    pub poll_interval_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let defaults = NotificationSettings::default();
        Self {
            mode: NotificationModeCfg::Signal,
            idle_backoff_ms: u64::try_from(defaults.idle_backoff.as_millis())
                .unwrap_or(u64::MAX),
            poll_interval_ms: u64::try_from(defaults.poll_interval.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl NotificationConfig {
    pub fn settings(&self) -> NotificationSettings {
        NotificationSettings {
            mode: self.mode.into(),
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationModeCfg {
    #[default]
    Signal,
    Disabled,
}

impl From<NotificationModeCfg> for NotificationMode {
    fn from(mode: NotificationModeCfg) -> Self {
        match mode {
            NotificationModeCfg::Signal => NotificationMode::Signal,
            NotificationModeCfg::Disabled => NotificationMode::Disabled,
        }
    }
}

/// ZigBee network section. Only logged when the coordinator starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub pan_id: u16,
    pub channel: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            pan_id: 0xFFFF,
            channel: 11,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(11..=26).contains(&self.channel) {
            return Err(ConfigError::validation(
                "network.channel",
                format!("{} is not a 2.4 GHz channel (11-26)", self.channel),
            ));
        }
        Ok(())
    }

    pub fn identity(&self) -> NetworkIdentity {
        NetworkIdentity {
            pan_id: self.pan_id,
            channel: self.channel,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "info", "znp_transport=trace", ...
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
