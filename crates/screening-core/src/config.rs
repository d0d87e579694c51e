use crate::events::LONG_PRESS_DELAY;
use crate::wait::POLL_INTERVAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreeningConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScreeningConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_wait_timeout_ms")]
    pub default_wait_timeout_ms: u64,
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

impl AgentConfig {
    /// Spacing between wait attempts, never below 1ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            default_wait_timeout_ms: default_wait_timeout_ms(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    POLL_INTERVAL.as_millis() as u64
}

fn default_wait_timeout_ms() -> u64 {
    10000
}

fn default_long_press_ms() -> u64 {
    LONG_PRESS_DELAY.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Origin of the controller, e.g. `http://127.0.0.1:9001`.
    #[serde(default = "default_controller")]
    pub controller: String,
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            controller: default_controller(),
            path: default_path(),
        }
    }
}

fn default_controller() -> String {
    "http://127.0.0.1:9001".to_string()
}

fn default_path() -> String {
    "/agent".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}
