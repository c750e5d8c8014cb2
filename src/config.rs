//! Deployment configuration.
//!
//! Every field has a default, so the server runs without a config file. A JSON
//! file only needs to name the values it changes.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cache::{default_staleness, DEFAULT_STALENESS_SECS};
use crate::diagnosis::DEFAULT_RECEIVER;
use crate::sensor::SensorKind;

pub const CONFIG_ENV: &str = "DHT_OPCUA_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
    pub diagnosis: DiagnosisConfig,
    pub nodes: NodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub application_name: String,
    pub application_uri: String,
    pub product_uri: String,
    pub host: String,
    pub port: u16,
    pub pki_dir: String,
    pub create_sample_keypair: bool,
    /// Namespace the sensor and peer manager nodes live in.
    pub namespace_uri: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_name: "Message".to_string(),
            application_uri: "urn:dht-opcua".to_string(),
            product_uri: "urn:dht-opcua:server".to_string(),
            host: "0.0.0.0".to_string(),
            port: 16664,
            pki_dir: "./pki".to_string(),
            create_sample_keypair: true,
            namespace_uri: "urn:dht-opcua:sensors".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    /// BCM pin number of the sensor data line
    pub gpio_pin: u8,
    pub poll_interval_ms: u64,
    pub staleness_secs: u64,
    /// Use the software sensor instead of GPIO
    pub simulate: bool,
    /// Share of simulated reads that fail
    pub simulated_failure_rate: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Dht22,
            gpio_pin: 17,
            poll_interval_ms: 2500,
            staleness_secs: DEFAULT_STALENESS_SECS,
            simulate: false,
            simulated_failure_rate: 0.1,
        }
    }
}

impl SensorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `None` when `staleness_secs` does not fit a `chrono::Duration`.
    pub fn try_staleness(&self) -> Option<chrono::Duration> {
        i64::try_from(self.staleness_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// Staleness threshold. Out-of-range values, which `validate` rejects,
    /// fall back to the default.
    pub fn staleness(&self) -> chrono::Duration {
        self.try_staleness().unwrap_or_else(default_staleness)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub gpio_pin: u8,
    pub receiver: String,
    /// When set, ON switches the LED off again after this long.
    pub hold_ms: Option<u64>,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            gpio_pin: 13,
            receiver: DEFAULT_RECEIVER.to_string(),
            hold_ms: None,
        }
    }
}

impl DiagnosisConfig {
    pub fn hold(&self) -> Option<Duration> {
        self.hold_ms.map(Duration::from_millis)
    }
}

/// Numeric identifiers, within the registered namespace, of the published nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub temperature: u32,
    pub humidity: u32,
    pub peer_manager: u32,
    pub registered_components: u32,
    pub drop_message: u32,
    pub led_state: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            temperature: 6001,
            humidity: 6247,
            peer_manager: 5000,
            registered_components: 5001,
            drop_message: 5002,
            led_state: 5003,
        }
    }
}

impl NodeConfig {
    fn ids(&self) -> [(&'static str, u32); 6] {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("peer_manager", self.peer_manager),
            ("registered_components", self.registered_components),
            ("drop_message", self.drop_message),
            ("led_state", self.led_state),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroPollInterval,
    ZeroStaleness,
    StalenessRange(u64),
    ZeroPort,
    FailureRate,
    SharedPin(u8),
    EmptyReceiver,
    DuplicateNode(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPollInterval => write!(f, "sensor.poll_interval_ms must be greater than 0"),
            Self::ZeroStaleness => write!(f, "sensor.staleness_secs must be greater than 0"),
            Self::StalenessRange(secs) => {
                write!(f, "sensor.staleness_secs {secs} is out of range")
            }
            Self::ZeroPort => write!(f, "server.port must be greater than 0"),
            Self::FailureRate => {
                write!(f, "sensor.simulated_failure_rate must be between 0.0 and 1.0")
            }
            Self::SharedPin(pin) => {
                write!(f, "GPIO {pin} is used for both the sensor and the diagnosis LED")
            }
            Self::EmptyReceiver => write!(f, "diagnosis.receiver must not be empty"),
            Self::DuplicateNode(id) => write!(f, "node id {id} is assigned more than once"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads `path` if given, otherwise the defaults, and validates the result.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.sensor.staleness_secs == 0 {
            return Err(ConfigError::ZeroStaleness);
        }
        if self.sensor.try_staleness().is_none() {
            return Err(ConfigError::StalenessRange(self.sensor.staleness_secs));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if !(0.0..=1.0).contains(&self.sensor.simulated_failure_rate) {
            return Err(ConfigError::FailureRate);
        }
        if self.sensor.gpio_pin == self.diagnosis.gpio_pin {
            return Err(ConfigError::SharedPin(self.sensor.gpio_pin));
        }
        if self.diagnosis.receiver.is_empty() {
            return Err(ConfigError::EmptyReceiver);
        }

        let ids = self.nodes.ids();
        for (i, (_, id)) in ids.iter().enumerate() {
            if ids[..i].iter().any(|(_, other)| other == id) {
                return Err(ConfigError::DuplicateNode(*id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sensor.gpio_pin, 17);
        assert_eq!(config.diagnosis.gpio_pin, 13);
        assert_eq!(config.server.port, 16664);
        assert_eq!(config.sensor.poll_interval(), Duration::from_millis(2500));
        assert_eq!(config.sensor.staleness(), chrono::Duration::seconds(60));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "sensor": { "kind": "DHT11", "simulate": true }, "diagnosis": { "hold_ms": 3000 } }"#,
        )
        .unwrap();
        assert_eq!(config.sensor.kind, SensorKind::Dht11);
        assert!(config.sensor.simulate);
        assert_eq!(config.sensor.gpio_pin, 17);
        assert_eq!(config.diagnosis.hold(), Some(Duration::from_secs(3)));
        assert_eq!(config.nodes.temperature, 6001);
    }

    #[test]
    fn empty_object_is_default() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.server.application_name, "Message");
    }

    #[test]
    fn rejects_shared_pin() {
        let mut config = Config::default();
        config.diagnosis.gpio_pin = config.sensor.gpio_pin;
        assert_eq!(config.validate(), Err(ConfigError::SharedPin(17)));
    }

    #[test]
    fn rejects_zero_interval_and_staleness() {
        let err = Config::from_json(r#"{ "sensor": { "poll_interval_ms": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));

        let mut config = Config::default();
        config.sensor.staleness_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroStaleness));
    }

    #[test]
    fn rejects_staleness_beyond_duration_range() {
        let largest = i64::MAX as u64 / 1000;
        let mut config = Config::default();
        config.sensor.staleness_secs = largest;
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sensor.staleness(), chrono::Duration::seconds(largest as i64));

        config.sensor.staleness_secs = largest + 1;
        assert_eq!(config.validate(), Err(ConfigError::StalenessRange(largest + 1)));
        assert_eq!(config.sensor.staleness(), default_staleness());

        let err = Config::from_json(r#"{ "sensor": { "staleness_secs": 18446744073709551615 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let mut config = Config::default();
        config.nodes.humidity = config.nodes.temperature;
        assert_eq!(config.validate(), Err(ConfigError::DuplicateNode(6001)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/dht-opcua.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }
}
