use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use hygro_aht20::DriverConfig;
use hygro_core::{AHT20_ADDRESS, TemperatureUnit};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub bus: BusConfig,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Registry device identifier
    pub device_id: String,
    pub friendly_name: String,
    /// Interval in seconds between measurements of each sensor
    pub sample_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    Simulated {
        /// Relative humidity reported by every simulated sensor
        humidity: f64,
        temperature_celsius: f64,
        /// Maximum random deviation per reading
        #[serde(default)]
        jitter: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Registry node name
    pub name: String,
    #[serde(default = "default_address")]
    pub address: u8,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default = "default_true")]
    pub auto_reset: bool,
    #[serde(default = "default_max_busy_polls")]
    pub max_busy_polls: u32,
    #[serde(default = "default_zero_reading_threshold")]
    pub zero_reading_threshold: u32,
    #[serde(default = "default_reset_holdoff_secs")]
    pub reset_holdoff_secs: u64,
}

fn default_address() -> u8 {
    AHT20_ADDRESS
}

fn default_true() -> bool {
    true
}

fn default_max_busy_polls() -> u32 {
    100
}

fn default_zero_reading_threshold() -> u32 {
    5
}

fn default_reset_holdoff_secs() -> u64 {
    90
}

impl SensorConfig {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            address: self.address,
            temperature_unit: self.temperature_unit,
            max_busy_polls: self.max_busy_polls,
            auto_reset: self.auto_reset,
            zero_reading_threshold: self.zero_reading_threshold,
            reset_holdoff: Duration::from_secs(self.reset_holdoff_secs),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the agent cannot run with.
    pub fn validate(&self) -> color_eyre::Result<()> {
        if self.agent.sample_interval_secs == 0 {
            return Err(color_eyre::eyre::eyre!(
                "agent.sample_interval_secs must be at least 1"
            ));
        }

        for sensor in &self.sensors {
            if sensor.zero_reading_threshold == 0 {
                return Err(color_eyre::eyre::eyre!(
                    "sensor '{}': zero_reading_threshold must be at least 1",
                    sensor.name
                ));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentConfig {
                device_id: "hygro".to_string(),
                friendly_name: "Hygro".to_string(),
                sample_interval_secs: 30,
            },
            server: ServerConfig {
                http_addr: "0.0.0.0:8090".parse().unwrap(),
            },
            bus: BusConfig::Simulated {
                humidity: 45.0,
                temperature_celsius: 21.0,
                jitter: 0.5,
            },
            sensors: vec![SensorConfig {
                name: "aht20".to_string(),
                address: AHT20_ADDRESS,
                temperature_unit: TemperatureUnit::Fahrenheit,
                auto_reset: true,
                max_busy_polls: default_max_busy_polls(),
                zero_reading_threshold: default_zero_reading_threshold(),
                reset_holdoff_secs: default_reset_holdoff_secs(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_sensor_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            device_id = "greenhouse"
            friendly_name = "Greenhouse"
            sample_interval_secs = 10

            [server]
            http_addr = "127.0.0.1:8090"

            [bus]
            type = "simulated"
            humidity = 55.0
            temperature_celsius = 19.5

            [[sensors]]
            name = "bench"

            [[sensors]]
            name = "roof"
            address = 0x39
            temperature_unit = "celsius"
            auto_reset = false
            reset_holdoff_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.sensors.len(), 2);

        let bench = config.sensors[0].driver_config();
        assert_eq!(bench.address, 0x38);
        assert_eq!(bench.temperature_unit, TemperatureUnit::Fahrenheit);
        assert!(bench.auto_reset);
        assert_eq!(bench.max_busy_polls, 100);
        assert_eq!(bench.zero_reading_threshold, 5);
        assert_eq!(bench.reset_holdoff, Duration::from_secs(90));

        let roof = config.sensors[1].driver_config();
        assert_eq!(roof.address, 0x39);
        assert_eq!(roof.temperature_unit, TemperatureUnit::Celsius);
        assert!(!roof.auto_reset);
        assert_eq!(roof.reset_holdoff, Duration::from_secs(300));

        let BusConfig::Simulated { jitter, .. } = config.bus;
        assert_eq!(jitter, 0.0);
    }

    #[test]
    fn rejects_zero_sample_interval() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.agent.sample_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sample_interval_secs"));
    }

    #[test]
    fn load_rejects_zero_sample_interval() {
        let path = std::env::temp_dir().join(format!(
            "hygro-agent-zero-interval-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
            [agent]
            device_id = "x"
            friendly_name = "x"
            sample_interval_secs = 0

            [server]
            http_addr = "127.0.0.1:8090"

            [bus]
            type = "simulated"
            humidity = 50.0
            temperature_celsius = 20.0
            "#,
        )
        .unwrap();

        let result = Config::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_reading_threshold() {
        let mut config = Config::default();
        config.sensors[0].zero_reading_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_bus_type() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [agent]
            device_id = "x"
            friendly_name = "x"
            sample_interval_secs = 10

            [server]
            http_addr = "127.0.0.1:8090"

            [bus]
            type = "spi"
            "#,
        );

        assert!(result.is_err());
    }
}
