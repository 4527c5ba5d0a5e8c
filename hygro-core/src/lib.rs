use std::fmt;

use serde::{Deserialize, Serialize};

/// Default peripheral address of an AHT20 on the bus.
pub const AHT20_ADDRESS: u8 = 0x38;

/// Protocol state of a single sensor driver.
///
/// `Unknown` is the value before any command has been issued. `Idle` is the
/// only state in which the device has no exchange in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    #[default]
    Unknown,
    Idle,
    ReceivingStatus,
    ReceivingMeasurement,
    Resetting,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Unknown => "unknown",
            DriverState::Idle => "idle",
            DriverState::ReceivingStatus => "receiving_status",
            DriverState::ReceivingMeasurement => "receiving_measurement",
            DriverState::Resetting => "resetting",
        };
        f.write_str(name)
    }
}

/// Unit used when publishing temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }

    /// Unit label as shown to registry consumers.
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Advertised value range (`min:max`) for a temperature property.
    pub fn format(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "-30:50",
            TemperatureUnit::Fahrenheit => "-20:120",
        }
    }
}

/// A decoded, checksum-valid humidity/temperature pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Relative humidity in percent, 0 to 100.
    pub humidity_percent: f64,
    /// Temperature in degrees Celsius.
    pub temperature_celsius: f64,
}

impl Reading {
    pub fn temperature_fahrenheit(&self) -> f64 {
        TemperatureUnit::Fahrenheit.from_celsius(self.temperature_celsius)
    }

    pub fn temperature_in(&self, unit: TemperatureUnit) -> f64 {
        unit.from_celsius(self.temperature_celsius)
    }
}

/// Data type of a registry property. Sensor readings are all floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyDataType {
    Float,
}

/// A published value exposed by a registry node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub friendly_name: String,
    pub data_type: PropertyDataType,
    pub settable: bool,
    /// Value range, e.g. `0:100`.
    pub format: Option<String>,
    pub unit: Option<String>,
    /// Whether consumers should see the last value on subscription.
    pub retained: bool,
}

/// A group of properties belonging to one physical sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub friendly_name: String,
    pub node_type: String,
    pub is_range: bool,
}
