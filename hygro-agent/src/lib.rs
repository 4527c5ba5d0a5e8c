pub mod api;
pub mod config;
pub mod registry;
pub mod supervisor;

pub use config::{AgentConfig, BusConfig, Config, SensorConfig, ServerConfig};
pub use registry::{DeviceRegistry, DeviceSnapshot, RegistryError, RegistrySink};
pub use supervisor::run_sensor;
