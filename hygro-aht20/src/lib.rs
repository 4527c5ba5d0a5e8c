//! Driver for the AHT20 temperature/humidity sensor.
//!
//! The driver speaks the sensor's command/response protocol over any
//! [`BusTransport`]: it issues commands with their settle delays, polls the
//! busy flag, decodes and checksums measurement frames, and tracks
//! degenerate all-zero readings so a supervisor can reset a wedged sensor.

pub mod anomaly;
pub mod command;
pub mod crc;
pub mod driver;
pub mod error;
pub mod frame;
pub mod sim;
pub mod sink;
pub mod status;
pub mod transport;

pub use anomaly::{AnomalyPolicy, ZeroReadingVerdict};
pub use command::Command;
pub use driver::{Aht20, DriverConfig, DriverMetrics, MeasureOutcome, SampleReport};
pub use error::DriverError;
pub use frame::{FRAME_LEN, Frame, RawMeasurement};
pub use sim::{Fault, SimulatedBus, SimulatedSensor};
pub use sink::{ChannelSink, DriverEvent, ReadingSink};
pub use status::Status;
pub use transport::{BusTransport, SharedBus, TransportError};

pub use hygro_core::{AHT20_ADDRESS, DriverState, Reading, TemperatureUnit};
