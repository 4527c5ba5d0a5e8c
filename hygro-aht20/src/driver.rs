use std::sync::Arc;
use std::time::Duration;

use hygro_core::{AHT20_ADDRESS, DriverState, Reading, TemperatureUnit};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::anomaly::{
    AnomalyPolicy, DEFAULT_RESET_HOLDOFF, DEFAULT_ZERO_READING_THRESHOLD, ZeroReadingVerdict,
};
use crate::command::Command;
use crate::error::DriverError;
use crate::frame::{FRAME_LEN, Frame, MIN_FRAME_LEN};
use crate::sink::ReadingSink;
use crate::status::Status;
use crate::transport::{BusTransport, SharedBus};

/// Delay between status polls while a conversion is running.
pub const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Peripheral address on the bus.
    pub address: u8,
    /// Unit of the temperatures handed to the sink.
    pub temperature_unit: TemperatureUnit,
    /// Status polls allowed per measurement before giving up.
    pub max_busy_polls: u32,
    /// Soft-reset the sensor when the anomaly policy asks for it.
    pub auto_reset: bool,
    pub zero_reading_threshold: u32,
    pub reset_holdoff: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: AHT20_ADDRESS,
            temperature_unit: TemperatureUnit::Fahrenheit,
            max_busy_polls: 100,
            auto_reset: true,
            zero_reading_threshold: DEFAULT_ZERO_READING_THRESHOLD,
            reset_holdoff: DEFAULT_RESET_HOLDOFF,
        }
    }
}

/// Result of one measurement cycle that reached the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureOutcome {
    /// A valid reading was decoded and published.
    Accepted(Reading),
    /// The device returned too few bytes; nothing was decoded.
    ShortFrame { bytes_read: usize },
    /// The frame failed its checksum and was discarded.
    ChecksumMismatch { received: u8, computed: u8 },
    /// A checksum-valid all-zero frame.
    Degenerate(ZeroReadingVerdict),
}

impl MeasureOutcome {
    pub fn reading(&self) -> Option<Reading> {
        match self {
            MeasureOutcome::Accepted(reading) => Some(*reading),
            _ => None,
        }
    }

    pub fn reset_recommended(&self) -> bool {
        matches!(self, MeasureOutcome::Degenerate(verdict) if verdict.reset_recommended)
    }
}

/// What a supervised measurement did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReport {
    pub outcome: MeasureOutcome,
    /// Outcome of the re-initialization measurement, when the sample
    /// triggered an automatic reset.
    pub after_reset: Option<MeasureOutcome>,
}

/// Snapshot of a driver's per-device bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverMetrics {
    /// Last accepted relative humidity, in percent.
    pub humidity: f64,
    /// Last accepted temperature, in the configured unit.
    pub temperature: f64,
    pub last_reading: Option<Reading>,
    pub last_reset: Instant,
    pub consecutive_zero_readings: u32,
}

struct Device {
    policy: AnomalyPolicy,
    humidity: f64,
    temperature: f64,
    last_reading: Option<Reading>,
}

/// Protocol driver for one AHT20.
///
/// Every public operation holds the device lock for its whole duration, so
/// concurrent callers are served one cycle at a time. Each exchange with the
/// sensor additionally holds the shared bus.
pub struct Aht20<T> {
    bus: SharedBus<T>,
    config: DriverConfig,
    sink: Arc<dyn ReadingSink>,
    state: watch::Sender<DriverState>,
    device: Mutex<Device>,
}

impl<T: BusTransport> Aht20<T> {
    pub fn new(bus: SharedBus<T>, config: DriverConfig, sink: Arc<dyn ReadingSink>) -> Self {
        let (state, _) = watch::channel(DriverState::Unknown);
        let policy = AnomalyPolicy::new(
            config.zero_reading_threshold,
            config.reset_holdoff,
            Instant::now(),
        );

        Self {
            bus,
            config,
            sink,
            state,
            device: Mutex::new(Device {
                policy,
                humidity: 0.0,
                temperature: 0.0,
                last_reading: None,
            }),
        }
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    /// Watch state transitions. Only actual changes are observed.
    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub async fn metrics(&self) -> DriverMetrics {
        let device = self.device.lock().await;

        DriverMetrics {
            humidity: device.humidity,
            temperature: device.temperature,
            last_reading: device.last_reading,
            last_reset: device.policy.last_reset(),
            consecutive_zero_readings: device.policy.consecutive_zero_readings(),
        }
    }

    /// Query the status, load calibration if the device lacks it, then take
    /// a first measurement.
    pub async fn initialize(&self) -> Result<MeasureOutcome, DriverError> {
        let mut device = self.device.lock().await;
        self.initialize_locked(&mut device).await
    }

    /// Run one measurement cycle.
    pub async fn measure(&self) -> Result<MeasureOutcome, DriverError> {
        let mut device = self.device.lock().await;
        self.measure_locked(&mut device).await
    }

    /// Soft-reset the sensor and bootstrap it again.
    pub async fn reset(&self) -> Result<MeasureOutcome, DriverError> {
        let mut device = self.device.lock().await;
        self.reset_locked(&mut device).await
    }

    /// Measure, and reset the sensor when the anomaly policy recommends it
    /// and `auto_reset` is enabled.
    pub async fn sample(&self) -> Result<SampleReport, DriverError> {
        let mut device = self.device.lock().await;
        let outcome = self.measure_locked(&mut device).await?;

        let after_reset = match outcome {
            MeasureOutcome::Degenerate(verdict)
                if verdict.reset_recommended && self.config.auto_reset =>
            {
                info!(
                    address = self.config.address,
                    consecutive = verdict.consecutive,
                    "Initiating automatic reset due to continuous all-zero readings"
                );
                Some(self.reset_locked(&mut device).await?)
            }
            _ => None,
        };

        Ok(SampleReport {
            outcome,
            after_reset,
        })
    }

    async fn initialize_locked(&self, device: &mut Device) -> Result<MeasureOutcome, DriverError> {
        let status = self.query_status().await?;

        if !status.calibration_enabled() {
            info!(address = self.config.address, "Sending initialization command");
            let mut bus = self.bus.lock().await;
            Command::INIT.send(&mut *bus, self.config.address).await?;
        }

        self.measure_locked(device).await
    }

    async fn reset_locked(&self, device: &mut Device) -> Result<MeasureOutcome, DriverError> {
        device.policy.record_reset(Instant::now());
        info!(address = self.config.address, "Resetting sensor");
        self.set_state(DriverState::Resetting);

        {
            let mut bus = self.bus.lock().await;
            Command::RESET.send(&mut *bus, self.config.address).await?;
        }

        self.initialize_locked(device).await
    }

    async fn query_status(&self) -> Result<Status, DriverError> {
        debug!(address = self.config.address, "Requesting device status");
        self.set_state(DriverState::ReceivingStatus);

        let mut bus = self.bus.lock().await;
        Command::STATUS.send(&mut *bus, self.config.address).await?;
        self.read_status(&mut *bus, DriverState::Idle).await
    }

    async fn measure_locked(&self, device: &mut Device) -> Result<MeasureOutcome, DriverError> {
        let address = self.config.address;
        debug!(address, "Requesting measurement");
        self.set_state(DriverState::ReceivingStatus);

        let mut bus = self.bus.lock().await;
        Command::MEASURE.send(&mut *bus, address).await?;

        let mut status = self
            .read_status(&mut *bus, DriverState::ReceivingMeasurement)
            .await?;
        let mut polls = 0;
        while status.busy() {
            if polls >= self.config.max_busy_polls {
                return Err(DriverError::BusyTimeout { polls });
            }
            tokio::time::sleep(BUSY_POLL_INTERVAL).await;
            status = self
                .read_status(&mut *bus, DriverState::ReceivingMeasurement)
                .await?;
            polls += 1;
        }

        let mut buf = [0u8; FRAME_LEN];
        let bytes_read = bus.read(address, &mut buf).await?;
        drop(bus);

        if bytes_read < MIN_FRAME_LEN {
            warn!(
                address,
                bytes_read,
                needed = MIN_FRAME_LEN,
                "Sensor returned a short measurement frame"
            );
            return Ok(MeasureOutcome::ShortFrame { bytes_read });
        }

        let frame = Frame(buf);
        let outcome = if !frame.checksum_valid() {
            warn!(
                address,
                received = frame.received_checksum(),
                computed = frame.computed_checksum(),
                frame = ?frame.0,
                "Received invalid data from sensor"
            );
            MeasureOutcome::ChecksumMismatch {
                received: frame.received_checksum(),
                computed: frame.computed_checksum(),
            }
        } else if frame.raw().is_degenerate() {
            let verdict = device.policy.record_zero_reading(Instant::now());
            debug!(
                address,
                count = verdict.consecutive,
                seconds_since_reset = verdict.since_reset.as_secs(),
                reset_recommended = verdict.reset_recommended,
                "Received all-zero reading"
            );
            MeasureOutcome::Degenerate(verdict)
        } else {
            let reading = frame.raw().reading();
            let temperature = reading.temperature_in(self.config.temperature_unit);

            device.policy.record_accepted();
            device.humidity = reading.humidity_percent;
            device.temperature = temperature;
            device.last_reading = Some(reading);

            self.sink.humidity(reading.humidity_percent);
            self.sink.temperature(temperature);
            MeasureOutcome::Accepted(reading)
        };

        self.set_state(DriverState::Idle);
        Ok(outcome)
    }

    async fn read_status(&self, bus: &mut T, state_if_idle: DriverState) -> Result<Status, DriverError> {
        let mut buf = [0u8; 1];
        let read = bus.read(self.config.address, &mut buf).await?;
        if read != 1 {
            return Err(DriverError::UnexpectedStatusLength { read });
        }

        let status = Status(buf[0]);
        if !status.busy() {
            self.set_state(state_if_idle);
        }

        debug!(
            address = self.config.address,
            status = status.0,
            busy = status.busy(),
            calibration_enabled = status.calibration_enabled(),
            "Received status response"
        );
        Ok(status)
    }

    fn set_state(&self, value: DriverState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });

        if changed {
            self.sink.state(value);
        }
    }
}
