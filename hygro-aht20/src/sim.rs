//! In-process AHT20 simulation behind the [`BusTransport`] seam.
//!
//! Used by the test suite and by the agent when no hardware bus is
//! configured. Each simulated sensor answers at its own address; faults can
//! be queued to reproduce the failure modes seen on real devices.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use hygro_core::Reading;
use rand::Rng;

use crate::command::Command;
use crate::frame::{CHECKSUM_SPAN, FRAME_LEN, Frame, RawMeasurement};
use crate::status::{STATUS_BIT_BUSY, STATUS_BIT_CALIBRATION_ENABLED};
use crate::transport::{BusTransport, TransportError};

/// A misbehaviour to inject into the next matching exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Next frame read returns a checksum-valid all-zero frame.
    ZeroFrame,
    /// Next frame read returns a frame with a wrong checksum byte.
    CorruptChecksum,
    /// Next frame read returns only this many bytes.
    ShortFrame(usize),
    /// Next status read returns no bytes.
    ShortStatus,
    /// Next measurement never leaves the busy state.
    StuckBusy,
}

/// One transaction seen on the simulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Write { address: u8, opcode: u8, args: Vec<u8> },
    WriteByte { address: u8, opcode: u8 },
    Read { address: u8, requested: usize, returned: usize },
}

impl BusOp {
    pub fn address(&self) -> u8 {
        match self {
            BusOp::Write { address, .. }
            | BusOp::WriteByte { address, .. }
            | BusOp::Read { address, .. } => *address,
        }
    }

    pub fn opcode(&self) -> Option<u8> {
        match self {
            BusOp::Write { opcode, .. } | BusOp::WriteByte { opcode, .. } => Some(*opcode),
            BusOp::Read { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    pub humidity_percent: f64,
    pub temperature_celsius: f64,
    /// Maximum random deviation added to each value per frame.
    pub jitter: f64,
    pub calibrated: bool,
    /// Busy status reads reported after each measure command.
    pub busy_polls: u32,
    busy_remaining: u32,
    faults: VecDeque<Fault>,
}

impl SimulatedSensor {
    pub fn new(humidity_percent: f64, temperature_celsius: f64) -> Self {
        Self {
            humidity_percent,
            temperature_celsius,
            jitter: 0.0,
            calibrated: true,
            busy_polls: 1,
            busy_remaining: 0,
            faults: VecDeque::new(),
        }
    }

    pub fn uncalibrated(mut self) -> Self {
        self.calibrated = false;
        self
    }

    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.abs();
        self
    }

    pub fn inject(&mut self, fault: Fault) {
        self.faults.push_back(fault);
    }

    fn take_fault(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let index = self.faults.iter().position(matches)?;
        self.faults.remove(index)
    }

    fn status_byte(&self) -> u8 {
        let mut status = 0;
        if self.busy_remaining > 0 {
            status |= 1 << STATUS_BIT_BUSY;
        }
        if self.calibrated {
            status |= 1 << STATUS_BIT_CALIBRATION_ENABLED;
        }
        status
    }

    fn command(&mut self, opcode: u8) {
        match opcode {
            op if op == Command::INIT.opcode => self.calibrated = true,
            op if op == Command::MEASURE.opcode => {
                self.busy_remaining = match self.take_fault(|f| *f == Fault::StuckBusy) {
                    Some(_) => u32::MAX,
                    None => self.busy_polls,
                };
            }
            op if op == Command::RESET.opcode => {
                self.calibrated = false;
                self.busy_remaining = 0;
            }
            _ => {}
        }
    }

    fn read_status(&mut self, buf: &mut [u8]) -> usize {
        if self.take_fault(|f| *f == Fault::ShortStatus).is_some() {
            return 0;
        }

        buf[0] = self.status_byte();
        self.busy_remaining = self.busy_remaining.saturating_sub(1);
        1
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> usize {
        let fault = self.take_fault(|f| {
            matches!(
                f,
                Fault::ZeroFrame | Fault::CorruptChecksum | Fault::ShortFrame(_)
            )
        });

        let mut frame = match fault {
            Some(Fault::ZeroFrame) => {
                let mut bytes = [0u8; FRAME_LEN];
                bytes[6] = crate::crc::compute(&bytes, CHECKSUM_SPAN);
                Frame(bytes)
            }
            _ => Frame::encode(self.status_byte(), RawMeasurement::from_reading(&self.sample())),
        };

        let mut available = FRAME_LEN;
        match fault {
            Some(Fault::CorruptChecksum) => frame.0[6] ^= 0xFF,
            Some(Fault::ShortFrame(len)) => available = len.min(FRAME_LEN),
            _ => {}
        }

        let len = available.min(buf.len());
        buf[..len].copy_from_slice(&frame.0[..len]);
        len
    }

    fn sample(&self) -> Reading {
        let (humidity, temperature) = if self.jitter > 0.0 {
            let mut rng = rand::rng();
            (
                self.humidity_percent + rng.random_range(-self.jitter..=self.jitter),
                self.temperature_celsius + rng.random_range(-self.jitter..=self.jitter),
            )
        } else {
            (self.humidity_percent, self.temperature_celsius)
        };

        Reading {
            humidity_percent: humidity.clamp(0.0, 100.0),
            temperature_celsius: temperature,
        }
    }
}

/// A bus populated with simulated sensors.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    sensors: HashMap<u8, SimulatedSensor>,
    history: Vec<BusOp>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensor(mut self, address: u8, sensor: SimulatedSensor) -> Self {
        self.attach(address, sensor);
        self
    }

    pub fn attach(&mut self, address: u8, sensor: SimulatedSensor) {
        self.sensors.insert(address, sensor);
    }

    pub fn sensor_mut(&mut self, address: u8) -> Option<&mut SimulatedSensor> {
        self.sensors.get_mut(&address)
    }

    /// Queue a fault on the sensor at `address`. Ignored for empty addresses.
    pub fn inject(&mut self, address: u8, fault: Fault) {
        if let Some(sensor) = self.sensors.get_mut(&address) {
            sensor.inject(fault);
        }
    }

    pub fn history(&self) -> &[BusOp] {
        &self.history
    }

    /// Opcodes written to `address`, in order.
    pub fn opcodes(&self, address: u8) -> Vec<u8> {
        self.history
            .iter()
            .filter(|op| op.address() == address)
            .filter_map(BusOp::opcode)
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn sensor(&mut self, address: u8) -> Result<&mut SimulatedSensor, TransportError> {
        self.sensors
            .get_mut(&address)
            .ok_or(TransportError::Nack { address })
    }
}

#[async_trait]
impl BusTransport for SimulatedBus {
    async fn write(&mut self, address: u8, opcode: u8, args: &[u8]) -> Result<(), TransportError> {
        self.sensor(address)?.command(opcode);
        self.history.push(BusOp::Write {
            address,
            opcode,
            args: args.to_vec(),
        });
        Ok(())
    }

    async fn write_byte(&mut self, address: u8, opcode: u8) -> Result<(), TransportError> {
        self.sensor(address)?.command(opcode);
        self.history.push(BusOp::WriteByte { address, opcode });
        Ok(())
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, TransportError> {
        let sensor = self.sensor(address)?;
        let returned = match buf.len() {
            0 => 0,
            1 => sensor.read_status(buf),
            _ => sensor.read_frame(buf),
        };

        self.history.push(BusOp::Read {
            address,
            requested: buf.len(),
            returned,
        });
        Ok(returned)
    }
}
