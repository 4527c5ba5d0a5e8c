use hygro_core::Reading;

use crate::crc;

/// Bytes requested from the sensor per measurement.
pub const FRAME_LEN: usize = 7;
/// Reads shorter than this are abandoned without decoding.
pub const MIN_FRAME_LEN: usize = 5;
/// Number of leading bytes covered by the checksum.
pub const CHECKSUM_SPAN: usize = 6;

const CODE_MAX: u32 = (1 << 20) - 1;
const CODE_SCALE: f64 = (1u32 << 20) as f64;

/// A raw measurement frame.
///
/// ```text
///   byte 0    : status
///   bytes 1-2 : humidity, high 16 bits
///   byte 3    : humidity low nibble (high half), temperature high nibble (low half)
///   bytes 4-5 : temperature, low 16 bits
///   byte 6    : crc8 over bytes 0-5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(pub [u8; FRAME_LEN]);

impl Frame {
    /// Build a frame carrying `raw`, with a valid checksum.
    pub fn encode(status: u8, raw: RawMeasurement) -> Self {
        let humidity = raw.humidity & CODE_MAX;
        let temperature = raw.temperature & CODE_MAX;

        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = status;
        bytes[1] = (humidity >> 12) as u8;
        bytes[2] = (humidity >> 4) as u8;
        bytes[3] = ((humidity & 0x0F) << 4) as u8 | (temperature >> 16) as u8;
        bytes[4] = (temperature >> 8) as u8;
        bytes[5] = temperature as u8;
        bytes[6] = crc::compute(&bytes, CHECKSUM_SPAN);

        Self(bytes)
    }

    pub fn status(&self) -> u8 {
        self.0[0]
    }

    pub fn received_checksum(&self) -> u8 {
        self.0[6]
    }

    pub fn computed_checksum(&self) -> u8 {
        crc::compute(&self.0, CHECKSUM_SPAN)
    }

    pub fn checksum_valid(&self) -> bool {
        self.received_checksum() == self.computed_checksum()
    }

    /// Extract the two 20-bit conversion codes.
    pub fn raw(&self) -> RawMeasurement {
        let b = &self.0;

        let humidity = (u32::from(b[1]) << 12) | (u32::from(b[2]) << 4) | (u32::from(b[3]) >> 4);
        let temperature =
            ((u32::from(b[3]) & 0x0F) << 16) | (u32::from(b[4]) << 8) | u32::from(b[5]);

        RawMeasurement {
            humidity,
            temperature,
        }
    }
}

/// The 20-bit humidity and temperature codes of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMeasurement {
    pub humidity: u32,
    pub temperature: u32,
}

impl RawMeasurement {
    /// Quantize a reading into conversion codes, saturating at the code range.
    pub fn from_reading(reading: &Reading) -> Self {
        let humidity = (reading.humidity_percent * CODE_SCALE / 100.0).round();
        let temperature = ((reading.temperature_celsius + 50.0) * CODE_SCALE / 200.0).round();

        Self {
            humidity: humidity.clamp(0.0, f64::from(CODE_MAX)) as u32,
            temperature: temperature.clamp(0.0, f64::from(CODE_MAX)) as u32,
        }
    }

    /// Both codes are zero, which the sensor produces when it has wedged.
    pub fn is_degenerate(&self) -> bool {
        self.humidity == 0 && self.temperature == 0
    }

    pub fn humidity_percent(&self) -> f64 {
        f64::from(self.humidity) * 100.0 / CODE_SCALE
    }

    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature) * 200.0 / CODE_SCALE - 50.0
    }

    pub fn reading(&self) -> Reading {
        Reading {
            humidity_percent: self.humidity_percent(),
            temperature_celsius: self.temperature_celsius(),
        }
    }
}
