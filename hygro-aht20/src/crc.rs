//! CRC-8 used by the AHT20 to protect measurement frames.
//!
//! Polynomial `x^8 + x^5 + x^4 + 1` (0x31), initial value 0xFF, no
//! reflection, no final XOR. This is the catalogued `CRC-8/NRSC-5`.

use ::crc::{CRC_8_NRSC_5, Crc};

pub const CRC8_INIT: u8 = CRC_8_NRSC_5.init;
pub const CRC8_POLY: u8 = CRC_8_NRSC_5.poly;

const AHT20_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Compute the checksum over the first `length` bytes of `bytes`.
///
/// `length` is clamped to the slice length.
pub fn compute(bytes: &[u8], length: usize) -> u8 {
    AHT20_CRC.checksum(&bytes[..length.min(bytes.len())])
}
