pub const STATUS_BIT_CALIBRATION_ENABLED: u8 = 3;
pub const STATUS_BIT_BUSY: u8 = 7;

/// The status byte returned by the sensor after a status query, and as the
/// first byte of every measurement frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    /// The device is still processing a previous command.
    pub fn busy(self) -> bool {
        self.0 & (1 << STATUS_BIT_BUSY) != 0
    }

    /// The device holds valid calibration data and needs no init command.
    pub fn calibration_enabled(self) -> bool {
        self.0 & (1 << STATUS_BIT_CALIBRATION_ENABLED) != 0
    }
}
