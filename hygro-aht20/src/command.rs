use std::time::Duration;

use tracing::trace;

use crate::transport::{BusTransport, TransportError};

/// A device command: opcode, optional argument bytes and the delay the
/// sensor needs before it accepts the next interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub opcode: u8,
    pub args: &'static [u8],
    pub settle: Duration,
}

impl Command {
    /// Query the status byte.
    pub const STATUS: Command = Command {
        name: "status",
        opcode: 0x71,
        args: &[],
        settle: Duration::from_millis(200),
    };

    /// Load calibration coefficients.
    pub const INIT: Command = Command {
        name: "init",
        opcode: 0xBE,
        args: &[0x08, 0x00],
        settle: Duration::from_millis(10),
    };

    /// Start a humidity/temperature conversion.
    pub const MEASURE: Command = Command {
        name: "measure",
        opcode: 0xAC,
        args: &[0x33, 0x00],
        settle: Duration::from_millis(80),
    };

    pub const RESET: Command = Command {
        name: "reset",
        opcode: 0xBA,
        args: &[],
        settle: Duration::from_millis(20),
    };

    /// Write the command to `address` and wait out its settle delay.
    ///
    /// The caller must hold the bus for the whole call.
    pub async fn send<T: BusTransport>(&self, bus: &mut T, address: u8) -> Result<(), TransportError> {
        trace!(command = self.name, opcode = self.opcode, address, "Sending command");

        if self.args.is_empty() {
            bus.write_byte(address, self.opcode).await?;
        } else {
            bus.write(address, self.opcode, self.args).await?;
        }

        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}
