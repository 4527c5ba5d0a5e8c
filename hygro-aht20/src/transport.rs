use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bus has not been opened")]
    NotOpen,
    #[error("no device acknowledged address {address:#04x}")]
    Nack { address: u8 },
    #[error("bus i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-oriented access to peripherals on a two-wire bus.
///
/// Implementations perform a single bus transaction per call; sequencing,
/// delays and retries are the caller's concern.
#[async_trait]
pub trait BusTransport: Send + 'static {
    /// Send `opcode` followed by `args` as one block write.
    async fn write(&mut self, address: u8, opcode: u8, args: &[u8]) -> Result<(), TransportError>;

    /// Send a bare command byte.
    async fn write_byte(&mut self, address: u8, opcode: u8) -> Result<(), TransportError>;

    /// Read up to `buf.len()` bytes, returning how many were actually read.
    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// A bus shared by every device attached to it.
///
/// Holding the guard returned by [`SharedBus::lock`] is what makes an
/// exchange (command, settle delay, response) atomic across devices.
pub struct SharedBus<T> {
    inner: Arc<Mutex<T>>,
}

impl<T: BusTransport> SharedBus<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Wait for exclusive access to the bus.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
