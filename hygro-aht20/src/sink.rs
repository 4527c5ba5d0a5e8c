use std::num::NonZeroUsize;

use hygro_core::DriverState;
use tokio::sync::mpsc;
use tracing::warn;

/// Receiver of published values and state transitions.
///
/// Notifications are fire-and-forget: the driver never retries or waits
/// for acknowledgement, so implementations must not block.
pub trait ReadingSink: Send + Sync {
    fn humidity(&self, value: f64);
    fn temperature(&self, value: f64);
    fn state(&self, value: DriverState);
}

/// A single driver notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverEvent {
    Humidity(f64),
    Temperature(f64),
    State(DriverState),
}

/// Forwards driver notifications into a bounded channel.
///
/// Events are dropped when the channel is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DriverEvent>,
}

impl ChannelSink {
    pub fn new(capacity: NonZeroUsize) -> (Self, mpsc::Receiver<DriverEvent>) {
        let (tx, rx) = mpsc::channel(capacity.get());
        (Self { tx }, rx)
    }

    fn forward(&self, event: DriverEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(?event, error = %e, "Driver event queue unavailable, dropping event");
        }
    }
}

impl ReadingSink for ChannelSink {
    fn humidity(&self, value: f64) {
        self.forward(DriverEvent::Humidity(value));
    }

    fn temperature(&self, value: f64) {
        self.forward(DriverEvent::Temperature(value));
    }

    fn state(&self, value: DriverState) {
        self.forward(DriverEvent::State(value));
    }
}
