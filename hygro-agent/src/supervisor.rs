use std::sync::Arc;
use std::time::Duration;

use hygro_aht20::{Aht20, BusTransport, MeasureOutcome};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Keep one sensor initialized and sampled until `cancel` fires.
///
/// Initialization is retried with exponential backoff; a hard failure while
/// sampling sends the sensor back through initialization.
pub async fn run_sensor<T: BusTransport>(
    name: String,
    driver: Arc<Aht20<T>>,
    sample_interval: Duration,
    cancel: CancellationToken,
) {
    info!(
        sensor = %name,
        address = driver.address(),
        sample_interval_secs = sample_interval.as_secs(),
        "Sensor supervisor started"
    );

    'supervise: loop {
        if !initialize(&name, &driver, &cancel).await {
            break;
        }

        let mut interval = tokio::time::interval(sample_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // initialization already measured once
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'supervise,
                _ = interval.tick() => {
                    match driver.sample().await {
                        Ok(report) => {
                            log_outcome(&name, &report.outcome);
                            if let Some(outcome) = report.after_reset {
                                info!(sensor = %name, "Sensor reset completed");
                                log_outcome(&name, &outcome);
                            }
                        }
                        Err(e) => {
                            error!(sensor = %name, error = %e, "Measurement failed, reinitializing");
                            continue 'supervise;
                        }
                    }
                }
            }
        }
    }

    info!(sensor = %name, "Sensor supervisor shutting down");
}

/// Returns `false` when cancelled before the sensor came up.
async fn initialize<T: BusTransport>(
    name: &str,
    driver: &Aht20<T>,
    cancel: &CancellationToken,
) -> bool {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return false,
            result = driver.initialize() => result,
        };

        match result {
            Ok(outcome) => {
                info!(sensor = %name, state = %driver.state(), "Sensor initialized");
                log_outcome(name, &outcome);
                return true;
            }
            Err(e) => {
                warn!(
                    sensor = %name,
                    error = %e,
                    backoff_secs = backoff.as_secs(),
                    "Failed to initialize sensor, will retry"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return false,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

fn log_outcome(name: &str, outcome: &MeasureOutcome) {
    match outcome {
        MeasureOutcome::Accepted(reading) => debug!(
            sensor = %name,
            humidity = reading.humidity_percent,
            temperature_celsius = reading.temperature_celsius,
            "Reading accepted"
        ),
        MeasureOutcome::ShortFrame { bytes_read } => {
            debug!(sensor = %name, bytes_read, "Measurement skipped")
        }
        MeasureOutcome::ChecksumMismatch { .. } => {
            debug!(sensor = %name, "Measurement discarded")
        }
        MeasureOutcome::Degenerate(verdict) if verdict.reset_recommended => warn!(
            sensor = %name,
            consecutive = verdict.consecutive,
            "Sensor keeps returning all-zero readings, reset recommended"
        ),
        MeasureOutcome::Degenerate(verdict) => debug!(
            sensor = %name,
            consecutive = verdict.consecutive,
            "All-zero reading"
        ),
    }
}
