use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hygro_aht20::{Aht20, SharedBus, SimulatedBus, SimulatedSensor};
use hygro_agent::{BusConfig, Config, DeviceRegistry, api, run_sensor};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "hygro-agent")]
#[command(about = "Hygro sensor agent")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "hygro-agent.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "hygro_agent=info,hygro_aht20=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };
    config.validate()?;

    if config.sensors.is_empty() {
        return Err(color_eyre::eyre::eyre!("no sensors configured"));
    }

    info!(
        device_id = %config.agent.device_id,
        http_addr = %config.server.http_addr,
        sensors = config.sensors.len(),
        "Starting hygro-agent"
    );

    let bus = match config.bus {
        BusConfig::Simulated {
            humidity,
            temperature_celsius,
            jitter,
        } => {
            info!(humidity, temperature_celsius, jitter, "Using simulated bus");
            let mut bus = SimulatedBus::new();
            for sensor in &config.sensors {
                bus.attach(
                    sensor.address,
                    SimulatedSensor::new(humidity, temperature_celsius)
                        .uncalibrated()
                        .with_jitter(jitter),
                );
            }
            SharedBus::new(bus)
        }
    };

    run_agent(config, bus).await
}

async fn run_agent(config: Config, bus: SharedBus<SimulatedBus>) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();
    let registry = DeviceRegistry::new(&config.agent.device_id, &config.agent.friendly_name);
    let sample_interval = Duration::from_secs(config.agent.sample_interval_secs);

    let mut handles = Vec::with_capacity(config.sensors.len());
    for sensor in &config.sensors {
        let driver_config = sensor.driver_config();
        let sink = registry.register_aht20(&sensor.name, driver_config.temperature_unit)?;
        let driver = Arc::new(Aht20::new(bus.clone(), driver_config, Arc::new(sink)));

        let name = sensor.name.clone();
        let cancel_for_sensor = cancel.clone();
        handles.push(tokio::spawn(async move {
            run_sensor(name, driver, sample_interval, cancel_for_sensor).await;
        }));
    }

    // HTTP server
    let http_addr = config.server.http_addr;
    let axum_app = api::router(registry);
    let axum_listener = TcpListener::bind(http_addr).await?;
    info!(%http_addr, "HTTP server listening");

    let cancel_for_http = cancel.clone();

    tokio::select! {
        result = axum::serve(axum_listener, axum_app).with_graceful_shutdown(async move {
            cancel_for_http.cancelled().await;
        }) => {
            if let Err(e) = result {
                error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
            cancel.cancel();
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = ?e, "Sensor supervisor task failed");
        }
    }

    info!("hygro-agent shut down complete");
    Ok(())
}
