use std::sync::Arc;
use std::time::Duration;

use hygro_aht20::{
    Aht20, DriverConfig, DriverState, Fault, SharedBus, SimulatedBus, SimulatedSensor,
};
use hygro_agent::registry::{HUMIDITY_PROPERTY, TEMPERATURE_PROPERTY};
use hygro_agent::{DeviceRegistry, run_sensor};
use hygro_core::{AHT20_ADDRESS, TemperatureUnit};
use tokio_util::sync::CancellationToken;

const MEASURE: u8 = 0xAC;
const RESET: u8 = 0xBA;

fn spawn_supervisor(
    bus: SharedBus<SimulatedBus>,
    config: DriverConfig,
    registry: &DeviceRegistry,
    interval: Duration,
) -> (
    Arc<Aht20<SimulatedBus>>,
    CancellationToken,
    tokio::task::JoinHandle<()>,
) {
    let sink = registry
        .register_aht20("bench", config.temperature_unit)
        .unwrap();
    let driver = Arc::new(Aht20::new(bus, config, Arc::new(sink)));
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(run_sensor(
        "bench".to_string(),
        driver.clone(),
        interval,
        cancel.clone(),
    ));

    (driver, cancel, handle)
}

#[tokio::test(start_paused = true)]
async fn samples_on_interval_and_publishes_to_registry() {
    let bus = SharedBus::new(
        SimulatedBus::new().with_sensor(AHT20_ADDRESS, SimulatedSensor::new(50.0, 20.0).uncalibrated()),
    );
    let registry = DeviceRegistry::new("greenhouse", "Greenhouse");
    let config = DriverConfig {
        temperature_unit: TemperatureUnit::Celsius,
        ..DriverConfig::default()
    };
    let (driver, cancel, handle) =
        spawn_supervisor(bus.clone(), config, &registry, Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(35)).await;
    cancel.cancel();
    handle.await.unwrap();

    // one measurement during initialization, then one per elapsed interval
    let measures = bus
        .lock()
        .await
        .opcodes(AHT20_ADDRESS)
        .into_iter()
        .filter(|op| *op == MEASURE)
        .count();
    assert_eq!(measures, 4);

    let humidity = registry.value("bench", HUMIDITY_PROPERTY).unwrap().unwrap();
    assert!((humidity.value - 50.0).abs() < 1e-3);
    let temperature = registry
        .value("bench", TEMPERATURE_PROPERTY)
        .unwrap()
        .unwrap();
    assert!((temperature.value - 20.0).abs() < 1e-3);

    assert_eq!(driver.state(), DriverState::Idle);
    assert_eq!(registry.snapshot().unwrap().nodes[0].state, DriverState::Idle);
}

#[tokio::test(start_paused = true)]
async fn retries_initialization_until_device_appears() {
    let bus = SharedBus::new(SimulatedBus::new());
    let registry = DeviceRegistry::new("greenhouse", "Greenhouse");
    let (driver, cancel, handle) = spawn_supervisor(
        bus.clone(),
        DriverConfig::default(),
        &registry,
        Duration::from_secs(30),
    );

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(registry.value("bench", HUMIDITY_PROPERTY).unwrap().is_none());

    bus.lock()
        .await
        .attach(AHT20_ADDRESS, SimulatedSensor::new(45.0, 21.0));

    // backoff is 1s, 2s, 4s, so the next attempt lands before 8s
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(registry.value("bench", HUMIDITY_PROPERTY).unwrap().is_some());
    assert_eq!(driver.state(), DriverState::Idle);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn persistent_zero_frames_reset_the_sensor() {
    let mut sim = SimulatedSensor::new(45.0, 21.0);
    for _ in 0..5 {
        sim.inject(Fault::ZeroFrame);
    }
    let bus = SharedBus::new(SimulatedBus::new().with_sensor(AHT20_ADDRESS, sim));
    let registry = DeviceRegistry::new("greenhouse", "Greenhouse");
    let (driver, cancel, handle) = spawn_supervisor(
        bus.clone(),
        DriverConfig::default(),
        &registry,
        Duration::from_secs(30),
    );

    // the first zero lands at start-up, the fifth after four intervals,
    // which is past the 90s holdoff
    tokio::time::sleep(Duration::from_secs(125)).await;
    cancel.cancel();
    handle.await.unwrap();

    let opcodes = bus.lock().await.opcodes(AHT20_ADDRESS);
    assert_eq!(opcodes.iter().filter(|op| **op == RESET).count(), 1);
    assert_eq!(driver.metrics().await.consecutive_zero_readings, 0);
    assert!(registry.value("bench", HUMIDITY_PROPERTY).unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_a_pending_initialization() {
    let bus = SharedBus::new(SimulatedBus::new());
    let registry = DeviceRegistry::new("greenhouse", "Greenhouse");
    let (_driver, cancel, handle) = spawn_supervisor(
        bus,
        DriverConfig::default(),
        &registry,
        Duration::from_secs(30),
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("supervisor exits promptly")
        .unwrap();
}
