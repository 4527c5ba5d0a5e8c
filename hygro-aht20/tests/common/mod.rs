#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hygro_aht20::{
    Aht20, DriverConfig, DriverEvent, DriverState, ReadingSink, SharedBus, SimulatedBus,
    SimulatedSensor,
};

pub const ADDRESS: u8 = 0x38;

/// Collects every notification the driver emits.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DriverEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<DriverState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DriverEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn humidities(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DriverEvent::Humidity(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DriverEvent::Temperature(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DriverEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ReadingSink for RecordingSink {
    fn humidity(&self, value: f64) {
        self.push(DriverEvent::Humidity(value));
    }

    fn temperature(&self, value: f64) {
        self.push(DriverEvent::Temperature(value));
    }

    fn state(&self, value: DriverState) {
        self.push(DriverEvent::State(value));
    }
}

pub struct Harness {
    pub bus: SharedBus<SimulatedBus>,
    pub sink: Arc<RecordingSink>,
    pub driver: Aht20<SimulatedBus>,
}

pub fn harness(sensor: SimulatedSensor, config: DriverConfig) -> Harness {
    let bus = SharedBus::new(SimulatedBus::new().with_sensor(config.address, sensor));
    let sink = Arc::new(RecordingSink::default());
    let driver = Aht20::new(bus.clone(), config, sink.clone());

    Harness { bus, sink, driver }
}

pub fn default_harness() -> Harness {
    harness(SimulatedSensor::new(45.0, 21.0), DriverConfig::default())
}

pub fn assert_no_repeated_states(states: &[DriverState]) {
    for pair in states.windows(2) {
        assert_ne!(pair[0], pair[1], "duplicate state event in {states:?}");
    }
}
