use std::sync::{Arc, Mutex, PoisonError};

use hygro_aht20::ReadingSink;
use hygro_core::{
    DriverState, NodeDescriptor, PropertyDataType, PropertyDescriptor, TemperatureUnit,
};
use serde::Serialize;
use tracing::{debug, warn};

pub const HUMIDITY_PROPERTY: &str = "humidity";
pub const TEMPERATURE_PROPERTY: &str = "temperature";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry lock poisoned")]
    Poisoned,
    #[error("node already registered: {0}")]
    DuplicateNode(String),
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("unknown property {property} on node {node}")]
    UnknownProperty { node: String, property: String },
}

impl<T> From<PoisonError<T>> for RegistryError {
    fn from(_: PoisonError<T>) -> Self {
        RegistryError::Poisoned
    }
}

/// Last value published on a property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PublishedValue {
    pub value: f64,
    pub timestamp: jiff::Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySnapshot {
    #[serde(flatten)]
    pub descriptor: PropertyDescriptor,
    pub value: Option<PublishedValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    #[serde(flatten)]
    pub descriptor: NodeDescriptor,
    pub state: DriverState,
    pub properties: Vec<PropertySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub id: String,
    pub friendly_name: String,
    pub nodes: Vec<NodeSnapshot>,
}

/// In-memory device registry that sensors publish their values into.
///
/// Nodes keep registration order. Cloning yields another handle to the same
/// registry.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    inner: Arc<Mutex<DeviceSnapshot>>,
}

impl DeviceRegistry {
    pub fn new(id: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeviceSnapshot {
                id: id.into(),
                friendly_name: friendly_name.into(),
                nodes: Vec::new(),
            })),
        }
    }

    pub fn add_node(
        &self,
        descriptor: NodeDescriptor,
        properties: Vec<PropertyDescriptor>,
    ) -> Result<(), RegistryError> {
        let mut device = self.inner.lock()?;

        if device.nodes.iter().any(|n| n.descriptor.name == descriptor.name) {
            return Err(RegistryError::DuplicateNode(descriptor.name));
        }

        device.nodes.push(NodeSnapshot {
            descriptor,
            state: DriverState::Unknown,
            properties: properties
                .into_iter()
                .map(|descriptor| PropertySnapshot {
                    descriptor,
                    value: None,
                })
                .collect(),
        });

        Ok(())
    }

    pub fn publish(&self, node: &str, property: &str, value: f64) -> Result<(), RegistryError> {
        let mut device = self.inner.lock()?;
        let slot = find_property(&mut device, node, property)?;

        slot.value = Some(PublishedValue {
            value,
            timestamp: jiff::Timestamp::now(),
        });
        debug!(node, property, value, "Published value");

        Ok(())
    }

    pub fn set_state(&self, node: &str, state: DriverState) -> Result<(), RegistryError> {
        let mut device = self.inner.lock()?;
        let entry = device
            .nodes
            .iter_mut()
            .find(|n| n.descriptor.name == node)
            .ok_or_else(|| RegistryError::UnknownNode(node.to_string()))?;

        entry.state = state;
        Ok(())
    }

    pub fn value(&self, node: &str, property: &str) -> Result<Option<PublishedValue>, RegistryError> {
        let mut device = self.inner.lock()?;
        Ok(find_property(&mut device, node, property)?.value)
    }

    pub fn snapshot(&self) -> Result<DeviceSnapshot, RegistryError> {
        Ok(self.inner.lock()?.clone())
    }

    /// Register an AHT20 node with its temperature and humidity properties
    /// and return the sink that feeds them.
    pub fn register_aht20(
        &self,
        name: &str,
        unit: TemperatureUnit,
    ) -> Result<RegistrySink, RegistryError> {
        let node = NodeDescriptor {
            name: name.to_string(),
            friendly_name: "AHT20".to_string(),
            node_type: "sensor".to_string(),
            is_range: false,
        };

        let properties = vec![
            PropertyDescriptor {
                name: TEMPERATURE_PROPERTY.to_string(),
                friendly_name: "Temperature".to_string(),
                data_type: PropertyDataType::Float,
                settable: false,
                format: Some(unit.format().to_string()),
                unit: Some(unit.symbol().to_string()),
                retained: true,
            },
            PropertyDescriptor {
                name: HUMIDITY_PROPERTY.to_string(),
                friendly_name: "Humidity".to_string(),
                data_type: PropertyDataType::Float,
                settable: false,
                format: Some("0:100".to_string()),
                unit: Some("%".to_string()),
                retained: true,
            },
        ];

        self.add_node(node, properties)?;

        Ok(RegistrySink {
            registry: self.clone(),
            node: name.to_string(),
        })
    }
}

fn find_property<'a>(
    device: &'a mut DeviceSnapshot,
    node: &str,
    property: &str,
) -> Result<&'a mut PropertySnapshot, RegistryError> {
    device
        .nodes
        .iter_mut()
        .find(|n| n.descriptor.name == node)
        .ok_or_else(|| RegistryError::UnknownNode(node.to_string()))?
        .properties
        .iter_mut()
        .find(|p| p.descriptor.name == property)
        .ok_or_else(|| RegistryError::UnknownProperty {
            node: node.to_string(),
            property: property.to_string(),
        })
}

/// Publishes one sensor's notifications into its registry node.
#[derive(Debug, Clone)]
pub struct RegistrySink {
    registry: DeviceRegistry,
    node: String,
}

impl RegistrySink {
    pub fn node(&self) -> &str {
        &self.node
    }

    fn publish(&self, property: &str, value: f64) {
        if let Err(e) = self.registry.publish(&self.node, property, value) {
            warn!(node = %self.node, property, error = %e, "Failed to publish value");
        }
    }
}

impl ReadingSink for RegistrySink {
    fn humidity(&self, value: f64) {
        self.publish(HUMIDITY_PROPERTY, value);
    }

    fn temperature(&self, value: f64) {
        self.publish(TEMPERATURE_PROPERTY, value);
    }

    fn state(&self, value: DriverState) {
        if let Err(e) = self.registry.set_state(&self.node, value) {
            warn!(node = %self.node, error = %e, "Failed to record state");
        }
    }
}
