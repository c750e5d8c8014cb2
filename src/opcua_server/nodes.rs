use std::sync::Arc;

use anyhow::anyhow;
use opcua::server::prelude::*;
use opcua::sync::Mutex;

use super::data_source::{LedStateGetter, SensorValueGetter};
use super::methods::DropMessage;
use crate::cache::{Measurand, SampleCache};
use crate::config::Config;
use crate::diagnosis::DiagnosisLed;

/// Node ids of everything published, resolved against the registered namespace.
#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub namespace: u16,
    pub sensor_folder: NodeId,
    pub temperature: NodeId,
    pub humidity: NodeId,
    pub peer_manager: NodeId,
    pub registered_components: NodeId,
    pub drop_message: NodeId,
    pub led_state: NodeId,
}

impl NodeLayout {
    pub fn sensor_node(&self, measurand: Measurand) -> &NodeId {
        match measurand {
            Measurand::Temperature => &self.temperature,
            Measurand::Humidity => &self.humidity,
        }
    }
}

pub fn populate(
    address_space: &mut AddressSpace,
    config: &Config,
    cache: Arc<SampleCache>,
    led: Arc<DiagnosisLed>,
) -> anyhow::Result<NodeLayout> {
    let namespace = address_space
        .register_namespace(&config.server.namespace_uri)
        .map_err(|_| anyhow!("Cannot register namespace {}", config.server.namespace_uri))?;
    let ids = &config.nodes;

    // Sensor folder with the two cache-backed variables
    let sensor_name = config.sensor.kind.name();
    let sensor_folder = address_space
        .add_folder(sensor_name, sensor_name, &NodeId::objects_folder_id())
        .map_err(|_| anyhow!("Cannot add folder {}", sensor_name))?;

    let temperature = NodeId::new(namespace, ids.temperature);
    let humidity = NodeId::new(namespace, ids.humidity);
    for (node_id, name, measurand) in [
        (&temperature, "Temperature", Measurand::Temperature),
        (&humidity, "Humidity", Measurand::Humidity),
    ] {
        let getter = SensorValueGetter::new(cache.clone(), measurand);
        VariableBuilder::new(node_id, name, name)
            .data_type(DataTypeId::Float)
            .value(0.0_f32)
            .organized_by(&sensor_folder)
            .value_getter(Arc::new(Mutex::new(getter)))
            .insert(address_space);
    }

    // Peer manager object, the LED's mailbox
    let peer_manager = NodeId::new(namespace, ids.peer_manager);
    ObjectBuilder::new(&peer_manager, "LMSR", "LMSR")
        .organized_by(ObjectId::ObjectsFolder)
        .has_type_definition(ObjectTypeId::BaseObjectType)
        .insert(address_space);
    address_space
        .add_folder("Inbox", "Inbox", &peer_manager)
        .map_err(|_| anyhow!("Cannot add Inbox folder"))?;

    let registered_components = NodeId::new(namespace, ids.registered_components);
    VariableBuilder::new(&registered_components, "registeredComponents", "registeredComponents")
        .data_type(DataTypeId::String)
        .value_rank(1)
        .value(&vec![led.receiver().to_string()])
        .organized_by(&peer_manager)
        .insert(address_space);

    let led_state = NodeId::new(namespace, ids.led_state);
    VariableBuilder::new(&led_state, "LedOn", "LedOn")
        .data_type(DataTypeId::Boolean)
        .value(false)
        .organized_by(&peer_manager)
        .value_getter(Arc::new(Mutex::new(LedStateGetter::new(led.clone()))))
        .insert(address_space);

    let drop_message = NodeId::new(namespace, ids.drop_message);
    MethodBuilder::new(&drop_message, "dropMessage", "dropMessage")
        .component_of(peer_manager.clone())
        .input_args(
            address_space,
            &[
                ("Receiver", DataTypeId::String).into(),
                ("Message", DataTypeId::String).into(),
            ],
        )
        .callback(Box::new(DropMessage::new(led)))
        .insert(address_space);

    tracing::info!(namespace, "Address space populated");

    Ok(NodeLayout {
        namespace,
        sensor_folder,
        temperature,
        humidity,
        peer_manager,
        registered_components,
        drop_message,
        led_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Sample;
    use crate::diagnosis::LoggingLed;
    use crate::sensor::RawReading;

    fn populated() -> (AddressSpace, NodeLayout, Arc<SampleCache>) {
        let mut address_space = AddressSpace::new();
        let cache = Arc::new(SampleCache::default());
        let led = Arc::new(DiagnosisLed::new(Box::new(LoggingLed), "LED"));
        let layout = populate(&mut address_space, &Config::default(), cache.clone(), led).unwrap();
        (address_space, layout, cache)
    }

    #[test]
    fn publishes_configured_node_ids() {
        let (address_space, layout, _) = populated();
        assert_eq!(layout.temperature, NodeId::new(layout.namespace, 6001_u32));
        assert_eq!(layout.humidity, NodeId::new(layout.namespace, 6247_u32));
        assert_eq!(layout.drop_message, NodeId::new(layout.namespace, 5002_u32));

        for node in [
            &layout.temperature,
            &layout.humidity,
            &layout.peer_manager,
            &layout.registered_components,
            &layout.drop_message,
            &layout.led_state,
        ] {
            assert!(address_space.find_node(node).is_some(), "missing {node}");
        }

        let components = address_space
            .find_variable(layout.registered_components.clone())
            .unwrap()
            .value(
                TimestampsToReturn::Neither,
                NumericRange::None,
                &QualifiedName::null(),
                0.0,
            );
        assert_eq!(
            components.value,
            Some(Variant::from(&vec!["LED".to_string()]))
        );
    }

    #[test]
    fn sensor_variables_read_through_cache() {
        let (address_space, layout, cache) = populated();
        cache.offer(Sample::new(RawReading::success(45.2, 21.7), chrono::Utc::now()));

        let node = address_space
            .find_variable(layout.sensor_node(Measurand::Humidity).clone())
            .unwrap();
        let value = node.value(
            TimestampsToReturn::Both,
            NumericRange::None,
            &QualifiedName::null(),
            0.0,
        );
        assert_eq!(value.value, Some(Variant::Float(45.2)));
        assert_eq!(value.status, Some(StatusCode::Good));
    }
}
