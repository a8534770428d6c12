//! Save and restore
//!
//! Saving flattens the script into a [`NodeScriptRecord`]. Restoring rebuilds
//! the node set from the stored record through the registry and tolerates
//! drift: unknown node types, stale indices and resized collections are
//! skipped rather than failing the load.
//!
//! Nodes skipped for an unknown type are not forgotten. Their records, and
//! the connections touching them, are kept aside and written back on the
//! next save, so a script edited while a plugin is unloaded still gets
//! those nodes back once the plugin returns.

use crate::node::{NodeBuilder, NodeKey, ScriptNode};
use crate::pin::{PinAddress, PinDirection, PinSlot};
use crate::record::{encode_slot, ConnectionRecord, NodeRecord, NodeScriptRecord, PinCollectionRecord};
use crate::script::{NodeScript, ScriptEvent};
use crate::value::ValueType;
use lumen_core::PluginId;
use std::collections::HashMap;

impl NodeScript {
    /// Write the current topology to the stored record and return it
    pub fn save(&mut self) -> &NodeScriptRecord {
        let mut record = NodeScriptRecord::new(&self.name, &self.description);

        if self.has_nodes() || !self.detached.nodes.is_empty() {
            let ordinals: HashMap<NodeKey, usize> =
                self.order.iter().enumerate().map(|(ordinal, key)| (*key, ordinal)).collect();

            for (ordinal, node) in self.nodes().enumerate() {
                record.nodes.push(node_record(ordinal, node));
            }
            let offset = self.order.len();
            for (index, detached) in self.detached.nodes.iter().enumerate() {
                record.nodes.push(NodeRecord {
                    ordinal: offset + index,
                    ..detached.clone()
                });
            }

            for (ordinal, node) in self.nodes().enumerate() {
                self.save_connections(ordinal, node, &ordinals, &mut record.connections);
            }
            for kept in &self.detached.connections {
                if let Some(connection) = self.reattach_connection(kept, &ordinals, offset) {
                    record.connections.push(connection);
                }
            }
        }

        log::debug!(
            "Saved script '{}': {} nodes, {} connections",
            self.name,
            record.nodes.len(),
            record.connections.len()
        );
        self.record = record;
        self.dirty = false;
        &self.record
    }

    /// Replace the stored record and restore from it
    pub fn load_record(&mut self, record: NodeScriptRecord) {
        self.record = record;
        self.load();
    }

    /// Rebuild every non-exit node from the stored record.
    ///
    /// May be called repeatedly; connections are only added once.
    pub fn load(&mut self) {
        let stale: Vec<NodeKey> = self.order.iter().copied().filter(|key| *key != self.exit).collect();
        for key in stale {
            self.detach_node(key);
        }

        let record = std::mem::take(&mut self.record);
        let mut restored: HashMap<usize, NodeKey> = HashMap::new();
        let mut skipped: HashMap<usize, usize> = HashMap::new();
        self.detached = Detached::default();

        for node_record in &record.nodes {
            if node_record.is_exit_node {
                if let Some(exit) = self.nodes.get_mut(self.exit.0) {
                    exit.set_position(node_record.x, node_record.y);
                    exit.set_storage(node_record.storage.clone());
                    restore_collections(exit, &node_record.pin_collections);
                }
                restored.insert(node_record.ordinal, self.exit);
                continue;
            }
            match self.restore_node(node_record) {
                Some(key) => {
                    restored.insert(node_record.ordinal, key);
                }
                None => {
                    skipped.insert(node_record.ordinal, self.detached.nodes.len());
                    self.detached.nodes.push(node_record.clone());
                }
            }
        }

        for connection in &record.connections {
            match detach_connection(connection, &restored, &skipped) {
                Some(kept) => self.detached.connections.push(kept),
                None => self.restore_connection(connection, &restored),
            }
        }

        log::info!(
            "Loaded script '{}': {} of {} nodes restored, {} kept for later",
            self.name,
            restored.len(),
            record.nodes.len(),
            self.detached.nodes.len()
        );
        self.record = record;
        if self.initialized {
            self.initialize_pending();
        }
        self.dirty = false;
        self.notify(ScriptEvent::Reloaded);
    }

    fn restore_node(&mut self, node_record: &NodeRecord) -> Option<NodeKey> {
        let plugin = PluginId::new(&node_record.plugin_id);
        let Some(registration) = self.registry.lookup(&plugin, &node_record.type_name) else {
            log::debug!(
                "Skipping node {} of unknown type {}/{}",
                node_record.ordinal,
                node_record.plugin_id,
                node_record.type_name
            );
            return None;
        };

        let mut builder = NodeBuilder::new(NodeKey(self.nodes.next_key()));
        let behavior = registration.factory.create(&self.context, Some(node_record), &mut builder);
        let mut node = builder.finish(registration.info.key.clone(), behavior);
        node.set_position(node_record.x, node_record.y);
        node.set_storage(node_record.storage.clone());
        restore_collections(&mut node, &node_record.pin_collections);
        Some(self.attach_node(node))
    }

    fn restore_connection(&mut self, connection: &ConnectionRecord, restored: &HashMap<usize, NodeKey>) {
        let nodes = connection
            .source_ordinal()
            .and_then(|ordinal| restored.get(&ordinal))
            .zip(connection.target_ordinal().and_then(|ordinal| restored.get(&ordinal)));
        let Some((&source_node, &target_node)) = nodes else {
            log::debug!(
                "Skipping connection {} -> {}: node not restored",
                connection.source_node,
                connection.target_node
            );
            return;
        };
        let Some((source_slot, target_slot)) = connection.source_slot().zip(connection.target_slot()) else {
            log::debug!("Skipping connection with a negative pin index");
            return;
        };

        let source = PinAddress::new(source_node, source_slot);
        let target = PinAddress::new(target_node, target_slot);
        let directions = self
            .pin(source)
            .map(|pin| pin.direction())
            .zip(self.pin(target).map(|pin| pin.direction()));
        match directions {
            None => log::debug!("Skipping connection {:?} -> {:?}: pin missing", source, target),
            Some((a, b)) if a == b => {
                log::debug!("Skipping connection {:?} -> {:?}: both pins are {:?}", source, target, a)
            }
            Some(_) => {
                self.link(source, target);
            }
        }
    }

    /// A kept connection with its endpoints renumbered for this save.
    ///
    /// Dropped when its live endpoint is gone, or is an input that has
    /// since been given another source.
    fn reattach_connection(
        &self,
        kept: &DetachedConnection,
        ordinals: &HashMap<NodeKey, usize>,
        offset: usize,
    ) -> Option<ConnectionRecord> {
        let ordinal = |endpoint: Endpoint, slot: Option<PinSlot>| -> Option<usize> {
            match endpoint {
                Endpoint::Detached(index) => Some(offset + index),
                Endpoint::Live(node) => {
                    let pin = self.pin(PinAddress::new(node, slot?))?;
                    if pin.direction() == PinDirection::Input && pin.is_connected() {
                        return None;
                    }
                    ordinals.get(&node).copied()
                }
            }
        };
        let source_node = ordinal(kept.source, kept.record.source_slot())?;
        let target_node = ordinal(kept.target, kept.record.target_slot())?;
        Some(ConnectionRecord {
            source_node: source_node as i64,
            target_node: target_node as i64,
            ..kept.record.clone()
        })
    }

    fn save_connections(
        &self,
        ordinal: usize,
        node: &ScriptNode,
        ordinals: &HashMap<NodeKey, usize>,
        connections: &mut Vec<ConnectionRecord>,
    ) {
        let inputs = node
            .all_pins()
            .filter(|(_, pin)| pin.direction() == PinDirection::Input);
        for (slot, pin) in inputs {
            for source in pin.connected_to() {
                let (Some(&source_ordinal), Some(source_pin)) = (ordinals.get(&source.node), self.pin(*source)) else {
                    continue;
                };
                let (source_collection, source_index) = encode_slot(source.slot);
                let (target_collection, target_index) = encode_slot(slot);
                connections.push(ConnectionRecord {
                    source_type: source_pin.value_type().name(),
                    source_node: source_ordinal as i64,
                    source_pin_collection: source_collection,
                    source_pin_index: source_index,
                    target_type: pin.value_type().name(),
                    target_node: ordinal as i64,
                    target_pin_collection: target_collection,
                    target_pin_index: target_index,
                });
            }
        }
    }
}

/// Records the last load could not restore
#[derive(Debug, Default)]
pub(crate) struct Detached {
    nodes: Vec<NodeRecord>,
    connections: Vec<DetachedConnection>,
}

#[derive(Debug)]
struct DetachedConnection {
    record: ConnectionRecord,
    source: Endpoint,
    target: Endpoint,
}

#[derive(Clone, Copy, Debug)]
enum Endpoint {
    Live(NodeKey),
    /// Index into the detached node records
    Detached(usize),
}

/// Keep a connection that touches an unrestored node and otherwise resolves
fn detach_connection(
    connection: &ConnectionRecord,
    restored: &HashMap<usize, NodeKey>,
    skipped: &HashMap<usize, usize>,
) -> Option<DetachedConnection> {
    let endpoint = |ordinal: Option<usize>| -> Option<Endpoint> {
        let ordinal = ordinal?;
        match (skipped.get(&ordinal), restored.get(&ordinal)) {
            (Some(&index), _) => Some(Endpoint::Detached(index)),
            (None, Some(&key)) => Some(Endpoint::Live(key)),
            (None, None) => None,
        }
    };
    let source = endpoint(connection.source_ordinal())?;
    let target = endpoint(connection.target_ordinal())?;
    if matches!((source, target), (Endpoint::Live(_), Endpoint::Live(_))) {
        return None;
    }
    Some(DetachedConnection {
        record: connection.clone(),
        source,
        target,
    })
}

fn node_record(ordinal: usize, node: &ScriptNode) -> NodeRecord {
    let (x, y) = node.position();
    NodeRecord {
        ordinal,
        plugin_id: node.type_key().plugin.name().to_string(),
        type_name: node.type_key().type_name.clone(),
        x,
        y,
        storage: node.storage().cloned(),
        name: node.name().to_string(),
        description: node.description().to_string(),
        is_exit_node: node.is_exit_node(),
        pin_collections: node
            .pin_collections()
            .iter()
            .map(|collection| PinCollectionRecord {
                name: collection.name().to_string(),
                element_type_name: collection.value_type().name(),
                direction: collection.direction(),
                count: collection.len(),
            })
            .collect(),
    }
}

/// Grow collections matched by name, element type and direction to their saved size
fn restore_collections(node: &mut ScriptNode, records: &[PinCollectionRecord]) {
    for record in records {
        let Ok(value_type) = record.element_type_name.parse::<ValueType>() else {
            log::debug!("Skipping pin collection '{}' of unknown type {}", record.name, record.element_type_name);
            continue;
        };
        let Some(index) = node.find_collection(&record.name, &value_type, record.direction) else {
            log::debug!("Node '{}' has no pin collection '{}'", node.name(), record.name);
            continue;
        };
        if let Some(collection) = node.pin_collection_mut(index) {
            while collection.len() < record.count {
                collection.add_pin();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalContext;
    use crate::node::Node;
    use crate::pin::{InputPinCollection, PinSlot};
    use crate::registry::{NodeTypeInfo, NodeTypeKey, NodeTypeRegistry};
    use crate::storage::Storage;

    struct Mixer {
        _inputs: InputPinCollection,
    }

    impl Node for Mixer {
        fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) {}
    }

    fn registry() -> NodeTypeRegistry {
        let registry = NodeTypeRegistry::new();
        registry.register_fn(NodeTypeInfo::new(NodeTypeKey::core("Mixer"), "Mixer"), |_, _, b| {
            Box::new(Mixer {
                _inputs: b.input_collection("Inputs", ValueType::Float, 1),
            })
        });
        registry
    }

    #[test]
    fn test_exit_only_script_saves_no_nodes() {
        let registry = registry();
        let mut script = NodeScript::new("Empty", "Nothing here", ValueType::Float, &registry);
        let record = script.save();
        assert!(record.nodes.is_empty());
        assert!(record.connections.is_empty());
        assert_eq!(record.description, "Nothing here");
    }

    #[test]
    fn test_exit_node_placement_round_trips() {
        let registry = registry();
        let mut script = NodeScript::new("Placed", "", ValueType::Float, &registry);
        script.create_node(&PluginId::core(), "Mixer").unwrap();
        script.set_node_position(script.exit_node(), 120.0, -40.0).unwrap();
        script.set_node_storage(script.exit_node(), Some(Storage::from("note"))).unwrap();
        let record = script.save().clone();

        let restored = NodeScript::from_record(record, ValueType::Float, &registry);
        let exit = restored.node(restored.exit_node()).unwrap();
        assert_eq!(exit.position(), (120.0, -40.0));
        assert_eq!(exit.storage(), Some(&Storage::from("note")));
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_collection_without_match_is_left_alone() {
        let registry = registry();
        let mut script = NodeScript::new("Drift", "", ValueType::Float, &registry);
        let key = script.create_node(&PluginId::core(), "Mixer").unwrap();
        script.add_collection_pin(key, 0).unwrap();
        let mut record = script.save().clone();
        record.nodes[1].pin_collections[0].element_type_name = "Color".into();
        record.nodes[1].pin_collections.push(PinCollectionRecord {
            name: "Gone".into(),
            element_type_name: "Float".into(),
            direction: PinDirection::Output,
            count: 9,
        });

        let restored = NodeScript::from_record(record, ValueType::Float, &registry);
        let mixer = restored.nodes().nth(1).unwrap();
        assert_eq!(mixer.pin_collections().len(), 1);
        assert_eq!(mixer.pin_collections()[0].len(), 1);
    }

    #[test]
    fn test_stale_connection_records_are_skipped() {
        let registry = registry();
        let mut script = NodeScript::new("Stale", "", ValueType::Float, &registry);
        script.create_node(&PluginId::core(), "Mixer").unwrap();
        let mut record = script.save().clone();
        record.connections = vec![
            ConnectionRecord {
                source_type: "Float".into(),
                source_node: 9,
                source_pin_collection: -1,
                source_pin_index: 0,
                target_type: "Float".into(),
                target_node: 0,
                target_pin_collection: -1,
                target_pin_index: 0,
            },
            ConnectionRecord {
                source_type: "Float".into(),
                source_node: 1,
                source_pin_collection: 0,
                source_pin_index: 0,
                target_type: "Float".into(),
                target_node: 0,
                target_pin_collection: -1,
                target_pin_index: 0,
            },
        ];

        let restored = NodeScript::from_record(record, ValueType::Float, &registry);
        let exit_input = PinAddress::new(restored.exit_node(), PinSlot::Single(0));
        assert!(!restored.pin(exit_input).unwrap().is_connected());
        assert_eq!(restored.len(), 2);
    }
}
