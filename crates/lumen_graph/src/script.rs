//! Node script - One graph instance
//!
//! A script owns its nodes in a slot map and remembers the order they were
//! added in, which is the order they are saved in. The exit node is created
//! with the script, is always first and is never removed.

use crate::error::{GraphError, Result};
use crate::eval::{evaluate_node, InitContext, ScriptContext};
use crate::exit::{ExitNode, EXIT_NODE_TYPE};
use crate::node::{Node, NodeBuilder, NodeKey, ScriptNode};
use crate::persist::Detached;
use crate::pin::{Pin, PinAddress, PinDirection, PinSlot};
use crate::record::NodeScriptRecord;
use crate::registry::{NodeTypeKey, NodeTypeRegistry, NodeTypeSubscription};
use crate::storage::Storage;
use crate::value::{Value, ValueType};
use lumen_core::{Observers, PluginId, SlotMap, SubscriberId};

/// Topology change delivered to script observers
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptEvent {
    NodeAdded(NodeKey),
    NodeRemoved(NodeKey),
    PinConnected { input: PinAddress, output: PinAddress },
    PinDisconnected { input: PinAddress, output: PinAddress },
    /// The node set was rebuilt from the stored record
    Reloaded,
}

/// A node graph with a single typed result
pub struct NodeScript {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) result_type: ValueType,
    pub(crate) context: ScriptContext,
    pub(crate) nodes: SlotMap<ScriptNode>,
    pub(crate) order: Vec<NodeKey>,
    pub(crate) exit: NodeKey,
    pub(crate) registry: NodeTypeRegistry,
    pub(crate) subscription: NodeTypeSubscription,
    /// Last saved or loaded record
    pub(crate) record: NodeScriptRecord,
    /// Node and connection records the last load skipped
    pub(crate) detached: Detached,
    pub(crate) observers: Observers<ScriptEvent>,
    pub(crate) initialized: bool,
    /// Topology changed since the record was last written or read
    pub(crate) dirty: bool,
}

impl NodeScript {
    /// Create a script holding only its exit node
    pub fn new(name: &str, description: &str, result_type: ValueType, registry: &NodeTypeRegistry) -> Self {
        let mut nodes = SlotMap::new();
        let key = NodeKey(nodes.next_key());
        let mut builder = NodeBuilder::new(key);
        let behavior = ExitNode::new(&mut builder, &result_type);
        let mut exit_node = builder.finish(NodeTypeKey::core(EXIT_NODE_TYPE), Box::new(behavior));
        exit_node.set_exit_node();
        let exit = NodeKey(nodes.insert(exit_node));

        Self {
            name: name.to_string(),
            description: description.to_string(),
            result_type,
            context: ScriptContext::empty(),
            nodes,
            order: vec![exit],
            exit,
            registry: registry.clone(),
            subscription: registry.subscribe(),
            record: NodeScriptRecord::new(name, description),
            detached: Detached::default(),
            observers: Observers::new(),
            initialized: false,
            dirty: false,
        }
    }

    /// Create a script and restore it from `record`
    pub fn from_record(record: NodeScriptRecord, result_type: ValueType, registry: &NodeTypeRegistry) -> Self {
        let mut script = Self::new(&record.name, &record.description, result_type, registry);
        script.load_record(record);
        script
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Type of the exit node's input
    pub fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    pub fn context(&self) -> &ScriptContext {
        &self.context
    }

    /// Set the payload handed to node factories and nodes
    pub fn set_context(&mut self, context: ScriptContext) {
        self.context = context;
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    /// The last saved or loaded record
    pub fn record(&self) -> &NodeScriptRecord {
        &self.record
    }

    /// True once anything besides the exit node exists
    pub fn has_nodes(&self) -> bool {
        self.order.len() > 1
    }

    /// Number of nodes, exit node included
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn exit_node(&self) -> NodeKey {
        self.exit
    }

    /// Nodes in enumeration order
    pub fn nodes(&self) -> impl Iterator<Item = &ScriptNode> {
        self.order.iter().filter_map(|key| self.nodes.get(key.0))
    }

    /// Node keys in enumeration order
    pub fn node_keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn node(&self, key: NodeKey) -> Option<&ScriptNode> {
        self.nodes.get(key.0)
    }

    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key.0)
    }

    /// Position of a node in enumeration order
    pub fn ordinal_of(&self, key: NodeKey) -> Option<usize> {
        self.order.iter().position(|k| *k == key)
    }

    pub fn pin(&self, address: PinAddress) -> Option<&Pin> {
        self.nodes.get(address.node.0)?.pin(address.slot)
    }

    /// The value the exit node captured in the last run
    pub fn result(&self) -> Value {
        self.nodes
            .get(self.exit.0)
            .and_then(|node| node.behavior())
            .and_then(|behavior| behavior.result())
            .cloned()
            .unwrap_or_else(|| self.result_type.default_value())
    }

    /// Add a node whose behavior is built by `build`
    pub fn add_node<F>(&mut self, type_key: NodeTypeKey, build: F) -> NodeKey
    where
        F: FnOnce(&mut NodeBuilder) -> Box<dyn Node>,
    {
        let mut builder = NodeBuilder::new(NodeKey(self.nodes.next_key()));
        let behavior = build(&mut builder);
        let node = builder.finish(type_key, behavior);
        let key = self.attach_node(node);
        if self.initialized {
            self.initialize_node(key);
        }
        key
    }

    /// Add a node of a registered type
    pub fn create_node(&mut self, plugin: &PluginId, type_name: &str) -> Result<NodeKey> {
        let registration = self
            .registry
            .lookup(plugin, type_name)
            .ok_or_else(|| GraphError::UnknownNodeType {
                plugin: plugin.name().to_string(),
                type_name: type_name.to_string(),
            })?;
        let context = self.context.clone();
        Ok(self.add_node(registration.info.key.clone(), |builder| {
            registration.factory.create(&context, None, builder)
        }))
    }

    /// Disconnect and remove a node, then dispose it
    pub fn remove_node(&mut self, key: NodeKey) -> Result<()> {
        if key == self.exit {
            log::warn!("Refusing to remove the exit node of script '{}'", self.name);
            return Err(GraphError::ExitNodeRemoval);
        }
        if !self.nodes.contains_key(key.0) {
            log::warn!("Node {:?} is not part of script '{}'", key, self.name);
            return Err(GraphError::NodeNotFound(key));
        }
        self.detach_node(key);
        Ok(())
    }

    /// Connect two pins of opposite direction.
    ///
    /// An input reads from one source; connecting a new source replaces the
    /// old one. Connecting an existing pair again is a no-op.
    pub fn connect(&mut self, a: PinAddress, b: PinAddress) -> Result<()> {
        let pin_a = self.pin(a).ok_or(GraphError::PinNotFound(a))?;
        let pin_b = self.pin(b).ok_or(GraphError::PinNotFound(b))?;
        pin_a.check_compatible(pin_b)?;
        if pin_a.is_connected_to(&b) && pin_b.is_connected_to(&a) {
            return Ok(());
        }

        let (input, output) = match pin_a.direction() {
            PinDirection::Input => (a, b),
            PinDirection::Output => (b, a),
        };
        let replaced: Vec<PinAddress> = self
            .pin(input)
            .map(|pin| pin.connected_to().iter().copied().filter(|o| *o != output).collect())
            .unwrap_or_default();
        for previous in replaced {
            self.unlink(input, previous);
        }
        self.link(input, output);
        Ok(())
    }

    /// Remove the edge between two pins; returns false if there was none
    pub fn disconnect(&mut self, a: PinAddress, b: PinAddress) -> Result<bool> {
        self.pin(a).ok_or(GraphError::PinNotFound(a))?;
        self.pin(b).ok_or(GraphError::PinNotFound(b))?;
        Ok(self.unlink(a, b))
    }

    /// Remove every edge of one pin, returns how many were removed
    pub fn disconnect_all(&mut self, address: PinAddress) -> Result<usize> {
        let others = self
            .pin(address)
            .ok_or(GraphError::PinNotFound(address))?
            .connected_to()
            .to_vec();
        let mut removed = 0;
        for other in others {
            if self.unlink(address, other) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Append a pin to a collection, returns its address
    pub fn add_collection_pin(&mut self, node: NodeKey, collection: usize) -> Result<PinAddress> {
        let index = self
            .nodes
            .get_mut(node.0)
            .ok_or(GraphError::NodeNotFound(node))?
            .pin_collection_mut(collection)
            .ok_or(GraphError::CollectionNotFound { node, collection })?
            .add_pin();
        self.dirty = true;
        Ok(PinAddress::new(node, PinSlot::Collection { collection, index }))
    }

    /// Disconnect and remove the trailing pin of a collection
    pub fn remove_collection_pin(&mut self, node: NodeKey, collection: usize) -> Result<()> {
        let pins = self
            .nodes
            .get(node.0)
            .ok_or(GraphError::NodeNotFound(node))?
            .pin_collection(collection)
            .ok_or(GraphError::CollectionNotFound { node, collection })?;
        if pins.len() <= pins.minimum() {
            return Err(GraphError::CollectionAtMinimum(pins.name().to_string()));
        }

        let last = PinAddress::new(node, PinSlot::Collection { collection, index: pins.len() - 1 });
        self.disconnect_all(last)?;
        if let Some(pins) = self.nodes.get_mut(node.0).and_then(|n| n.pin_collection_mut(collection)) {
            pins.pop_pin();
        }
        self.dirty = true;
        Ok(())
    }

    pub fn set_node_position(&mut self, key: NodeKey, x: f64, y: f64) -> Result<()> {
        self.nodes
            .get_mut(key.0)
            .ok_or(GraphError::NodeNotFound(key))?
            .set_position(x, y);
        self.dirty = true;
        Ok(())
    }

    pub fn set_node_storage(&mut self, key: NodeKey, storage: Option<Storage>) -> Result<()> {
        self.nodes
            .get_mut(key.0)
            .ok_or(GraphError::NodeNotFound(key))?
            .set_storage(storage);
        self.dirty = true;
        Ok(())
    }

    /// Reset one node and clear its pins' memoization flags
    pub fn reset_node(&mut self, key: NodeKey) -> Result<()> {
        self.nodes.get_mut(key.0).ok_or(GraphError::NodeNotFound(key))?.reset();
        Ok(())
    }

    /// Initialize every node. Nodes added later are initialized as they arrive.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            log::warn!("Script '{}' is already initialized", self.name);
            return Err(GraphError::AlreadyInitialized(self.name.clone()));
        }
        self.initialized = true;
        self.initialize_pending();
        Ok(())
    }

    /// Reset every node, then evaluate the exit node
    pub fn run(&mut self) {
        self.process_registry_events();

        for node in self.nodes.values_mut() {
            node.reset();
        }
        evaluate_node(&mut self.nodes, &self.context, self.exit);
    }

    /// Subscribe to topology changes
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&ScriptEvent) + Send + 'static,
    {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Reload if the node type registry changed since the last call.
    ///
    /// Unsaved topology changes are saved first so the reload keeps them.
    /// Nodes the previous load skipped are part of that save.
    pub fn process_registry_events(&mut self) -> bool {
        let events = self.subscription.drain();
        if events.is_empty() {
            return false;
        }
        log::info!(
            "Reloading script '{}' after {} node type change(s)",
            self.name,
            events.len()
        );
        if self.dirty {
            self.save();
        }
        self.load();
        true
    }

    pub(crate) fn notify(&mut self, event: ScriptEvent) {
        self.observers.notify(&event);
    }

    pub(crate) fn attach_node(&mut self, node: ScriptNode) -> NodeKey {
        let key = NodeKey(self.nodes.insert(node));
        self.order.push(key);
        self.dirty = true;
        log::debug!("Added node {:?} to script '{}'", key, self.name);
        self.notify(ScriptEvent::NodeAdded(key));
        key
    }

    pub(crate) fn detach_node(&mut self, key: NodeKey) {
        let edges: Vec<(PinAddress, PinAddress)> = match self.nodes.get(key.0) {
            Some(node) => node
                .all_pins()
                .flat_map(move |(slot, pin)| {
                    pin.connected_to()
                        .iter()
                        .map(move |other| (PinAddress::new(key, slot), *other))
                })
                .collect(),
            None => return,
        };
        for (own, other) in edges {
            self.unlink(own, other);
        }
        if let Some(mut node) = self.nodes.remove(key.0) {
            node.dispose();
        }
        self.order.retain(|k| *k != key);
        self.dirty = true;
        log::debug!("Removed node {:?} from script '{}'", key, self.name);
        self.notify(ScriptEvent::NodeRemoved(key));
    }

    pub(crate) fn initialize_pending(&mut self) {
        for key in self.order.clone() {
            self.initialize_node(key);
        }
    }

    fn initialize_node(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get_mut(key.0) else {
            return;
        };
        if node.initialized {
            return;
        }
        let Some(mut behavior) = node.behavior.take() else {
            return;
        };
        {
            let mut ctx = InitContext::new(node, &self.context);
            behavior.initialize(&mut ctx);
        }
        node.behavior = Some(behavior);
        node.initialized = true;
    }

    /// Add both halves of an edge. Callers check direction and existence.
    pub(crate) fn link(&mut self, a: PinAddress, b: PinAddress) -> bool {
        let added_a = self.pin_mut(a).map(|pin| pin.connect_to(b)).unwrap_or(false);
        let added_b = self.pin_mut(b).map(|pin| pin.connect_to(a)).unwrap_or(false);
        if !(added_a || added_b) {
            return false;
        }
        self.dirty = true;
        let (input, output) = self.oriented(a, b);
        self.notify(ScriptEvent::PinConnected { input, output });
        true
    }

    /// Remove both halves of an edge
    pub(crate) fn unlink(&mut self, a: PinAddress, b: PinAddress) -> bool {
        let removed_a = self.pin_mut(a).map(|pin| pin.disconnect_from(&b)).unwrap_or(false);
        let removed_b = self.pin_mut(b).map(|pin| pin.disconnect_from(&a)).unwrap_or(false);
        if !(removed_a || removed_b) {
            return false;
        }
        self.dirty = true;
        let (input, output) = self.oriented(a, b);
        self.notify(ScriptEvent::PinDisconnected { input, output });
        true
    }

    fn pin_mut(&mut self, address: PinAddress) -> Option<&mut Pin> {
        self.nodes.get_mut(address.node.0)?.pin_mut(address.slot)
    }

    fn oriented(&self, a: PinAddress, b: PinAddress) -> (PinAddress, PinAddress) {
        match self.pin(a).map(|pin| pin.direction()) {
            Some(PinDirection::Output) => (b, a),
            _ => (a, b),
        }
    }
}

impl Drop for NodeScript {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.subscription.id());
        for node in self.nodes.values_mut() {
            node.dispose();
        }
    }
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .field("nodes", &self.order.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalContext;
    use crate::pin::{InputPin, OutputPin};

    struct Constant {
        output: OutputPin,
        value: i32,
    }

    impl Node for Constant {
        fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
            ctx.set_output(self.output, self.value);
        }
    }

    struct Negate {
        input: InputPin,
        output: OutputPin,
    }

    impl Node for Negate {
        fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
            let value = ctx.input(self.input).as_int().unwrap_or(0);
            ctx.set_output(self.output, -value);
        }
    }

    /// Captures its name and storage text when initialized
    struct Primed {
        output: OutputPin,
        label: String,
    }

    impl Node for Primed {
        fn initialize(&mut self, ctx: &mut InitContext<'_>) {
            let cue = ctx.storage().and_then(|storage| storage.as_text().ok()).unwrap_or("none");
            self.label = format!("{} {}", ctx.name(), cue);
        }

        fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
            ctx.set_output(self.output, self.label.clone());
        }
    }

    fn constant(script: &mut NodeScript, value: i32) -> (NodeKey, PinAddress) {
        let mut output = None;
        let key = script.add_node(NodeTypeKey::core("Constant"), |b| {
            let pin = b.output("Value", ValueType::Int);
            output = Some(pin);
            Box::new(Constant { output: pin, value })
        });
        (key, output.unwrap().at(key))
    }

    fn negate(script: &mut NodeScript) -> (NodeKey, PinAddress, PinAddress) {
        let mut pins = None;
        let key = script.add_node(NodeTypeKey::core("Negate"), |b| {
            let input = b.input("Value", ValueType::Int);
            let output = b.output("Result", ValueType::Int);
            pins = Some((input, output));
            Box::new(Negate { input, output })
        });
        let (input, output) = pins.unwrap();
        (key, input.at(key), output.at(key))
    }

    fn exit_input(script: &NodeScript) -> PinAddress {
        PinAddress::new(script.exit_node(), PinSlot::Single(0))
    }

    fn script() -> NodeScript {
        NodeScript::new("Test", "", ValueType::Int, &NodeTypeRegistry::new())
    }

    #[test]
    fn test_exit_node_is_created_first() {
        let mut script = script();
        assert!(!script.has_nodes());
        assert_eq!(script.ordinal_of(script.exit_node()), Some(0));

        constant(&mut script, 1);
        assert!(script.has_nodes());
        assert_eq!(script.ordinal_of(script.exit_node()), Some(0));
        assert!(script.node(script.exit_node()).unwrap().is_exit_node());
    }

    #[test]
    fn test_run_pulls_through_the_graph() {
        let mut script = script();
        let (_, value) = constant(&mut script, 7);
        let (_, input, output) = negate(&mut script);
        script.connect(value, input).unwrap();
        script.connect(output, exit_input(&script)).unwrap();

        script.run();
        assert_eq!(script.result(), Value::Int(-7));
    }

    #[test]
    fn test_connect_replaces_previous_source() {
        let mut script = script();
        let (_, first) = constant(&mut script, 1);
        let (_, second) = constant(&mut script, 2);
        let exit = exit_input(&script);

        script.connect(first, exit).unwrap();
        script.connect(exit, second).unwrap();
        assert_eq!(script.pin(exit).unwrap().connected_to(), &[second]);
        assert!(!script.pin(first).unwrap().is_connected());

        script.run();
        assert_eq!(script.result(), Value::Int(2));
    }

    #[test]
    fn test_remove_node_disconnects_it() {
        let mut script = script();
        let (key, value) = constant(&mut script, 3);
        script.connect(value, exit_input(&script)).unwrap();

        script.remove_node(key).unwrap();
        assert!(!script.pin(exit_input(&script)).unwrap().is_connected());
        assert!(matches!(script.remove_node(key), Err(GraphError::NodeNotFound(_))));
        assert!(matches!(
            script.remove_node(script.exit_node()),
            Err(GraphError::ExitNodeRemoval)
        ));
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let mut script = script();
        script.initialize().unwrap();
        assert!(matches!(script.initialize(), Err(GraphError::AlreadyInitialized(_))));

        let (key, _) = constant(&mut script, 1);
        assert!(script.node(key).unwrap().is_initialized());
    }

    #[test]
    fn test_initialize_sees_storage() {
        let mut script = NodeScript::new("Cues", "", ValueType::String, &NodeTypeRegistry::new());
        let mut output = None;
        let key = script.add_node(NodeTypeKey::core("Primed"), |b| {
            b.name("Cue");
            let pin = b.output("Label", ValueType::String);
            output = Some(pin);
            Box::new(Primed {
                output: pin,
                label: String::new(),
            })
        });
        script.set_node_storage(key, Some(Storage::from("go 4"))).unwrap();
        script.connect(output.unwrap().at(key), exit_input(&script)).unwrap();

        script.run();
        assert_eq!(script.result(), Value::String(String::new()));

        script.initialize().unwrap();
        script.run();
        assert_eq!(script.result(), Value::String("Cue go 4".into()));
    }

    #[test]
    fn test_events_are_delivered() {
        use std::sync::{Arc, Mutex};

        let mut script = script();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = script.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let (key, value) = constant(&mut script, 1);
        script.connect(value, exit_input(&script)).unwrap();
        script.connect(value, exit_input(&script)).unwrap();
        script.remove_node(key).unwrap();

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ScriptEvent::NodeAdded(key),
                ScriptEvent::PinConnected { input: exit_input(&script), output: value },
                ScriptEvent::PinDisconnected { input: exit_input(&script), output: value },
                ScriptEvent::NodeRemoved(key),
            ]
        );
        assert!(script.unsubscribe(id));
    }
}
