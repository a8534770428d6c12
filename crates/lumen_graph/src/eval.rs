//! Demand-pull evaluation
//!
//! A run evaluates the exit node only. Every input it reads pulls the
//! connected output, which evaluates that output's node first if it has not
//! produced a value in this run. While a node evaluates its behavior is
//! checked out of the script, so pulling it again means the graph has a
//! cycle; the pull then reads the pin's reset value, its type's default,
//! instead of recursing.

use crate::node::{NodeKey, ScriptNode};
use crate::pin::{InputPin, InputPinCollection, OutputPin, OutputPinCollection, PinAddress, PinSlot};
use crate::storage::Storage;
use crate::value::Value;
use lumen_core::SlotMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque payload a host attaches to a script, visible to every node
#[derive(Clone, Default)]
pub struct ScriptContext(Option<Arc<dyn Any + Send + Sync>>);

impl ScriptContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// A context carrying nothing
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the payload as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "ScriptContext(empty)")
        } else {
            write!(f, "ScriptContext(..)")
        }
    }
}

/// What a node sees during [`Node::initialize`](crate::node::Node::initialize)
pub struct InitContext<'a> {
    key: NodeKey,
    name: &'a str,
    storage: Option<&'a Storage>,
    context: &'a ScriptContext,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(node: &'a ScriptNode, context: &'a ScriptContext) -> Self {
        Self {
            key: node.key(),
            name: node.name(),
            storage: node.storage(),
            context,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// The node's storage payload, if any was set or restored
    pub fn storage(&self) -> Option<&Storage> {
        self.storage
    }

    pub fn context(&self) -> &ScriptContext {
        self.context
    }
}

/// What a node sees during [`Node::evaluate`](crate::node::Node::evaluate)
pub struct EvalContext<'a> {
    nodes: &'a mut SlotMap<ScriptNode>,
    context: &'a ScriptContext,
    key: NodeKey,
}

impl<'a> EvalContext<'a> {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn context(&self) -> &ScriptContext {
        self.context
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.node().and_then(|node| node.storage())
    }

    /// Read an input, pulling its source if connected
    pub fn input(&mut self, pin: InputPin) -> Value {
        self.read_input(pin.slot())
    }

    /// Read one member of an input collection
    pub fn input_at(&mut self, collection: InputPinCollection, index: usize) -> Value {
        self.read_input(collection.slot(index))
    }

    /// Read every member of an input collection in order
    pub fn inputs(&mut self, collection: InputPinCollection) -> Vec<Value> {
        (0..self.collection_len(collection.index()))
            .map(|index| self.input_at(collection, index))
            .collect()
    }

    pub fn input_count(&self, collection: InputPinCollection) -> usize {
        self.collection_len(collection.index())
    }

    pub fn output_count(&self, collection: OutputPinCollection) -> usize {
        self.collection_len(collection.index())
    }

    pub fn is_connected(&self, pin: InputPin) -> bool {
        self.node()
            .and_then(|node| node.pin(pin.slot()))
            .map(|pin| pin.is_connected())
            .unwrap_or(false)
    }

    /// Write an output, converted to the pin's type
    pub fn set_output(&mut self, pin: OutputPin, value: impl Into<Value>) {
        self.write_output(pin.slot(), value.into());
    }

    pub fn set_output_at(&mut self, collection: OutputPinCollection, index: usize, value: impl Into<Value>) {
        self.write_output(collection.slot(index), value.into());
    }

    fn node(&self) -> Option<&ScriptNode> {
        self.nodes.get(self.key.0)
    }

    fn collection_len(&self, index: usize) -> usize {
        self.node()
            .and_then(|node| node.pin_collection(index))
            .map(|collection| collection.len())
            .unwrap_or(0)
    }

    fn read_input(&mut self, slot: PinSlot) -> Value {
        let (source, value_type, fallback) = match self.node().and_then(|node| node.pin(slot)) {
            Some(pin) => (
                pin.connected_to().first().copied(),
                pin.value_type().clone(),
                pin.value().clone(),
            ),
            None => return Value::None,
        };
        match source {
            Some(source) => pull(self.nodes, self.context, source).coerce_to(&value_type),
            None => fallback,
        }
    }

    fn write_output(&mut self, slot: PinSlot, value: Value) {
        let key = self.key;
        if let Some(pin) = self.nodes.get_mut(key.0).and_then(|node| node.pin_mut(slot)) {
            let value = value.coerce_to(pin.value_type());
            pin.set_value(value);
        }
    }
}

/// Evaluate one node, with its behavior checked out for the duration
pub(crate) fn evaluate_node(nodes: &mut SlotMap<ScriptNode>, context: &ScriptContext, key: NodeKey) {
    let Some(node) = nodes.get_mut(key.0) else {
        return;
    };
    let Some(mut behavior) = node.behavior.take() else {
        log::warn!("Cycle detected at node '{}' ({:?}), using default values", node.name(), key);
        return;
    };

    {
        let mut ctx = EvalContext {
            nodes: &mut *nodes,
            context,
            key,
        };
        behavior.evaluate(&mut ctx);
    }

    if let Some(node) = nodes.get_mut(key.0) {
        node.behavior = Some(behavior);
        node.mark_outputs_evaluated();
    }
}

/// Value of an output pin for this run, evaluating its node if needed
fn pull(nodes: &mut SlotMap<ScriptNode>, context: &ScriptContext, source: PinAddress) -> Value {
    let evaluated = match nodes.get(source.node.0).and_then(|node| node.pin(source.slot)) {
        Some(pin) => pin.is_evaluated(),
        None => return Value::None,
    };
    if !evaluated {
        evaluate_node(nodes, context, source.node);
    }
    nodes
        .get(source.node.0)
        .and_then(|node| node.pin(source.slot))
        .map(|pin| pin.value().clone())
        .unwrap_or_default()
}
