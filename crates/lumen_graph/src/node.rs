//! Node - Script nodes and their lifecycle
//!
//! A node is split in two halves. The [`Node`] trait object carries the
//! node author's behavior and holds typed pin handles. The [`ScriptNode`]
//! owned by the script carries everything the runtime manages: pins, pin
//! collections, placement, storage and the type the node was created from.

use crate::eval::{EvalContext, InitContext};
use crate::pin::{
    InputPin, InputPinCollection, OutputPin, OutputPinCollection, Pin, PinCollection, PinDirection,
    PinSlot,
};
use crate::registry::NodeTypeKey;
use crate::storage::Storage;
use crate::value::{Value, ValueType};
use lumen_core::SlotKey;
use std::fmt;

/// Stable handle to a node inside its script.
///
/// Keys carry the identity of the script that issued them; another script
/// treats them as unknown.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(pub(crate) SlotKey<ScriptNode>);

impl NodeKey {
    /// A key that never refers to a node
    pub const fn null() -> Self {
        Self(SlotKey::null())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NodeKey(null)")
        } else {
            write!(f, "NodeKey({}v{}@{})", self.0.index(), self.0.generation(), self.0.owner())
        }
    }
}

/// Behavior of a node type
///
/// Only [`Node::evaluate`] is required. Memoization is handled by the
/// runtime: a node is evaluated at most once per run no matter how many
/// downstream pins pull from it.
pub trait Node: Send + 'static {
    /// One-time setup, called once the script is assembled
    fn initialize(&mut self, _ctx: &mut InitContext<'_>) {}

    /// Compute outputs, pulling inputs on demand
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>);

    /// Clear node-local cached state before a run
    fn reset(&mut self) {}

    /// Release resources when the node leaves its script
    fn dispose(&mut self) {}

    /// The value a terminal node produced, if it produces one
    fn result(&self) -> Option<&Value> {
        None
    }
}

/// Declares the pins of a node while it is being created
pub struct NodeBuilder {
    key: NodeKey,
    name: String,
    description: String,
    pins: Vec<Pin>,
    collections: Vec<PinCollection>,
}

impl NodeBuilder {
    pub(crate) fn new(key: NodeKey) -> Self {
        Self {
            key,
            name: String::new(),
            description: String::new(),
            pins: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Key the node will have once added
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Set display name
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    /// Set description
    pub fn description(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }

    /// Declare an input pin
    pub fn input(&mut self, name: &str, value_type: ValueType) -> InputPin {
        self.pins.push(Pin::new(self.key, name, PinDirection::Input, value_type));
        InputPin(self.pins.len() - 1)
    }

    /// Declare an input pin with the value it reads while unconnected
    pub fn input_with_default(&mut self, name: &str, value_type: ValueType, default: Value) -> InputPin {
        let mut pin = Pin::new(self.key, name, PinDirection::Input, value_type.clone());
        pin.set_default(default.coerce_to(&value_type));
        self.pins.push(pin);
        InputPin(self.pins.len() - 1)
    }

    /// Declare an output pin
    pub fn output(&mut self, name: &str, value_type: ValueType) -> OutputPin {
        self.pins.push(Pin::new(self.key, name, PinDirection::Output, value_type));
        OutputPin(self.pins.len() - 1)
    }

    /// Declare a variadic input with `initial_count` pins; it never shrinks below that
    pub fn input_collection(&mut self, name: &str, value_type: ValueType, initial_count: usize) -> InputPinCollection {
        self.collections.push(PinCollection::new(
            self.key,
            name,
            PinDirection::Input,
            value_type,
            initial_count,
        ));
        InputPinCollection(self.collections.len() - 1)
    }

    /// Declare a variadic output with `initial_count` pins
    pub fn output_collection(&mut self, name: &str, value_type: ValueType, initial_count: usize) -> OutputPinCollection {
        self.collections.push(PinCollection::new(
            self.key,
            name,
            PinDirection::Output,
            value_type,
            initial_count,
        ));
        OutputPinCollection(self.collections.len() - 1)
    }

    pub(crate) fn finish(self, type_key: NodeTypeKey, behavior: Box<dyn Node>) -> ScriptNode {
        let name = if self.name.is_empty() {
            type_key.type_name.clone()
        } else {
            self.name
        };
        ScriptNode {
            key: self.key,
            type_key,
            name,
            description: self.description,
            position: (0.0, 0.0),
            storage: None,
            is_exit_node: false,
            pins: self.pins,
            collections: self.collections,
            behavior: Some(behavior),
            initialized: false,
        }
    }
}

/// A node as owned by its script
pub struct ScriptNode {
    key: NodeKey,
    type_key: NodeTypeKey,
    name: String,
    description: String,
    position: (f64, f64),
    storage: Option<Storage>,
    is_exit_node: bool,
    pins: Vec<Pin>,
    collections: Vec<PinCollection>,
    /// Taken out while the node evaluates
    pub(crate) behavior: Option<Box<dyn Node>>,
    pub(crate) initialized: bool,
}

impl ScriptNode {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Type this node was created from
    pub fn type_key(&self) -> &NodeTypeKey {
        &self.type_key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Editor placement
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    pub fn is_exit_node(&self) -> bool {
        self.is_exit_node
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Plain pins in declaration order
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Pin collections in declaration order
    pub fn pin_collections(&self) -> &[PinCollection] {
        &self.collections
    }

    pub fn pin(&self, slot: PinSlot) -> Option<&Pin> {
        match slot {
            PinSlot::Single(index) => self.pins.get(index),
            PinSlot::Collection { collection, index } => self.collections.get(collection)?.pin(index),
        }
    }

    pub(crate) fn pin_mut(&mut self, slot: PinSlot) -> Option<&mut Pin> {
        match slot {
            PinSlot::Single(index) => self.pins.get_mut(index),
            PinSlot::Collection { collection, index } => self.collections.get_mut(collection)?.pin_mut(index),
        }
    }

    pub fn pin_collection(&self, index: usize) -> Option<&PinCollection> {
        self.collections.get(index)
    }

    pub(crate) fn pin_collection_mut(&mut self, index: usize) -> Option<&mut PinCollection> {
        self.collections.get_mut(index)
    }

    /// Find a collection by name, element type and direction
    pub fn find_collection(&self, name: &str, value_type: &ValueType, direction: PinDirection) -> Option<usize> {
        self.collections.iter().position(|c| {
            c.name() == name && c.value_type() == value_type && c.direction() == direction
        })
    }

    /// Every pin with its slot, plain pins first
    pub fn all_pins(&self) -> impl Iterator<Item = (PinSlot, &Pin)> {
        let plain = self
            .pins
            .iter()
            .enumerate()
            .map(|(index, pin)| (PinSlot::Single(index), pin));
        let members = self.collections.iter().enumerate().flat_map(|(collection, c)| {
            c.pins()
                .iter()
                .enumerate()
                .map(move |(index, pin)| (PinSlot::Collection { collection, index }, pin))
        });
        plain.chain(members)
    }

    /// Slots of every input pin, plain pins first
    pub fn input_slots(&self) -> Vec<PinSlot> {
        self.all_pins()
            .filter(|(_, pin)| pin.direction() == PinDirection::Input)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Whether the node's behavior is currently checked out for evaluation
    pub fn is_evaluating(&self) -> bool {
        self.behavior.is_none()
    }

    pub(crate) fn behavior(&self) -> Option<&dyn Node> {
        self.behavior.as_deref()
    }

    pub(crate) fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
    }

    pub(crate) fn set_storage(&mut self, storage: Option<Storage>) {
        self.storage = storage;
    }

    pub(crate) fn set_exit_node(&mut self) {
        self.is_exit_node = true;
    }

    /// Reset the behavior, then clear the memoization flag of every owned pin
    pub(crate) fn reset(&mut self) {
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.reset();
        }
        for pin in self.pins.iter_mut() {
            pin.reset();
        }
        for collection in self.collections.iter_mut() {
            for pin in collection.pins_mut() {
                pin.reset();
            }
        }
    }

    /// Mark every output as computed for this run
    pub(crate) fn mark_outputs_evaluated(&mut self) {
        let outputs = self
            .pins
            .iter_mut()
            .chain(self.collections.iter_mut().flat_map(|c| c.pins_mut()))
            .filter(|pin| pin.direction() == PinDirection::Output);
        for pin in outputs {
            pin.mark_evaluated();
        }
    }

    pub(crate) fn dispose(&mut self) {
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.dispose();
        }
    }
}

impl fmt::Debug for ScriptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptNode")
            .field("key", &self.key)
            .field("type_key", &self.type_key)
            .field("name", &self.name)
            .field("is_exit_node", &self.is_exit_node)
            .field("pins", &self.pins.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}
