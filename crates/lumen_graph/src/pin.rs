//! Pins - Typed node terminals
//!
//! A [`Pin`] lives inside the node that owns it and points at the pins it is
//! connected to by [`PinAddress`], never by reference. Edges are always
//! stored on both ends; the script adds and removes both halves together.

use crate::error::GraphError;
use crate::node::NodeKey;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// Pin direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// The direction a pin must have to connect to this one
    pub fn opposite(self) -> Self {
        match self {
            PinDirection::Input => PinDirection::Output,
            PinDirection::Output => PinDirection::Input,
        }
    }
}

/// Position of a pin within its node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinSlot {
    /// A plain pin, by index in the node's pin list
    Single(usize),
    /// A member of a pin collection
    Collection { collection: usize, index: usize },
}

/// Script-wide address of a pin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinAddress {
    pub node: NodeKey,
    pub slot: PinSlot,
}

impl PinAddress {
    pub fn new(node: NodeKey, slot: PinSlot) -> Self {
        Self { node, slot }
    }
}

/// A single typed terminal
#[derive(Clone, Debug)]
pub struct Pin {
    name: String,
    direction: PinDirection,
    value_type: ValueType,
    owner: NodeKey,
    value: Value,
    is_evaluated: bool,
    connected_to: Vec<PinAddress>,
}

impl Pin {
    pub(crate) fn new(owner: NodeKey, name: &str, direction: PinDirection, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            direction,
            value: value_type.default_value(),
            value_type,
            owner,
            is_evaluated: false,
            connected_to: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Node that owns this pin
    pub fn owner(&self) -> NodeKey {
        self.owner
    }

    /// For outputs the last computed value, for inputs the value used while unconnected
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the value was computed during the current run
    pub fn is_evaluated(&self) -> bool {
        self.is_evaluated
    }

    pub fn connected_to(&self) -> &[PinAddress] {
        &self.connected_to
    }

    pub fn is_connected(&self) -> bool {
        !self.connected_to.is_empty()
    }

    pub fn is_connected_to(&self, other: &PinAddress) -> bool {
        self.connected_to.contains(other)
    }

    /// Check the connection rules against `other` without connecting.
    pub fn check_compatible(&self, other: &Pin) -> Result<(), GraphError> {
        if self.direction == other.direction {
            return Err(GraphError::SameDirection(self.direction));
        }
        let (input, output) = match self.direction {
            PinDirection::Input => (self, other),
            PinDirection::Output => (other, self),
        };
        if input.value_type.is_assignable_from(&output.value_type) {
            Ok(())
        } else {
            Err(GraphError::IncompatibleTypes {
                output: output.value_type.clone(),
                input: input.value_type.clone(),
            })
        }
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
        self.is_evaluated = true;
    }

    pub(crate) fn set_default(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn mark_evaluated(&mut self) {
        self.is_evaluated = true;
    }

    /// Forget this run. Outputs fall back to their type's default until
    /// their node writes them again; inputs keep their unconnected value.
    pub(crate) fn reset(&mut self) {
        self.is_evaluated = false;
        if self.direction == PinDirection::Output {
            self.value = self.value_type.default_value();
        }
    }

    /// Add one half of an edge, returns false if it already existed
    pub(crate) fn connect_to(&mut self, other: PinAddress) -> bool {
        if self.connected_to.contains(&other) {
            return false;
        }
        self.connected_to.push(other);
        true
    }

    /// Remove one half of an edge, returns false if it did not exist
    pub(crate) fn disconnect_from(&mut self, other: &PinAddress) -> bool {
        let before = self.connected_to.len();
        self.connected_to.retain(|addr| addr != other);
        self.connected_to.len() != before
    }
}

/// An ordered, resizable group of pins sharing one type and direction
#[derive(Clone, Debug)]
pub struct PinCollection {
    name: String,
    direction: PinDirection,
    value_type: ValueType,
    owner: NodeKey,
    minimum: usize,
    pins: Vec<Pin>,
}

impl PinCollection {
    pub(crate) fn new(
        owner: NodeKey,
        name: &str,
        direction: PinDirection,
        value_type: ValueType,
        initial_count: usize,
    ) -> Self {
        let mut collection = Self {
            name: name.to_string(),
            direction,
            value_type,
            owner,
            minimum: initial_count,
            pins: Vec::with_capacity(initial_count),
        };
        for _ in 0..initial_count {
            collection.add_pin();
        }
        collection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// The node's declared arity, the collection never shrinks below it
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn pin(&self, index: usize) -> Option<&Pin> {
        self.pins.get(index)
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub(crate) fn pin_mut(&mut self, index: usize) -> Option<&mut Pin> {
        self.pins.get_mut(index)
    }

    pub(crate) fn pins_mut(&mut self) -> impl Iterator<Item = &mut Pin> {
        self.pins.iter_mut()
    }

    /// Append a pin, returns its index
    pub(crate) fn add_pin(&mut self) -> usize {
        let index = self.pins.len();
        let name = format!("{} {}", self.name, index + 1);
        self.pins.push(Pin::new(self.owner, &name, self.direction, self.value_type.clone()));
        index
    }

    /// Remove the trailing pin. The caller disconnects it first.
    pub(crate) fn pop_pin(&mut self) -> Option<Pin> {
        if self.pins.len() <= self.minimum {
            return None;
        }
        self.pins.pop()
    }
}

/// Handle to a plain input pin, held by the node that declared it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputPin(pub(crate) usize);

/// Handle to a plain output pin, held by the node that declared it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputPin(pub(crate) usize);

/// Handle to an input pin collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputPinCollection(pub(crate) usize);

/// Handle to an output pin collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputPinCollection(pub(crate) usize);

impl InputPin {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn slot(self) -> PinSlot {
        PinSlot::Single(self.0)
    }

    /// Address of this pin on `node`
    pub fn at(self, node: NodeKey) -> PinAddress {
        PinAddress::new(node, self.slot())
    }
}

impl OutputPin {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn slot(self) -> PinSlot {
        PinSlot::Single(self.0)
    }

    pub fn at(self, node: NodeKey) -> PinAddress {
        PinAddress::new(node, self.slot())
    }
}

impl InputPinCollection {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn slot(self, index: usize) -> PinSlot {
        PinSlot::Collection { collection: self.0, index }
    }

    pub fn at(self, node: NodeKey, index: usize) -> PinAddress {
        PinAddress::new(node, self.slot(index))
    }
}

impl OutputPinCollection {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn slot(self, index: usize) -> PinSlot {
        PinSlot::Collection { collection: self.0, index }
    }

    pub fn at(self, node: NodeKey, index: usize) -> PinAddress {
        PinAddress::new(node, self.slot(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(direction: PinDirection, value_type: ValueType) -> Pin {
        Pin::new(NodeKey::null(), "test", direction, value_type)
    }

    #[test]
    fn test_direction_rule() {
        for ty in [ValueType::Int, ValueType::Any, ValueType::Color] {
            let a = pin(PinDirection::Input, ty.clone());
            let b = pin(PinDirection::Input, ty.clone());
            assert!(matches!(a.check_compatible(&b), Err(GraphError::SameDirection(PinDirection::Input))));

            let a = pin(PinDirection::Output, ty.clone());
            let b = pin(PinDirection::Output, ty);
            assert!(matches!(a.check_compatible(&b), Err(GraphError::SameDirection(PinDirection::Output))));
        }
    }

    #[test]
    fn test_type_rule_is_checked_input_from_output() {
        let float_in = pin(PinDirection::Input, ValueType::Float);
        let int_out = pin(PinDirection::Output, ValueType::Int);
        assert!(float_in.check_compatible(&int_out).is_ok());
        assert!(int_out.check_compatible(&float_in).is_ok());

        let int_in = pin(PinDirection::Input, ValueType::Int);
        let float_out = pin(PinDirection::Output, ValueType::Float);
        assert!(matches!(
            int_in.check_compatible(&float_out),
            Err(GraphError::IncompatibleTypes { .. })
        ));

        let any_in = pin(PinDirection::Input, ValueType::Any);
        assert!(any_in.check_compatible(&float_out).is_ok());
    }

    #[test]
    fn test_reset_restores_output_default_only() {
        let mut output = pin(PinDirection::Output, ValueType::Int);
        output.set_value(Value::Int(12));
        output.reset();
        assert!(!output.is_evaluated());
        assert_eq!(output.value(), &Value::Int(0));

        let mut input = pin(PinDirection::Input, ValueType::Float);
        input.set_default(Value::Float(0.5));
        input.mark_evaluated();
        input.reset();
        assert!(!input.is_evaluated());
        assert_eq!(input.value(), &Value::Float(0.5));
    }

    #[test]
    fn test_half_edges_are_idempotent() {
        let mut a = pin(PinDirection::Input, ValueType::Int);
        let target = PinAddress::new(NodeKey::null(), PinSlot::Single(3));
        assert!(a.connect_to(target));
        assert!(!a.connect_to(target));
        assert_eq!(a.connected_to().len(), 1);
        assert!(a.disconnect_from(&target));
        assert!(!a.disconnect_from(&target));
        assert!(!a.is_connected());
    }

    #[test]
    fn test_collection_resizes_at_the_tail() {
        let mut collection =
            PinCollection::new(NodeKey::null(), "Values", PinDirection::Input, ValueType::Float, 2);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.add_pin(), 2);
        assert_eq!(collection.pin(2).map(|p| p.name()), Some("Values 3"));
        assert!(collection.pop_pin().is_some());
        assert!(collection.pop_pin().is_none());
        assert_eq!(collection.len(), collection.minimum());
        assert!(collection.pins().iter().all(|p| p.value_type() == &ValueType::Float));
    }
}
