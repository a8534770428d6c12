//! Persisted script records
//!
//! The flat, index-addressed form a script is saved to. Nodes are addressed
//! by their ordinal within one snapshot, pins by plain index or by
//! (collection, index). Ordinals are only meaningful inside the record they
//! were written to.

use crate::pin::{PinDirection, PinSlot};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};

/// Collection index written for a plain pin
pub const PLAIN_PIN: i64 = -1;

/// A saved node script
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeScriptRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl NodeScriptRecord {
    /// Create an empty record
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Check if the record holds anything to restore
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A saved node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub ordinal: usize,
    pub plugin_id: String,
    pub type_name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_exit_node: bool,
    #[serde(default)]
    pub pin_collections: Vec<PinCollectionRecord>,
}

/// Size of one pin collection at save time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinCollectionRecord {
    pub name: String,
    pub element_type_name: String,
    pub direction: PinDirection,
    pub count: usize,
}

/// One edge, written from the input pin's side
///
/// Indices are signed so records from older or foreign writers with stale
/// or negative values still deserialize; restore skips them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    #[serde(default)]
    pub source_type: String,
    pub source_node: i64,
    pub source_pin_collection: i64,
    pub source_pin_index: i64,
    #[serde(default)]
    pub target_type: String,
    pub target_node: i64,
    pub target_pin_collection: i64,
    pub target_pin_index: i64,
}

impl ConnectionRecord {
    pub fn source_ordinal(&self) -> Option<usize> {
        usize::try_from(self.source_node).ok()
    }

    pub fn target_ordinal(&self) -> Option<usize> {
        usize::try_from(self.target_node).ok()
    }

    pub fn source_slot(&self) -> Option<PinSlot> {
        decode_slot(self.source_pin_collection, self.source_pin_index)
    }

    pub fn target_slot(&self) -> Option<PinSlot> {
        decode_slot(self.target_pin_collection, self.target_pin_index)
    }
}

/// (collection, index) as written to a record
pub(crate) fn encode_slot(slot: PinSlot) -> (i64, i64) {
    match slot {
        PinSlot::Single(index) => (PLAIN_PIN, index as i64),
        PinSlot::Collection { collection, index } => (collection as i64, index as i64),
    }
}

fn decode_slot(collection: i64, index: i64) -> Option<PinSlot> {
    let index = usize::try_from(index).ok()?;
    if collection == PLAIN_PIN {
        return Some(PinSlot::Single(index));
    }
    let collection = usize::try_from(collection).ok()?;
    Some(PinSlot::Collection { collection, index })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(source_collection: i64, source_index: i64) -> ConnectionRecord {
        ConnectionRecord {
            source_type: "Int".into(),
            source_node: 1,
            source_pin_collection: source_collection,
            source_pin_index: source_index,
            target_type: "Int".into(),
            target_node: 0,
            target_pin_collection: PLAIN_PIN,
            target_pin_index: 0,
        }
    }

    #[test]
    fn test_slot_addressing() {
        assert_eq!(connection(PLAIN_PIN, 2).source_slot(), Some(PinSlot::Single(2)));
        assert_eq!(
            connection(1, 3).source_slot(),
            Some(PinSlot::Collection { collection: 1, index: 3 })
        );
        assert_eq!(connection(PLAIN_PIN, -4).source_slot(), None);
        assert_eq!(connection(-7, 0).source_slot(), None);
        assert_eq!(encode_slot(PinSlot::Single(5)), (PLAIN_PIN, 5));
    }

    #[test]
    fn test_negative_ordinals_are_unresolvable() {
        let mut record = connection(PLAIN_PIN, 0);
        record.source_node = -1;
        assert_eq!(record.source_ordinal(), None);
        assert_eq!(record.target_ordinal(), Some(0));
    }

    #[test]
    fn test_record_field_names() {
        let record = NodeScriptRecord {
            name: "Brightness".into(),
            description: String::new(),
            nodes: vec![NodeRecord {
                ordinal: 0,
                plugin_id: "lumen.core".into(),
                type_name: "ExitNode".into(),
                x: 10.0,
                y: 20.0,
                storage: None,
                name: "Exit node".into(),
                description: String::new(),
                is_exit_node: true,
                pin_collections: vec![PinCollectionRecord {
                    name: "Values".into(),
                    element_type_name: "Float".into(),
                    direction: PinDirection::Input,
                    count: 3,
                }],
            }],
            connections: vec![connection(PLAIN_PIN, 0)],
        };

        let json = record.to_json().unwrap();
        for field in [
            "pluginId",
            "typeName",
            "isExitNode",
            "pinCollections",
            "elementTypeName",
            "sourcePinCollection",
            "targetPinIndex",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }
        assert!(!json.contains("storage"));
        assert_eq!(NodeScriptRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_minimal_record_parses() {
        let record = NodeScriptRecord::from_json(r#"{"name":"Empty"}"#).unwrap();
        assert!(record.is_empty());
        assert!(record.connections.is_empty());
    }
}
