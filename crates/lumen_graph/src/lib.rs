//! # lumen_graph - Node Script Runtime
//!
//! Typed node graphs evaluated on demand:
//! - **Pins**: typed terminals with symmetric, idempotent connections
//! - **Pin collections**: variadic pins that grow to match saved arity
//! - **Demand-pull evaluation**: the exit node pulls values upstream, each
//!   node evaluates at most once per run
//! - **Registry**: node types keyed by `(plugin, type name)`, with change
//!   notifications that make scripts reload
//! - **Persistence**: flat, ordinal-addressed records that survive missing
//!   node types and stale indices
//!
//! ## Example
//!
//! ```ignore
//! use lumen_graph::prelude::*;
//!
//! let registry = NodeTypeRegistry::global();
//! let mut script = NodeScript::new("Brightness", "", ValueType::Float, registry);
//!
//! let sum = script.create_node(&PluginId::new("lumen.nodes"), "Sum")?;
//! let exit = PinAddress::new(script.exit_node(), PinSlot::Single(0));
//! script.connect(PinAddress::new(sum, PinSlot::Single(0)), exit)?;
//!
//! script.initialize()?;
//! script.run();
//! println!("{}", script.result());
//!
//! let json = script.save().to_json()?;
//! ```

pub mod value;
pub mod storage;
pub mod error;
pub mod pin;
pub mod node;
pub mod eval;
pub mod exit;
pub mod registry;
pub mod record;
pub mod script;
mod persist;

// Re-exports
pub use value::{Value, ValueType};
pub use storage::{Storage, StorageError};
pub use error::{GraphError, Result};
pub use pin::{
    InputPin, InputPinCollection, OutputPin, OutputPinCollection, Pin, PinAddress, PinCollection,
    PinDirection, PinSlot,
};
pub use node::{Node, NodeBuilder, NodeKey, ScriptNode};
pub use eval::{EvalContext, InitContext, ScriptContext};
pub use exit::{ExitNode, EXIT_NODE_TYPE};
pub use registry::{
    FnNodeFactory, NodeCategory, NodeFactory, NodeTypeEvent, NodeTypeInfo, NodeTypeKey,
    NodeTypeRegistration, NodeTypeRegistry, NodeTypeSubscription,
};
pub use record::{ConnectionRecord, NodeRecord, NodeScriptRecord, PinCollectionRecord, PLAIN_PIN};
pub use script::{NodeScript, ScriptEvent};

pub use lumen_core::{PluginId, SubscriberId};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::value::{Value, ValueType};
    pub use crate::storage::Storage;
    pub use crate::error::{GraphError, Result};
    pub use crate::pin::{
        InputPin, InputPinCollection, OutputPin, OutputPinCollection, PinAddress, PinDirection,
        PinSlot,
    };
    pub use crate::node::{Node, NodeBuilder, NodeKey};
    pub use crate::eval::{EvalContext, InitContext, ScriptContext};
    pub use crate::registry::{NodeCategory, NodeTypeInfo, NodeTypeKey, NodeTypeRegistry};
    pub use crate::record::{NodeRecord, NodeScriptRecord};
    pub use crate::script::{NodeScript, ScriptEvent};
    pub use lumen_core::PluginId;
}
