//! # lumen_nodes - Built-in Node Types
//!
//! The node library every Lumen host ships with, registered under the
//! `lumen.nodes` plugin:
//! - **Static values**: constants of every pin type, read from node storage
//! - **Math**: sum, product, clamp, spread and easing curves
//! - **Logic**: and, or, not, equality and a lazy if
//! - **Text**: format strings and conversion to text
//! - **Color**: color from channels and color mixing
//!
//! ## Example
//!
//! ```ignore
//! use lumen_graph::prelude::*;
//!
//! let registry = NodeTypeRegistry::new();
//! lumen_nodes::register_builtin_nodes(&registry);
//!
//! let mut script = NodeScript::new("Dimmer", "", ValueType::Float, &registry);
//! let clamp = script.create_node(&lumen_nodes::plugin(), "Clamp")?;
//! ```

pub mod static_value;
pub mod math;
pub mod logic;
pub mod text;
pub mod color;

use lumen_core::PluginId;
use lumen_graph::{NodeTypeKey, NodeTypeRegistry};

/// Plugin the built-in node types are registered under
pub const PLUGIN: &str = "lumen.nodes";

/// The built-in plugin's id
pub fn plugin() -> PluginId {
    PluginId::new(PLUGIN)
}

/// Key of a built-in node type
pub fn node_type(type_name: &str) -> NodeTypeKey {
    NodeTypeKey::new(plugin(), type_name)
}

/// Register every built-in node type
pub fn register_builtin_nodes(registry: &NodeTypeRegistry) {
    static_value::register(registry);
    math::register(registry);
    logic::register(registry);
    text::register(registry);
    color::register(registry);
    log::info!("Registered {} built-in node types", builtin_count(registry));
}

/// Remove every built-in node type, returns how many were removed
pub fn unregister_builtin_nodes(registry: &NodeTypeRegistry) -> usize {
    registry.unregister_plugin(&plugin())
}

fn builtin_count(registry: &NodeTypeRegistry) -> usize {
    registry
        .registrations()
        .iter()
        .filter(|info| info.key.plugin.name() == PLUGIN)
        .count()
}

/// Re-export commonly used items
pub mod prelude {
    pub use crate::{node_type, plugin, register_builtin_nodes, unregister_builtin_nodes, PLUGIN};
    pub use crate::math::Easing;
}
