//! Static value nodes
//!
//! One node type per pin type. The value lives in the node's storage as a
//! JSON document so it survives save and restore; a missing or mismatched
//! payload yields the type's default.

use crate::node_type;
use lumen_graph::{
    EvalContext, Node, NodeCategory, NodeTypeInfo, NodeTypeRegistry, OutputPin, Storage, Value,
    ValueType,
};

/// Outputs the value kept in storage
pub struct StaticValueNode {
    output: OutputPin,
    value_type: ValueType,
}

impl StaticValueNode {
    /// Type name the node of `value_type` is registered under
    pub fn type_name(value_type: &ValueType) -> String {
        format!("Static{}", value_type)
    }

    /// Storage payload holding `value`
    pub fn storage(value: impl Into<Value>) -> lumen_graph::Result<Storage> {
        Ok(Storage::from_serializable(&value.into())?)
    }
}

impl Node for StaticValueNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let value = ctx
            .storage()
            .and_then(|storage| storage.deserialize::<Value>().ok())
            .map(|value| value.coerce_to(&self.value_type))
            .unwrap_or_else(|| self.value_type.default_value());
        ctx.set_output(self.output, value);
    }
}

pub(crate) fn register(registry: &NodeTypeRegistry) {
    for value_type in [
        ValueType::Bool,
        ValueType::Int,
        ValueType::Float,
        ValueType::String,
        ValueType::Color,
    ] {
        let type_name = StaticValueNode::type_name(&value_type);
        let info = NodeTypeInfo::new(node_type(&type_name), &format!("{} value", value_type))
            .description(&format!("Outputs a configurable static {} value", value_type))
            .category(NodeCategory::Static);
        registry.register_fn(info, move |_, _, builder| {
            builder.name(&format!("{} value", value_type));
            Box::new(StaticValueNode {
                output: builder.output("Output", value_type.clone()),
                value_type: value_type.clone(),
            })
        });
    }
}
