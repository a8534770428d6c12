//! Text nodes

use crate::node_type;
use lumen_graph::{
    EvalContext, InputPin, InputPinCollection, Node, NodeCategory, NodeTypeInfo, NodeTypeRegistry,
    OutputPin, Value, ValueType,
};

/// Replace `{0}`, `{1}`, ... in `format` with the matching value.
///
/// Placeholders without a value are left as written.
pub fn format_values(format: &str, values: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].trim().parse().ok()?;
            let value = values.get(index)?;
            Some((value.to_string(), close))
        });
        match replaced {
            Some((text, close)) => {
                out.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Formats its inputs with the format string kept in storage
pub struct StringFormatNode {
    values: InputPinCollection,
    output: OutputPin,
}

impl Node for StringFormatNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let format = ctx
            .storage()
            .and_then(|storage| storage.as_text().ok())
            .unwrap_or_default()
            .to_string();
        let values = ctx.inputs(self.values);
        ctx.set_output(self.output, format_values(&format, &values));
    }
}

/// Converts any value to its text form
pub struct ToStringNode {
    input: InputPin,
    output: OutputPin,
}

impl Node for ToStringNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let value = ctx.input(self.input);
        ctx.set_output(self.output, value.to_string());
    }
}

pub(crate) fn register(registry: &NodeTypeRegistry) {
    registry.register_fn(
        NodeTypeInfo::new(node_type("StringFormat"), "Format")
            .description("Formats the input values with the format string kept in storage")
            .category(NodeCategory::Text),
        |_, _, builder| {
            builder.name("Format");
            Box::new(StringFormatNode {
                values: builder.input_collection("Values", ValueType::Any, 1),
                output: builder.output("Result", ValueType::String),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("ToString"), "To text")
            .description("Converts the input to text")
            .category(NodeCategory::Conversion),
        |_, _, builder| {
            builder.name("To text");
            Box::new(ToStringNode {
                input: builder.input("Input", ValueType::Any),
                output: builder.output("Result", ValueType::String),
            })
        },
    );
}
