//! Logic nodes

use crate::node_type;
use lumen_graph::{
    EvalContext, InputPin, InputPinCollection, Node, NodeCategory, NodeTypeInfo, NodeTypeRegistry,
    OutputPin, ValueType,
};

/// True when every input is true
pub struct AndNode {
    values: InputPinCollection,
    output: OutputPin,
}

impl Node for AndNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let result = ctx.inputs(self.values).iter().all(|value| value.is_truthy());
        ctx.set_output(self.output, result);
    }
}

/// True when any input is true
pub struct OrNode {
    values: InputPinCollection,
    output: OutputPin,
}

impl Node for OrNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let result = ctx.inputs(self.values).iter().any(|value| value.is_truthy());
        ctx.set_output(self.output, result);
    }
}

pub struct NotNode {
    input: InputPin,
    output: OutputPin,
}

impl Node for NotNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let value = ctx.input(self.input).is_truthy();
        ctx.set_output(self.output, !value);
    }
}

/// Compares two values of any type
pub struct EqualsNode {
    a: InputPin,
    b: InputPin,
    output: OutputPin,
}

impl Node for EqualsNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let a = ctx.input(self.a);
        let b = ctx.input(self.b);
        let equal = match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => (x - y).abs() < f32::EPSILON,
            _ => a == b,
        };
        ctx.set_output(self.output, equal);
    }
}

/// Selects one of two values; only the selected branch is evaluated
pub struct IfNode {
    condition: InputPin,
    when_true: InputPin,
    when_false: InputPin,
    output: OutputPin,
}

impl Node for IfNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let branch = if ctx.input(self.condition).is_truthy() {
            self.when_true
        } else {
            self.when_false
        };
        let value = ctx.input(branch);
        ctx.set_output(self.output, value);
    }
}

pub(crate) fn register(registry: &NodeTypeRegistry) {
    registry.register_fn(
        NodeTypeInfo::new(node_type("And"), "And")
            .description("Checks if all inputs are true")
            .category(NodeCategory::Logic),
        |_, _, builder| {
            Box::new(AndNode {
                values: builder.input_collection("Values", ValueType::Bool, 2),
                output: builder.output("Result", ValueType::Bool),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Or"), "Or")
            .description("Checks if any input is true")
            .category(NodeCategory::Logic),
        |_, _, builder| {
            Box::new(OrNode {
                values: builder.input_collection("Values", ValueType::Bool, 2),
                output: builder.output("Result", ValueType::Bool),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Not"), "Not")
            .description("Inverts the input")
            .category(NodeCategory::Logic),
        |_, _, builder| {
            Box::new(NotNode {
                input: builder.input("Input", ValueType::Bool),
                output: builder.output("Result", ValueType::Bool),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Equals"), "Equals")
            .description("Checks if the two inputs are equal")
            .category(NodeCategory::Logic),
        |_, _, builder| {
            Box::new(EqualsNode {
                a: builder.input("A", ValueType::Any),
                b: builder.input("B", ValueType::Any),
                output: builder.output("Result", ValueType::Bool),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("If"), "If")
            .description("Outputs one of two values depending on a condition")
            .category(NodeCategory::Logic),
        |_, _, builder| {
            Box::new(IfNode {
                condition: builder.input("Condition", ValueType::Bool),
                when_true: builder.input("True", ValueType::Any),
                when_false: builder.input("False", ValueType::Any),
                output: builder.output("Result", ValueType::Any),
            })
        },
    );
}
