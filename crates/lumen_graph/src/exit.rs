//! Exit node
//!
//! Every script owns exactly one exit node. It has a single input of the
//! script's result type and captures whatever reaches it on each run.

use crate::eval::EvalContext;
use crate::node::{Node, NodeBuilder};
use crate::pin::InputPin;
use crate::value::{Value, ValueType};

/// Type name the exit node is persisted under
pub const EXIT_NODE_TYPE: &str = "ExitNode";

/// Name of the exit node's input pin
pub const EXIT_INPUT_PIN: &str = "Output";

/// Terminal node holding the script's result
pub struct ExitNode {
    input: InputPin,
    value: Value,
}

impl ExitNode {
    pub fn new(builder: &mut NodeBuilder, result_type: &ValueType) -> Self {
        builder.name("Exit node").description("Outputs the result of the script");
        let input = builder.input(EXIT_INPUT_PIN, result_type.clone());
        Self {
            input,
            value: result_type.default_value(),
        }
    }

    pub fn input(&self) -> InputPin {
        self.input
    }
}

impl Node for ExitNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        self.value = ctx.input(self.input);
    }

    fn result(&self) -> Option<&Value> {
        Some(&self.value)
    }
}
