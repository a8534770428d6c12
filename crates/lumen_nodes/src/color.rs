//! Color nodes
//!
//! Colors are RGBA with every channel in 0..1.

use crate::node_type;
use lumen_graph::{
    EvalContext, InputPin, Node, NodeCategory, NodeTypeInfo, NodeTypeRegistry, OutputPin, Value,
    ValueType,
};

/// Linear interpolation between two colors, `factor` clamped to 0..1
pub fn mix(a: [f32; 4], b: [f32; 4], factor: f32) -> [f32; 4] {
    let t = factor.clamp(0.0, 1.0);
    let mut out = [0.0; 4];
    for (channel, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *channel = x + (y - x) * t;
    }
    out
}

/// Builds a color from separate channels
pub struct RgbColorNode {
    r: InputPin,
    g: InputPin,
    b: InputPin,
    a: InputPin,
    output: OutputPin,
}

impl Node for RgbColorNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let mut channel = |pin| ctx.input(pin).as_float().unwrap_or(0.0).clamp(0.0, 1.0);
        let color = [channel(self.r), channel(self.g), channel(self.b), channel(self.a)];
        ctx.set_output(self.output, Value::Color(color));
    }
}

/// Blends two colors
pub struct ColorMixNode {
    a: InputPin,
    b: InputPin,
    factor: InputPin,
    output: OutputPin,
}

impl Node for ColorMixNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let white = ValueType::Color.default_value().as_color().unwrap_or([1.0; 4]);
        let a = ctx.input(self.a).as_color().unwrap_or(white);
        let b = ctx.input(self.b).as_color().unwrap_or(white);
        let factor = ctx.input(self.factor).as_float().unwrap_or(0.5);
        ctx.set_output(self.output, Value::Color(mix(a, b, factor)));
    }
}

pub(crate) fn register(registry: &NodeTypeRegistry) {
    registry.register_fn(
        NodeTypeInfo::new(node_type("RgbColor"), "RGB color")
            .description("Creates a color from red, green, blue and alpha channels")
            .category(NodeCategory::Color),
        |_, _, builder| {
            builder.name("RGB color");
            Box::new(RgbColorNode {
                r: builder.input("R", ValueType::Float),
                g: builder.input("G", ValueType::Float),
                b: builder.input("B", ValueType::Float),
                a: builder.input_with_default("A", ValueType::Float, Value::Float(1.0)),
                output: builder.output("Color", ValueType::Color),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("ColorMix"), "Color mix")
            .description("Mixes two colors, 0 is all A and 1 is all B")
            .category(NodeCategory::Color),
        |_, _, builder| {
            builder.name("Color mix");
            Box::new(ColorMixNode {
                a: builder.input("A", ValueType::Color),
                b: builder.input("B", ValueType::Color),
                factor: builder.input_with_default("Factor", ValueType::Float, Value::Float(0.5)),
                output: builder.output("Color", ValueType::Color),
            })
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix() {
        let black = [0.0, 0.0, 0.0, 1.0];
        let white = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(mix(black, white, 0.0), black);
        assert_eq!(mix(black, white, 1.0), white);
        assert_eq!(mix(black, white, 0.5), [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(mix(black, white, 7.0), white);
    }
}
