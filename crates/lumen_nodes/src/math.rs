//! Math nodes

use crate::node_type;
use core::fmt;
use core::str::FromStr;
use lumen_graph::{
    EvalContext, InputPin, InputPinCollection, Node, NodeCategory, NodeTypeInfo, NodeTypeRegistry,
    OutputPin, OutputPinCollection, Value, ValueType,
};

/// Adds any number of floats
pub struct SumNode {
    values: InputPinCollection,
    output: OutputPin,
}

impl Node for SumNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let sum: f32 = ctx.inputs(self.values).iter().filter_map(Value::as_float).sum();
        ctx.set_output(self.output, sum);
    }
}

/// Multiplies any number of floats
pub struct MultiplyNode {
    values: InputPinCollection,
    output: OutputPin,
}

impl Node for MultiplyNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let product: f32 = ctx.inputs(self.values).iter().filter_map(Value::as_float).product();
        ctx.set_output(self.output, product);
    }
}

/// Limits a float to a range
pub struct ClampNode {
    value: InputPin,
    min: InputPin,
    max: InputPin,
    output: OutputPin,
}

impl Node for ClampNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let value = ctx.input(self.value).as_float().unwrap_or(0.0);
        let min = ctx.input(self.min).as_float().unwrap_or(0.0);
        let max = ctx.input(self.max).as_float().unwrap_or(1.0);
        // An inverted range collapses to its lower bound
        let clamped = if min > max { min } else { value.clamp(min, max) };
        ctx.set_output(self.output, clamped);
    }
}

/// Evenly spaced values from `From` to `To`, one per output
pub struct SpreadNode {
    from: InputPin,
    to: InputPin,
    values: OutputPinCollection,
}

impl Node for SpreadNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let from = ctx.input(self.from).as_float().unwrap_or(0.0);
        let to = ctx.input(self.to).as_float().unwrap_or(1.0);
        let count = ctx.output_count(self.values);
        for index in 0..count {
            let t = if count > 1 { index as f32 / (count - 1) as f32 } else { 0.0 };
            ctx.set_output_at(self.values, index, from + (to - from) * t);
        }
    }
}

/// Easing curve, mapping progress in 0..1 to an eased 0..1
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let f = t - 1.0;
                f * f * f + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let f = 2.0 * t - 2.0;
                    0.5 * f * f * f + 1.0
                }
            }
            Easing::SineInOut => -(std::f32::consts::PI * t).cos() / 2.0 + 0.5,
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Easing::Linear),
            "quadin" => Ok(Easing::QuadIn),
            "quadout" => Ok(Easing::QuadOut),
            "quadinout" => Ok(Easing::QuadInOut),
            "cubicin" => Ok(Easing::CubicIn),
            "cubicout" => Ok(Easing::CubicOut),
            "cubicinout" => Ok(Easing::CubicInOut),
            "sineinout" => Ok(Easing::SineInOut),
            _ => Err(format!("Unknown easing: {}", s)),
        }
    }
}

/// Applies the easing named in storage to a progress value
pub struct EasingNode {
    time: InputPin,
    output: OutputPin,
    /// Storage text the current curve was parsed from
    curve: Option<String>,
    easing: Easing,
}

impl Node for EasingNode {
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) {
        let curve = ctx
            .storage()
            .and_then(|storage| storage.as_text().ok())
            .map(str::to_string);
        if curve != self.curve {
            self.easing = match curve.as_deref().map(str::parse::<Easing>) {
                Some(Ok(easing)) => easing,
                Some(Err(err)) => {
                    log::warn!("Easing node {:?}: {}, using linear", ctx.key(), err);
                    Easing::Linear
                }
                None => Easing::Linear,
            };
            self.curve = curve;
        }

        let t = ctx.input(self.time).as_float().unwrap_or(0.0);
        ctx.set_output(self.output, self.easing.apply(t));
    }
}

pub(crate) fn register(registry: &NodeTypeRegistry) {
    registry.register_fn(
        NodeTypeInfo::new(node_type("Sum"), "Sum")
            .description("Sums the connected numeric values")
            .category(NodeCategory::Math),
        |_, _, builder| {
            builder.name("Sum");
            Box::new(SumNode {
                values: builder.input_collection("Values", ValueType::Float, 2),
                output: builder.output("Sum", ValueType::Float),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Multiply"), "Multiply")
            .description("Multiplies the connected numeric values")
            .category(NodeCategory::Math),
        |_, _, builder| {
            builder.name("Multiply");
            Box::new(MultiplyNode {
                values: builder.input_collection("Values", ValueType::Float, 2),
                output: builder.output("Product", ValueType::Float),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Clamp"), "Clamp")
            .description("Clamps the value to be in between min and max")
            .category(NodeCategory::Math),
        |_, _, builder| {
            builder.name("Clamp");
            Box::new(ClampNode {
                value: builder.input("Value", ValueType::Float),
                min: builder.input_with_default("Min", ValueType::Float, Value::Float(0.0)),
                max: builder.input_with_default("Max", ValueType::Float, Value::Float(1.0)),
                output: builder.output("Result", ValueType::Float),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Easing"), "Easing")
            .description("Eases a 0..1 progress value along the curve named in storage")
            .category(NodeCategory::Math),
        |_, _, builder| {
            builder.name("Easing");
            Box::new(EasingNode {
                time: builder.input("Time", ValueType::Float),
                output: builder.output("Result", ValueType::Float),
                curve: None,
                easing: Easing::default(),
            })
        },
    );

    registry.register_fn(
        NodeTypeInfo::new(node_type("Spread"), "Spread")
            .description("Spreads values evenly from From to To across its outputs")
            .category(NodeCategory::Math),
        |_, _, builder| {
            builder.name("Spread");
            Box::new(SpreadNode {
                from: builder.input_with_default("From", ValueType::Float, Value::Float(0.0)),
                to: builder.input_with_default("To", ValueType::Float, Value::Float(1.0)),
                values: builder.output_collection("Values", ValueType::Float, 2),
            })
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::QuadIn,
            Easing::QuadOut,
            Easing::QuadInOut,
            Easing::CubicIn,
            Easing::CubicOut,
            Easing::CubicInOut,
            Easing::SineInOut,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-6, "{} at 0", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{} at 1", easing);
        }
    }

    #[test]
    fn test_easing_shapes() {
        assert!((Easing::QuadIn.apply(0.5) - 0.25).abs() < 1e-6);
        assert!((Easing::QuadOut.apply(0.5) - 0.75).abs() < 1e-6);
        assert!((Easing::SineInOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn test_easing_names() {
        assert_eq!("QuadInOut".parse::<Easing>(), Ok(Easing::QuadInOut));
        assert_eq!(" cubicout ".parse::<Easing>(), Ok(Easing::CubicOut));
        assert!("Bounce".parse::<Easing>().is_err());
        assert_eq!(Easing::SineInOut.to_string(), "SineInOut");
    }
}
