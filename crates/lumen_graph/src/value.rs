//! Value - Runtime values for node scripts
//!
//! Values are the data that flows between pins. Every pin declares a
//! [`ValueType`]; [`ValueType::Any`] is the wildcard.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Type information for a pin or value
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 32-bit float
    Float,
    /// String
    String,
    /// Color (RGBA, 0..1)
    Color,
    /// Homogeneous list of values
    List(Box<ValueType>),
    /// Any type (wildcard)
    Any,
}

impl ValueType {
    /// Check whether a value produced by `source` may flow into a pin of this type.
    ///
    /// The wildcard is accepted on either side. Integers widen into floats.
    pub fn is_assignable_from(&self, source: &ValueType) -> bool {
        match (self, source) {
            (ValueType::Any, _) | (_, ValueType::Any) => true,
            (ValueType::Float, ValueType::Int) => true,
            (ValueType::List(target), ValueType::List(source)) => target.is_assignable_from(source),
            (target, source) => target == source,
        }
    }

    /// Check if this is the wildcard type
    pub fn is_any(&self) -> bool {
        matches!(self, ValueType::Any)
    }

    /// Get a default value for this type
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::Color => Value::Color([1.0, 1.0, 1.0, 1.0]),
            ValueType::List(_) => Value::List(Vec::new()),
            ValueType::Any => Value::None,
        }
    }

    /// Name written into persisted records
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl Default for ValueType {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "Bool"),
            ValueType::Int => write!(f, "Int"),
            ValueType::Float => write!(f, "Float"),
            ValueType::String => write!(f, "String"),
            ValueType::Color => write!(f, "Color"),
            ValueType::List(element) => write!(f, "List<{}>", element),
            ValueType::Any => write!(f, "Any"),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("List<").and_then(|rest| rest.strip_suffix('>')) {
            return Ok(ValueType::List(Box::new(inner.parse()?)));
        }
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueType::Bool),
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "numeric" | "number" => Ok(ValueType::Float),
            "string" | "text" => Ok(ValueType::String),
            "color" | "colour" => Ok(ValueType::Color),
            "any" | "object" => Ok(ValueType::Any),
            _ => Err(format!("Unknown value type: {}", s)),
        }
    }
}

/// Runtime value
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// String
    String(String),
    /// Color (RGBA)
    Color([f32; 4]),
    /// List of values
    List(Vec<Value>),
}

impl Value {
    /// Get the type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Color(_) => ValueType::Color,
            Value::List(items) => {
                let element = items.first().map(|v| v.value_type()).unwrap_or(ValueType::Any);
                ValueType::List(Box::new(element))
            }
        }
    }

    /// Convert into a value a pin of type `target` can hold.
    ///
    /// Values the target cannot represent become the target's default.
    pub fn coerce_to(self, target: &ValueType) -> Value {
        match (target, self) {
            (ValueType::Any, value) => value,
            (ValueType::Float, Value::Int(i)) => Value::Float(i as f32),
            (ValueType::List(element), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| v.coerce_to(element)).collect())
            }
            (target, value) if target.is_assignable_from(&value.value_type()) && !value.is_none() => value,
            (target, _) => target.default_value(),
        }
    }

    /// Check if this is the empty value
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Try to convert to int
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i32),
            Value::Bool(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as color
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Check if the value is "truthy"
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Color(_) => true,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => (a - b).abs() < f32::EPSILON,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Color([r, g, b, a]) => write!(f, "rgba({}, {}, {}, {})", r, g, b, a),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
