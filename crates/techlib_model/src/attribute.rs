//! Typed attributes attached to libraries and units.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    /// A double-precision number.
    Float64(f64),
    /// A boolean flag.
    Boolean(bool),
    /// A 32-bit signed integer.
    Int32(i32),
    /// Free text.
    String(String),
}

impl AttributeValue {
    /// The document type tag for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Float64(_) => "float64",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::Int32(_) => "int32",
            AttributeValue::String(_) => "string",
        }
    }

    /// Parses `text` as a value of the given document type tag.
    ///
    /// Returns `None` if the tag is unknown or the text does not parse.
    pub fn parse(type_name: &str, text: &str) -> Option<Self> {
        let text = text.trim();
        match type_name {
            "float64" => text.parse().ok().map(AttributeValue::Float64),
            "boolean" => match text {
                "1" | "true" | "TRUE" | "True" => Some(AttributeValue::Boolean(true)),
                "0" | "false" | "FALSE" | "False" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            "int32" => text.parse().ok().map(AttributeValue::Int32),
            "string" => Some(AttributeValue::String(text.to_string())),
            _ => None,
        }
    }

    /// The value as a float, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float64(v) => Some(*v),
            AttributeValue::Int32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Float64(v) => write!(f, "{v}"),
            AttributeValue::Boolean(v) => write!(f, "{}", if *v { "1" } else { "0" }),
            AttributeValue::Int32(v) => write!(f, "{v}"),
            AttributeValue::String(v) => f.write_str(v),
        }
    }
}

/// A named attribute: either one value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    /// A scalar attribute.
    Value(AttributeValue),
    /// A list attribute.
    List(Vec<AttributeValue>),
}

impl Attribute {
    /// The scalar value, if this is not a list.
    pub fn value(&self) -> Option<&AttributeValue> {
        match self {
            Attribute::Value(v) => Some(v),
            Attribute::List(_) => None,
        }
    }
}

impl From<AttributeValue> for Attribute {
    fn from(value: AttributeValue) -> Self {
        Attribute::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_each_type() {
        assert_eq!(
            AttributeValue::parse("float64", " 12.5 "),
            Some(AttributeValue::Float64(12.5))
        );
        assert_eq!(
            AttributeValue::parse("boolean", "1"),
            Some(AttributeValue::Boolean(true))
        );
        assert_eq!(
            AttributeValue::parse("int32", "-3"),
            Some(AttributeValue::Int32(-3))
        );
        assert_eq!(
            AttributeValue::parse("string", "vivado"),
            Some(AttributeValue::String("vivado".to_string()))
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(AttributeValue::parse("float64", "wide"), None);
        assert_eq!(AttributeValue::parse("boolean", "maybe"), None);
        assert_eq!(AttributeValue::parse("complex", "1"), None);
    }

    #[test]
    fn display_booleans_as_digits() {
        assert_eq!(AttributeValue::Boolean(false).to_string(), "0");
        assert_eq!(AttributeValue::Int32(7).as_f64(), Some(7.0));
    }
}
