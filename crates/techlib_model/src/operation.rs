//! Operations implemented by a functional unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time::TimeModel;

/// Supported type name → supported precisions. An empty precision list means
/// any precision is accepted (default widths apply during enumeration).
pub type SupportedTypes = BTreeMap<String, Vec<u32>>;

/// One operation a functional unit can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The operation name (e.g. `plus_expr`, `STORE`).
    pub name: String,
    /// Whether the operand order is irrelevant.
    #[serde(default)]
    pub commutative: bool,
    /// Whether the operation has a fixed latency.
    #[serde(default = "default_bounded")]
    pub bounded: bool,
    /// Whether the unit registers its primary inputs internally.
    #[serde(default)]
    pub primary_inputs_registered: bool,
    /// Supported operand types and their precisions.
    #[serde(default)]
    pub supported_types: SupportedTypes,
    /// Raw `"<prec|*>:<list>|..."` pipeline parameter declaration.
    #[serde(default)]
    pub pipe_parameters: String,
    /// Raw `"<prec|*>:<list>|..."` port-vector size declaration.
    #[serde(default)]
    pub portsize_parameters: String,
    /// The measured timing, absent until characterization completes.
    #[serde(default)]
    pub time: Option<TimeModel>,
}

fn default_bounded() -> bool {
    true
}

impl Operation {
    /// Creates a bounded, non-commutative operation with no type restrictions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commutative: false,
            bounded: true,
            primary_inputs_registered: false,
            supported_types: SupportedTypes::new(),
            pipe_parameters: String::new(),
            portsize_parameters: String::new(),
            time: None,
        }
    }

    /// Returns `true` if `type_name` is accepted by this operation.
    pub fn supports_type(&self, type_name: &str) -> bool {
        self.supported_types.is_empty() || self.supported_types.contains_key(type_name)
    }

    /// Returns `true` if `type_name` at `precision` is accepted by this operation.
    pub fn supports(&self, type_name: &str, precision: u32) -> bool {
        if self.supported_types.is_empty() {
            return true;
        }
        match self.supported_types.get(type_name) {
            None => false,
            Some(precs) => precs.is_empty() || precs.contains(&precision),
        }
    }

    /// Execution time of the attached timing model, or 0 when unmeasured.
    pub fn execution_time(&self) -> f64 {
        self.time.as_ref().map_or(0.0, TimeModel::execution_time)
    }
}

/// Parses a `"int:8,16|real:*"` supported-types declaration.
///
/// Errors describe the offending segment; the caller wraps them into a
/// configuration error with document context.
pub fn parse_supported_types(text: &str) -> Result<SupportedTypes, String> {
    let mut types = SupportedTypes::new();
    if text.trim().is_empty() {
        return Ok(types);
    }
    for segment in text.split('|') {
        if segment.is_empty() {
            return Err(format!("empty type description in \"{text}\""));
        }
        let parts: Vec<&str> = segment.split(':').collect();
        if parts.len() != 2 {
            return Err(format!("expected `type:precisions` around \"{segment}\""));
        }
        let type_name = parts[0].trim();
        if type_name.is_empty() {
            return Err(format!("missing type name in \"{segment}\""));
        }
        let mut precs = Vec::new();
        if parts[1].trim() != "*" {
            for prec in parts[1].split(',').map(str::trim) {
                if prec.is_empty() {
                    break;
                }
                let value = prec
                    .parse::<u32>()
                    .map_err(|_| format!("invalid precision '{prec}' in \"{segment}\""))?;
                precs.push(value);
            }
        }
        types.insert(type_name.to_string(), precs);
    }
    Ok(types)
}

/// Formats supported types back into the `"int:8,16|real:*"` syntax.
pub fn format_supported_types(types: &SupportedTypes) -> String {
    types
        .iter()
        .map(|(name, precs)| {
            if precs.is_empty() {
                format!("{name}:*")
            } else {
                let list: Vec<String> = precs.iter().map(u32::to_string).collect();
                format!("{name}:{}", list.join(","))
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mixed_declaration() {
        let types = parse_supported_types("INT:8,16|REAL:*").unwrap();
        assert_eq!(types["INT"], vec![8, 16]);
        assert!(types["REAL"].is_empty());
        assert_eq!(format_supported_types(&types), "INT:8,16|REAL:*");
    }

    #[test]
    fn parse_empty_is_unrestricted() {
        assert!(parse_supported_types("").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_supported_types("INT").is_err());
        assert!(parse_supported_types("INT:8||REAL:*").is_err());
        assert!(parse_supported_types(":8").is_err());
        assert!(parse_supported_types("INT:eight").is_err());
    }

    #[test]
    fn supports_checks_precision() {
        let mut op = Operation::new("plus_expr");
        assert!(op.supports("INT", 13));
        op.supported_types = parse_supported_types("INT:8,16|REAL:*").unwrap();
        assert!(op.supports("INT", 8));
        assert!(!op.supports("INT", 32));
        assert!(op.supports("REAL", 64));
        assert!(!op.supports("UINT", 8));
        assert!(op.supports_type("REAL"));
    }

    #[test]
    fn new_operation_is_bounded() {
        let op = Operation::new("STORE");
        assert!(op.bounded);
        assert!(!op.commutative);
        assert_eq!(op.execution_time(), 0.0);
    }
}
