//! Pipe and portsize parameter declarations.
//!
//! Both use the `"<prec|*>:<v,v,...>|..."` syntax. Pipe declarations also
//! accept the `DSPs_y_sizes` key, which adds the listed values to every DSP
//! y-width of the device and makes those widths precisions of the unit.

use std::collections::{BTreeMap, BTreeSet};

use techlib_common::ConfigurationError;
use techlib_model::FunctionalUnit;

use crate::precision::{operation_precisions, READ_COND_UNIT};
use crate::settings::SpecializerSettings;

/// Key of a pipe declaration addressing every DSP y-width.
pub const DSP_Y_SIZES_KEY: &str = "DSPs_y_sizes";

/// Precision → ordered, duplicate-free parameter values.
pub type ParameterLists = BTreeMap<u32, Vec<String>>;

/// Which declaration is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    /// `pipe_parameters`.
    Pipe,
    /// `portsize_parameters`.
    Portsize,
}

impl ParameterField {
    /// The field name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterField::Pipe => "pipe_parameters",
            ParameterField::Portsize => "portsize_parameters",
        }
    }
}

/// Everything derived from a unit's operations before naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitParameters {
    /// Precisions to specialize for, ascending.
    pub precisions: BTreeSet<u32>,
    /// Pipe values per precision.
    pub pipe: ParameterLists,
    /// Port-vector sizes per precision.
    pub portsize: ParameterLists,
    /// `true` iff the unit has operations and all are commutative.
    pub commutative: bool,
}

impl UnitParameters {
    /// Pipe values for `precision`; empty when none were declared.
    pub fn pipe_for(&self, precision: u32) -> &[String] {
        self.pipe.get(&precision).map_or(&[], Vec::as_slice)
    }

    /// Portsize values for `precision`; empty when none were declared.
    pub fn portsize_for(&self, precision: u32) -> &[String] {
        self.portsize.get(&precision).map_or(&[], Vec::as_slice)
    }
}

/// Walks the operations of `unit` in order, accumulating precisions and
/// parsing each operation's declarations against the precisions collected
/// so far.
pub fn collect_parameters(
    unit: &FunctionalUnit,
    is_template: bool,
    settings: &SpecializerSettings,
) -> Result<UnitParameters, ConfigurationError> {
    let mut params = UnitParameters {
        commutative: !unit.operations.is_empty()
            && unit.operations.iter().all(|op| op.commutative),
        ..UnitParameters::default()
    };
    if unit.name == READ_COND_UNIT {
        params.precisions.insert(1);
        return Ok(params);
    }
    for op in &unit.operations {
        params
            .precisions
            .extend(operation_precisions(op, is_template, settings));
        apply_declaration(
            ParameterField::Pipe,
            &op.pipe_parameters,
            &unit.name,
            &mut params.precisions,
            &mut params.pipe,
            &settings.dsp_y_to_x,
        )?;
        apply_declaration(
            ParameterField::Portsize,
            &op.portsize_parameters,
            &unit.name,
            &mut params.precisions,
            &mut params.portsize,
            &settings.dsp_y_to_x,
        )?;
    }
    Ok(params)
}

/// Parses one declaration into `lists`.
pub fn apply_declaration(
    field: ParameterField,
    text: &str,
    unit: &str,
    precisions: &mut BTreeSet<u32>,
    lists: &mut ParameterLists,
    dsp_y_to_x: &BTreeMap<u32, u32>,
) -> Result<(), ConfigurationError> {
    if text.is_empty() {
        return Ok(());
    }
    let malformed = |reason: String| ConfigurationError::MalformedTemplateParameter {
        unit: unit.to_string(),
        field: field.as_str(),
        value: text.to_string(),
        reason,
    };
    for segment in text.split('|') {
        let mut parts = segment.split(':');
        let (Some(key), Some(values), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed(format!("expected one ':' in '{segment}'")));
        };
        let values: Vec<&str> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(malformed(format!("empty parameter list in '{segment}'")));
        }
        let key = key.trim();
        if key == "*" {
            for prec in precisions.iter() {
                push_unique(lists.entry(*prec).or_default(), &values);
            }
        } else if key == DSP_Y_SIZES_KEY && field == ParameterField::Pipe {
            for y in dsp_y_to_x.keys() {
                push_unique(lists.entry(*y).or_default(), &values);
                precisions.insert(*y);
            }
        } else {
            let prec = key
                .parse::<u32>()
                .map_err(|_| malformed(format!("unknown key '{key}'")))?;
            if !precisions.contains(&prec) {
                return Err(malformed(format!("precision {prec} is not supported by the unit")));
            }
            push_unique(lists.entry(prec).or_default(), &values);
        }
    }
    Ok(())
}

fn push_unique(list: &mut Vec<String>, values: &[&str]) {
    for value in values {
        if !list.iter().any(|v| v == value) {
            list.push(value.to_string());
        }
    }
}
