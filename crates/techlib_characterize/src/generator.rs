//! Boundary to the arithmetic operator generator.

use techlib_backend::AuxiliaryFile;

/// What the driver asks of the generator for one pipelined unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorRequest<'a> {
    /// Base (template) name of the unit.
    pub unit: &'a str,
    /// Input precision.
    pub input_width: u32,
    /// Output precision after the doubled/halved transform.
    pub output_width: u32,
    /// Requested pipe parameter.
    pub pipe: &'a str,
}

/// A generated operator circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedOperator {
    /// Pipeline depth the generator actually produced.
    pub pipeline_depth: u32,
    /// HDL files to hand to the backend.
    pub files: Vec<AuxiliaryFile>,
}

/// Produces HDL for units whose description is [`Generated`](techlib_model::HdlDescription::Generated).
pub trait OperatorGenerator: Send + Sync {
    /// The generated operator, or `None` when the generator does not know the unit.
    fn generate(&self, request: &GeneratorRequest<'_>) -> Option<GeneratedOperator>;
}

/// A generator that knows no operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGenerator;

impl OperatorGenerator for NoGenerator {
    fn generate(&self, _request: &GeneratorRequest<'_>) -> Option<GeneratedOperator> {
        None
    }
}
