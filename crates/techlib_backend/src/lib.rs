//! Backend synthesis flows.
//!
//! A [`BackendFlow`] turns a [`SynthesisRequest`] (one wrapper netlist) into
//! a [`ReportBundle`] by running an external tool, then reads area and
//! timing models back out of the bundle. [`ToolFlow`] is the generic
//! process-based flow; the report syntax of each vendor is a
//! [`ReportDialect`].

#![warn(missing_docs)]

pub mod design_compiler;
pub mod dialect;
pub mod flow;
pub mod process;
pub mod tool;
pub mod vivado;
pub mod xilinx_map;

pub use design_compiler::DesignCompiler;
pub use dialect::{ReportDialect, ReportFile, ReportKind};
pub use flow::{AuxiliaryFile, BackendFlow, ReportBundle, SynthesisRequest};
pub use process::{run_tool, ToolOutput};
pub use tool::{flow_for_config, ToolFlow};
pub use vivado::Vivado;
pub use xilinx_map::XilinxMap;
