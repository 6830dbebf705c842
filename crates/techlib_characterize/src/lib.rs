//! Characterization of technology library cells.
//!
//! For every specialization selected for a run, the [`Driver`] builds a
//! register-isolated measurement wrapper, synthesizes it through a
//! [`BackendFlow`](techlib_backend::BackendFlow) and folds the measured area
//! and timing back into the cell. [`fix_characterization`] then corrects
//! cells whose measurement is noise, and [`BatchRunner`] drives the whole
//! pipeline over a worker pool.

#![warn(missing_docs)]

pub mod batch;
pub mod cancel;
pub mod context;
pub mod driver;
pub mod fix;
pub mod generator;
pub mod memory;
pub mod selection;
pub mod settings;
pub mod wrapper;

pub use batch::{device_element, BatchOutcome, BatchRunner, BatchSummary, JobFailure};
pub use cancel::CancellationToken;
pub use context::{CharacterizationContext, Measurement};
pub use driver::{assemble_time, CharacterizationJob, Characterized, Driver};
pub use fix::{fix_characterization, fix_proxies, is_trivial, FixReport};
pub use generator::{GeneratedOperator, GeneratorRequest, NoGenerator, OperatorGenerator};
pub use selection::CellSelection;
pub use settings::CharacterizationSettings;
pub use wrapper::{build_wrapper, wrapper_name, Wrapper, WrapperRequest};
