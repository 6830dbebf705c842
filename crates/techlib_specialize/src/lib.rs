//! Enumeration and instantiation of template specializations.
//!
//! For each template (or concrete unit) of a library, [`plan_unit`] derives
//! the precision set, the pipe and portsize parameter lists and the
//! constant-pinned variants, and names every resulting specialization.
//! Planning is pure; [`materialize`] then registers the instances a plan
//! needs that the library does not hold yet.

#![warn(missing_docs)]

pub mod naming;
pub mod params;
pub mod plan;
pub mod precision;
pub mod settings;

pub use plan::{materialize, plan_library, plan_unit, Specialization, SpecializationGroup, SpecializationPlan};
pub use settings::SpecializerSettings;
