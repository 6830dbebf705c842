//! Technology library storage.
//!
//! [`LibraryStore`] holds the nodes of one library and merges measured
//! results into them; [`TechnologyManager`] orders several libraries and
//! resolves unit names across them. The [`document`] module persists both
//! as JSON.

pub mod document;
pub mod manager;
pub mod store;

pub use document::{
    read_characterization, read_technology, write_characterization, write_technology,
    CharacterizationDocument, DeviceElement, LibraryDocument,
};
pub use manager::TechnologyManager;
pub use store::LibraryStore;
