//! Ordered collection of technology libraries.

use std::path::Path;

use techlib_common::{ConfigurationError, ConsistencyViolation, TechResult};
use techlib_model::{DeviceKind, TechnologyNode};

use crate::document::{self, LibraryDocument};
use crate::store::LibraryStore;

/// All technology libraries known to a run, searched in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TechnologyManager {
    libraries: Vec<LibraryStore>,
}

impl TechnologyManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every library of a technology document, appending them in document order.
    pub fn load(&mut self, path: &Path, kind: DeviceKind) -> TechResult<()> {
        for library in document::read_technology(path, kind)? {
            self.add_library(library);
        }
        Ok(())
    }

    /// Appends a library, replacing any library of the same name in place.
    pub fn add_library(&mut self, library: LibraryStore) {
        match self.libraries.iter_mut().find(|l| l.name() == library.name()) {
            Some(slot) => *slot = library,
            None => self.libraries.push(library),
        }
    }

    /// Adds a node to `library`, creating the library if needed.
    pub fn add(&mut self, node: TechnologyNode, library: &str) -> Result<(), ConsistencyViolation> {
        self.library_or_create(library).add(node)
    }

    fn library_or_create(&mut self, name: &str) -> &mut LibraryStore {
        let index = match self.libraries.iter().position(|l| l.name() == name) {
            Some(index) => index,
            None => {
                self.libraries.push(LibraryStore::new(name));
                self.libraries.len() - 1
            }
        };
        &mut self.libraries[index]
    }

    /// Looks up a library by name.
    pub fn library(&self, name: &str) -> Option<&LibraryStore> {
        self.libraries.iter().find(|l| l.name() == name)
    }

    /// Looks up a library by name for mutation.
    pub fn library_mut(&mut self, name: &str) -> Option<&mut LibraryStore> {
        self.libraries.iter_mut().find(|l| l.name() == name)
    }

    /// Libraries in search order.
    pub fn libraries(&self) -> impl Iterator<Item = &LibraryStore> {
        self.libraries.iter()
    }

    /// Library names in search order.
    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(LibraryStore::name)
    }

    /// The name of the first library containing `unit`.
    pub fn library_of(&self, unit: &str) -> Option<&str> {
        self.libraries
            .iter()
            .find(|l| l.contains(unit))
            .map(LibraryStore::name)
    }

    /// The first node named `unit` across all libraries.
    pub fn find(&self, unit: &str) -> Option<&TechnologyNode> {
        self.libraries.iter().find_map(|l| l.get(unit))
    }

    /// The node named `unit` in `library`, or a configuration error naming what is missing.
    pub fn resolve(&self, library: &str, unit: &str) -> Result<&TechnologyNode, ConfigurationError> {
        self.library(library)
            .and_then(|l| l.get(unit))
            .ok_or_else(|| ConfigurationError::UnknownUnit(format!("{library}/{unit}")))
    }

    /// Merges a measured node into `library`.
    pub fn update(&mut self, library: &str, partial: &TechnologyNode) -> Result<(), ConsistencyViolation> {
        self.library_mut(library)
            .ok_or_else(|| ConsistencyViolation::UnknownNode(format!("{library}/{}", partial.name())))?
            .update(partial)
    }

    /// Serialized libraries holding only nodes accepted by `filter`;
    /// libraries left empty are dropped.
    pub fn export_filtered(
        &self,
        filter: impl Fn(&str, &TechnologyNode) -> bool,
    ) -> Vec<LibraryDocument> {
        self.libraries
            .iter()
            .map(|l| l.export_filtered(|node| filter(l.name(), node)))
            .filter(|doc| !doc.nodes.is_empty())
            .collect()
    }

    /// Writes every library to one technology document.
    pub fn save(&self, path: &Path) -> TechResult<()> {
        document::write_technology(path, self.libraries.iter())
    }
}
