//! Which cells a run characterizes.

use std::collections::BTreeSet;
use std::str::FromStr;

use techlib_common::ConfigurationError;

/// Cells selected for a run.
///
/// Written `component-cell,component-cell,...`: every entry names the same
/// component (the template or unit being characterized) and one of its
/// specializations. `all` or an empty string selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CellSelection {
    /// Every specialization of every unit.
    #[default]
    All,
    /// Some specializations of one component.
    Component {
        /// Template or unit name.
        component: String,
        /// Specialization names.
        cells: BTreeSet<String>,
    },
}

impl CellSelection {
    /// Returns `true` if specializations of `component` are wanted.
    pub fn includes_component(&self, name: &str) -> bool {
        match self {
            CellSelection::All => true,
            CellSelection::Component { component, .. } => component == name,
        }
    }

    /// Returns `true` if the specialization `name` is wanted.
    pub fn includes_cell(&self, name: &str) -> bool {
        match self {
            CellSelection::All => true,
            CellSelection::Component { cells, .. } => cells.contains(name),
        }
    }

    /// The selected component, if restricted to one.
    pub fn component(&self) -> Option<&str> {
        match self {
            CellSelection::All => None,
            CellSelection::Component { component, .. } => Some(component),
        }
    }
}

impl FromStr for CellSelection {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() || text == "all" {
            return Ok(CellSelection::All);
        }
        let invalid = |reason: String| ConfigurationError::InvalidSelection {
            selection: text.to_string(),
            reason,
        };

        let mut component: Option<&str> = None;
        let mut cells = BTreeSet::new();
        for entry in text.split(',') {
            let (name, cell) = match entry.trim().split_once('-') {
                Some((name, cell)) if !name.is_empty() && !cell.is_empty() && !cell.contains('-') => {
                    (name, cell)
                }
                _ => return Err(invalid(format!("'{entry}' is not component-cell"))),
            };
            match component {
                Some(first) if first != name => {
                    return Err(invalid(format!("component '{name}' differs from '{first}'")));
                }
                _ => component = Some(name),
            }
            cells.insert(cell.to_string());
        }

        match component {
            Some(component) => Ok(CellSelection::Component {
                component: component.to_string(),
                cells,
            }),
            None => Err(invalid("no cells".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_everything() {
        let selection: CellSelection = "all".parse().unwrap();
        assert_eq!(selection, CellSelection::All);
        assert!(selection.includes_cell("anything"));
        assert_eq!("".parse::<CellSelection>().unwrap(), CellSelection::All);
    }

    #[test]
    fn component_cells_are_collected() {
        let selection: CellSelection = "AND2-AND2_8_8_8, AND2-AND2_0_8_8".parse().unwrap();
        assert_eq!(selection.component(), Some("AND2"));
        assert!(selection.includes_component("AND2"));
        assert!(!selection.includes_component("OR2"));
        assert!(selection.includes_cell("AND2_0_8_8"));
        assert!(!selection.includes_cell("AND2_8_0_8"));
    }

    #[test]
    fn mixed_components_are_rejected() {
        let err = "AND2-AND2_8_8_8,OR2-OR2_8_8_8".parse::<CellSelection>().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSelection { .. }));
    }

    #[test]
    fn entry_without_separator_is_rejected() {
        assert!("AND2_8_8_8".parse::<CellSelection>().is_err());
        assert!("AND2-".parse::<CellSelection>().is_err());
        assert!("a-b-c".parse::<CellSelection>().is_err());
    }
}
