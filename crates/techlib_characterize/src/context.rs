//! Commutative result reuse within one specialization tuple.

use techlib_model::{AreaModel, TimeModel};

/// Area and timing read back from one synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Measured area model.
    pub area: AreaModel,
    /// Measured timing model, before per-operation assembly.
    pub time: TimeModel,
}

/// State shared by the variants of one (unit, precision, pipe, portsize) tuple.
///
/// For a commutative unit, pinning any input yields the same circuit up to
/// port order. The first pinned-port measurement is kept and every later
/// variant of the tuple reuses it instead of synthesizing again.
#[derive(Debug, Clone, Default)]
pub struct CharacterizationContext {
    commutative: bool,
    first: Option<Measurement>,
}

impl CharacterizationContext {
    /// Creates the context of one tuple.
    pub fn new(commutative: bool) -> Self {
        Self {
            commutative,
            first: None,
        }
    }

    /// Whether the tuple's unit is commutative.
    pub fn is_commutative(&self) -> bool {
        self.commutative
    }

    /// The measurement later variants take over, if one was recorded.
    pub fn reusable(&self) -> Option<&Measurement> {
        if self.commutative {
            self.first.as_ref()
        } else {
            None
        }
    }

    /// Offers a fresh measurement of the variant pinning `pinned`. Only the
    /// first pinned-port measurement of a commutative tuple is kept.
    pub fn record(&mut self, pinned: Option<usize>, measurement: &Measurement) {
        if self.commutative && pinned.is_some() && self.first.is_none() {
            self.first = Some(measurement.clone());
        }
    }
}
