//! The precision rule.

use techlib_model::Operation;

use crate::settings::SpecializerSettings;

/// Unit whose only meaningful precision is a single bit.
pub const READ_COND_UNIT: &str = "read_cond_FU";

/// Precisions contributed by one operation.
///
/// Declared precisions are taken as-is. A type declared without precisions
/// contributes the template widths for templates and the concrete widths
/// otherwise. An operation declaring no types at all contributes the
/// concrete widths.
pub fn operation_precisions(
    op: &Operation,
    is_template: bool,
    settings: &SpecializerSettings,
) -> Vec<u32> {
    if op.supported_types.is_empty() {
        return settings.concrete_widths.clone();
    }
    let mut precisions = Vec::new();
    for precs in op.supported_types.values() {
        if precs.is_empty() {
            let defaults = if is_template {
                &settings.template_widths
            } else {
                &settings.concrete_widths
            };
            precisions.extend_from_slice(defaults);
        } else {
            precisions.extend_from_slice(precs);
        }
    }
    precisions
}

/// Smallest of {1, 8, 16, 32, 64, 128, 256, 512} not below `precision`,
/// saturating at 512.
pub fn resize_to_standard(precision: u32) -> u32 {
    const STANDARD: [u32; 8] = [1, 8, 16, 32, 64, 128, 256, 512];
    STANDARD
        .into_iter()
        .find(|&w| precision <= w)
        .unwrap_or(512)
}
