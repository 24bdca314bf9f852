// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors returned when addressing parts of a form which do not exist.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormModelError {
    /// No section at this index.
    #[error("form has no section {0}")]
    SectionNotFound(usize),

    /// No field at this index.
    #[error("section {0} has no field {1}")]
    FieldNotFound(usize, usize),

    /// The field holds a scalar value, not a nested form.
    #[error("field {1} of section {0} is not a child form")]
    NotAChildForm(usize, usize),

    /// The field expands into a child form and can't hold a value itself.
    #[error("field {1} of section {0} is a child form and holds no value")]
    IsAChildForm(usize, usize),
}
