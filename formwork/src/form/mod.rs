// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory form model.
//!
//! A [`Form`] represents one editable record of a backend table. It owns its [`Section`]s which
//! own their [`Field`]s, a field whose column expands into a nested table owns a child form in
//! turn. The form tracks which fields were edited, validates itself and compiles its current
//! state into select, save and delete statements.
mod compile;
mod errors;
mod field;
mod model;
mod section;
mod validation;
mod value;

pub use compile::{AttachedFile, CompiledStatement};
pub(crate) use compile::compile_link_options;
pub use errors::FormModelError;
pub use field::{DropdownDataset, DropdownOption, Field};
pub use model::{
    CloneOptions, FieldPath, FieldProperty, Form, FormProperty, LinkedFieldPath, ParentRef,
    SectionProperty, PARENT_ID_PLACEHOLDER,
};
pub(crate) use model::{column_name_of, label_alias};
pub use section::Section;
pub use validation::ValidationResult;
pub use value::Value;
