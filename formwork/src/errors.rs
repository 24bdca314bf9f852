// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::assembly::AssemblyError;
use crate::db::errors::ExecutionError;
use crate::form::FormModelError;

/// Represents all the ways loading, editing or saving a form can fail.
#[derive(thiserror::Error, Debug)]
pub enum FormError {
    /// Local validation failed, the message names the offending fields. Blocks compilation.
    #[error("{0}")]
    Validation(String),

    /// Executing a statement against the backend failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Building the form from its metadata failed, no form is exposed.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// A mutation addressed a section, field or child form which does not exist.
    #[error(transparent)]
    Model(#[from] FormModelError),

    /// Another save or load is in flight for this form.
    #[error("form is busy with another save or load")]
    Busy,

    /// No form has been loaded yet.
    #[error("no form loaded")]
    NotLoaded,
}
