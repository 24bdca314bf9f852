// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::errors::ExecutionError;
use crate::form::FormModelError;
use crate::schema::{FormId, MetadataError};

/// Errors which abort building a form. No partially assembled form is ever returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// Fetching descriptors failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Reading the record, its child rows or option datasets failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A part of the assembled form tree could not be addressed.
    #[error(transparent)]
    Model(#[from] FormModelError),

    /// The requested record does not exist or was deleted.
    #[error("record {row_id} of form {form_id} does not exist")]
    RecordNotFound {
        /// Form the record was requested for.
        form_id: FormId,

        /// Requested primary key.
        row_id: i64,
    },

    /// A field references a column its table does not have.
    #[error("field {field_id} of form {form_id} references an unknown column")]
    UnknownColumn {
        /// Form of the field.
        form_id: FormId,

        /// Offending field.
        field_id: i64,
    },

    /// A field references a section its form does not have.
    #[error("field {field_id} of form {form_id} references unknown section {section_id}")]
    UnknownSection {
        /// Form of the field.
        form_id: FormId,

        /// Offending field.
        field_id: i64,

        /// Referenced section.
        section_id: i64,
    },
}
