// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::schema::FormId;

/// Errors returned by metadata providers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    /// No form definition is known under this id.
    #[error("unknown form {0}")]
    UnknownForm(FormId),

    /// No column definitions are known for this table.
    #[error("unknown table {0}")]
    UnknownTable(i64),

    /// The metadata service could not be reached or returned garbage.
    #[error("metadata service failed: {0}")]
    Unavailable(String),
}
