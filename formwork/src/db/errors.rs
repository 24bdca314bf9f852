// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors returned when running statements against the backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The backend rejected the statement or could not be reached.
    #[error("{0}")]
    Backend(String),

    /// The backend answered, but not with what the statement promised to return.
    #[error("unexpected response from backend: {0}")]
    UnexpectedResponse(String),
}
