// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::Row;
use crate::form::Field;

/// Ordered group of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Identifier of the section definition.
    pub id: i64,

    /// Section heading.
    pub label: String,

    /// Fields in display order.
    pub fields: Vec<Field>,

    /// Row set of a child table shown in table mode, not set when the section holds a single
    /// record.
    pub child_row_values: Option<Vec<Row>>,
}

impl Section {
    /// Returns an empty section.
    pub fn new(id: i64, label: &str) -> Self {
        Self {
            id,
            label: label.to_owned(),
            fields: Vec::new(),
            child_row_values: None,
        }
    }
}
