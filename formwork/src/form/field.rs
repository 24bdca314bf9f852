// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::form::{Form, Value};
use crate::schema::{ColumnDescriptor, DataType, FormId};

/// One selectable option of a link or choice column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    /// Value stored in the field when this option gets selected.
    pub id: String,

    /// Label shown to the user.
    pub label: String,
}

impl DropdownOption {
    /// Returns a new option.
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Option dataset of a link or choice column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownDataset {
    /// All options in display order.
    pub options: Vec<DropdownOption>,
}

impl DropdownDataset {
    /// Returns a dataset holding the given options.
    pub fn new(options: Vec<DropdownOption>) -> Self {
        Self { options }
    }

    /// Parses the comma-separated option string of a choice column. Ids and labels are the same.
    pub fn from_choice_options(options: &str) -> Self {
        Self::new(
            options
                .split(',')
                .map(str::trim)
                .filter(|option| !option.is_empty())
                .map(|option| DropdownOption::new(option, option))
                .collect(),
        )
    }

    /// Returns the label of an option.
    pub fn label_for(&self, id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.id == id)
            .map(|option| option.label.as_str())
    }
}

/// Live value holder for one column within a form.
///
/// A field whose column expands into a nested table carries a child form instead of a scalar
/// value. For link fields `value` always holds the target row's primary key (or the list of keys
/// for multi-value links), the human readable label is kept in `label_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Identifier of the field definition.
    pub id: i64,

    /// Label shown next to the input.
    pub label: String,

    /// Optional helper text.
    pub caption: Option<String>,

    /// Current value.
    pub value: Value,

    /// Label of the linked record(s) for link fields.
    pub label_value: Option<String>,

    /// File name of binary fields.
    pub file_name: Option<String>,

    /// Column this field is bound to.
    pub column: ColumnDescriptor,

    /// Nested form, set iff the column expands into a child table.
    pub child_form: Option<Box<Form>>,

    /// Options of link and choice fields.
    pub dropdown: Option<DropdownDataset>,

    /// Form owning this field.
    pub form_id: FormId,
}

impl Field {
    /// Returns a new field holding no value.
    pub fn new(id: i64, label: &str, column: ColumnDescriptor, form_id: FormId) -> Self {
        Self {
            id,
            label: label.to_owned(),
            caption: None,
            value: Value::Null,
            label_value: None,
            file_name: None,
            column,
            child_form: None,
            dropdown: None,
            form_id,
        }
    }

    /// Returns true if this field expands into a nested child form.
    pub fn is_child_form(&self) -> bool {
        self.child_form.is_some()
    }

    /// Returns true if the field takes part in validation and gets shown to the user.
    pub fn is_visible(&self) -> bool {
        self.column.can_view && !self.is_child_form()
    }

    /// Returns true if the field maps onto a real column which can be written to.
    pub fn is_writable(&self) -> bool {
        !self.is_child_form()
            && !self.column.is_display_column
            && !self.column.is_primary_key()
            && !self.column.name.is_empty()
            && self.column.data_type != DataType::Calculated
    }
}
