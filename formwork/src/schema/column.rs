// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::db::bracket;
use crate::schema::{ColumnEntitlement, FieldMetadata, TableColumn};

/// Closed set of column types a backend table can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// Free text.
    Text,

    /// Numeric value.
    Number,

    /// Reference to one or many rows of another table, identified by their primary key.
    Link,

    /// One or many values out of a fixed option list.
    Choice,

    /// Date with optional time component.
    DateTime,

    /// Boolean flag.
    YesNo,

    /// File contents.
    Binary,

    /// Value computed by the backend.
    Calculated,
}

impl DataType {
    /// Returns the name the backend uses for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "Text",
            DataType::Number => "Number",
            DataType::Link => "Link",
            DataType::Choice => "Choice",
            DataType::DateTime => "Date and Time",
            DataType::YesNo => "Yes/No",
            DataType::Binary => "Binary",
            DataType::Calculated => "Calculated",
        }
    }
}

impl TryFrom<&str> for DataType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Text" => Ok(DataType::Text),
            "Number" => Ok(DataType::Number),
            "Link" => Ok(DataType::Link),
            "Choice" => Ok(DataType::Choice),
            "Date and Time" | "DateTime" => Ok(DataType::DateTime),
            "Yes/No" | "YesNo" => Ok(DataType::YesNo),
            "Binary" => Ok(DataType::Binary),
            "Calculated" => Ok(DataType::Calculated),
            _ => Err(format!("unknown column data type '{value}'")),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataType::try_from(value.as_str())
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coordinates of a backend table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Domain (namespace) the table lives in.
    pub domain: String,

    /// Name of the table.
    pub table: String,
}

impl TableRef {
    /// Returns a new table reference.
    pub fn new(domain: &str, table: &str) -> Self {
        Self {
            domain: domain.to_owned(),
            table: table.to_owned(),
        }
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", bracket(&self.domain), bracket(&self.table))
    }
}

/// Metadata for one table column as seen by one form field, including the entitlements resolved
/// for the current user and the field's dirty flag.
///
/// The dirty flag lives here rather than on the field so a cloned descriptor can be reset
/// independently of the field it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Numeric id of the column, `None` for synthesized descriptors of child form fields.
    pub id: Option<i64>,

    /// Table this column belongs to.
    pub table: TableRef,

    /// Column name.
    pub name: String,

    /// Type of the column.
    pub data_type: DataType,

    /// Value is required before a record can be saved.
    pub is_mandatory: bool,

    /// Link and choice columns holding a set of values rather than a scalar.
    pub is_multiple: bool,

    /// Field was configured as read-only in the form. Only written when saving a cloned form.
    pub is_view_only: bool,

    /// Read-only shadow field showing a linked record's label.
    pub is_display_column: bool,

    /// Id of the column a link points at.
    pub link_target_column_id: Option<i64>,

    /// Id of the table a link points at.
    pub link_target_table_id: Option<i64>,

    /// Name of the column a link points at, used as label source.
    pub link_target_column_name: Option<String>,

    /// Table a link points at.
    pub link_target_table: Option<TableRef>,

    /// Name of the parent form column this field mirrors when it lives in a child form.
    pub linked_field_column: Option<String>,

    /// Current user may edit this cell.
    pub can_edit: bool,

    /// Current user may see this cell.
    pub can_view: bool,

    /// Value was edited since the last load or save.
    pub has_changed: bool,

    /// Display format, for example `YYYY-MM-DD` for date columns.
    pub display_format: Option<String>,

    /// Number formatting hint for the presentation layer.
    pub number_formatter: Option<String>,

    /// Comma-separated option list of choice columns.
    pub choice_options: Option<String>,

    /// Regular expression values have to match before saving.
    pub validation_expression: Option<String>,

    /// Companion column holding the file name of a binary column.
    pub file_name_column: Option<String>,
}

impl ColumnDescriptor {
    /// Builds the descriptor for a field from its table column, the form designer's settings
    /// and the table-level entitlement of the current user.
    pub fn from_metadata(
        table: &TableRef,
        column: &TableColumn,
        field: &FieldMetadata,
        entitlement: Option<&ColumnEntitlement>,
    ) -> Self {
        Self {
            id: Some(column.id),
            table: table.clone(),
            name: column.name.clone(),
            data_type: column.data_type,
            is_mandatory: column.is_mandatory,
            is_multiple: column.is_multiple,
            is_view_only: field.is_view_only || column.data_type == DataType::Calculated,
            is_display_column: field.is_display_column,
            link_target_column_id: column.link_target_column_id,
            link_target_table_id: column.link_target_table_id,
            link_target_column_name: column.link_target_column_name.clone(),
            link_target_table: column.link_target_table.clone(),
            linked_field_column: field.linked_field_column.clone(),
            can_edit: entitlement.map_or(true, |entitlement| entitlement.can_edit),
            can_view: entitlement.map_or(true, |entitlement| entitlement.can_view),
            has_changed: false,
            display_format: column.display_format.clone(),
            number_formatter: column.number_formatter.clone(),
            choice_options: column.choice_options.clone(),
            validation_expression: column.validation_expression.clone(),
            file_name_column: column.file_name_column.clone(),
        }
    }

    /// Descriptor for a column which expands into a child form rather than holding a value.
    pub fn shape(table: &TableRef, name: &str) -> Self {
        Self {
            id: None,
            table: table.clone(),
            name: name.to_owned(),
            data_type: DataType::Text,
            is_mandatory: false,
            is_multiple: false,
            is_view_only: true,
            is_display_column: false,
            link_target_column_id: None,
            link_target_table_id: None,
            link_target_column_name: None,
            link_target_table: None,
            linked_field_column: None,
            can_edit: false,
            can_view: true,
            has_changed: false,
            display_format: None,
            number_formatter: None,
            choice_options: None,
            validation_expression: None,
            file_name_column: None,
        }
    }

    /// Descriptor of a plain table column outside of any form field, used when scanning the full
    /// column metadata of a table.
    pub fn from_table_column(table: &TableRef, column: &TableColumn) -> Self {
        Self::from_metadata(table, column, &FieldMetadata::default(), None)
    }

    /// Returns true if this is a link column holding a single row id.
    pub fn is_single_link(&self) -> bool {
        self.data_type == DataType::Link && !self.is_multiple
    }

    /// Returns true if this is a link column holding a set of row ids.
    pub fn is_multi_link(&self) -> bool {
        self.data_type == DataType::Link && self.is_multiple
    }

    /// Returns true if the column is the table's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.name == crate::db::PRIMARY_KEY_COLUMN
    }
}
