// SPDX-License-Identifier: AGPL-3.0-or-later

//! Plain descriptor records as returned by the metadata service. The form engine treats all of
//! them as read-only inputs to assembly.
use serde::{Deserialize, Serialize};

use crate::schema::{DataType, TableRef};

/// Identifier of a form definition.
pub type FormId = i64;

/// Form definition: name and target table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormMetadata {
    /// Identifier of the form.
    pub id: FormId,

    /// Human readable name.
    pub name: String,

    /// Table the form reads from and writes to.
    pub table: TableRef,

    /// Numeric id of the target table.
    pub table_id: i64,
}

/// Section definition of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMetadata {
    /// Identifier of the section.
    pub id: i64,

    /// Form this section belongs to.
    pub form_id: FormId,

    /// Section heading.
    pub label: String,

    /// Position of the section within the form.
    pub position: i32,
}

/// Linkage of a field which expands into a nested child form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildFormLink {
    /// Form definition of the child records.
    pub form_id: FormId,

    /// Column expression on the parent side, for example `[Cinchy ID]`.
    pub parent_id: String,

    /// Column expression on the child side pointing at the parent, for example `[Project]`.
    pub link_id: Option<String>,

    /// Additional filter expression applied when reading child rows.
    #[serde(default)]
    pub filter: Option<String>,

    /// Sort expression applied when reading child rows.
    #[serde(default)]
    pub sort: Option<String>,

    /// Render child records as embedded rows instead of a separate dialog.
    #[serde(default)]
    pub flatten: bool,
}

/// Field definition placed into a form section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMetadata {
    /// Identifier of the field.
    pub id: i64,

    /// Form this field belongs to.
    pub form_id: FormId,

    /// Section this field is placed in.
    pub section_id: i64,

    /// Position of the field within its section.
    pub position: i32,

    /// Field label.
    pub label: String,

    /// Optional helper text.
    pub caption: Option<String>,

    /// Id of the table column backing this field.
    pub column_id: Option<i64>,

    /// Name of the table column backing this field, used when no id was given.
    pub column_name: Option<String>,

    /// Field is read-only in this form.
    pub is_view_only: bool,

    /// Field shows a linked record's label and is never written.
    pub is_display_column: bool,

    /// Parent column this field mirrors when it lives in a child form.
    pub linked_field_column: Option<String>,

    /// Set when this field expands into a nested child form.
    pub child_form: Option<ChildFormLink>,
}

/// Column definition of a backend table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Identifier of the column.
    pub id: i64,

    /// Column name.
    pub name: String,

    /// Type of the column.
    pub data_type: DataType,

    /// Value is required.
    #[serde(default)]
    pub is_mandatory: bool,

    /// Column holds a set of values.
    #[serde(default)]
    pub is_multiple: bool,

    /// Id of the column a link points at.
    #[serde(default)]
    pub link_target_column_id: Option<i64>,

    /// Id of the table a link points at.
    #[serde(default)]
    pub link_target_table_id: Option<i64>,

    /// Name of the column a link points at.
    #[serde(default)]
    pub link_target_column_name: Option<String>,

    /// Table a link points at.
    #[serde(default)]
    pub link_target_table: Option<TableRef>,

    /// Display format hint.
    #[serde(default)]
    pub display_format: Option<String>,

    /// Number formatting hint.
    #[serde(default)]
    pub number_formatter: Option<String>,

    /// Comma-separated option list of choice columns.
    #[serde(default)]
    pub choice_options: Option<String>,

    /// Regular expression values have to match.
    #[serde(default)]
    pub validation_expression: Option<String>,

    /// Companion column holding the file name of a binary column.
    #[serde(default)]
    pub file_name_column: Option<String>,
}

impl TableColumn {
    /// Returns a column of the given type with all optional settings left empty.
    pub fn new(id: i64, name: &str, data_type: DataType) -> Self {
        Self {
            id,
            name: name.to_owned(),
            data_type,
            is_mandatory: false,
            is_multiple: false,
            link_target_column_id: None,
            link_target_table_id: None,
            link_target_column_name: None,
            link_target_table: None,
            display_format: None,
            number_formatter: None,
            choice_options: None,
            validation_expression: None,
            file_name_column: None,
        }
    }
}

/// Column-level permissions of the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntitlement {
    /// Column the permission applies to.
    pub column_id: i64,

    /// User may see values of this column.
    pub can_view: bool,

    /// User may edit values of this column.
    pub can_edit: bool,
}

/// Permissions of the current user on one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntitlements {
    /// Table the permissions apply to.
    pub table_id: i64,

    /// Per-column permissions. Columns missing from this list are fully accessible.
    #[serde(default)]
    pub columns: Vec<ColumnEntitlement>,
}

impl TableEntitlements {
    /// Returns the permission for a column.
    pub fn column(&self, column_id: i64) -> Option<&ColumnEntitlement> {
        self.columns
            .iter()
            .find(|entitlement| entitlement.column_id == column_id)
    }
}

/// Permissions of the current user on one cell of a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntitlement {
    /// Column name of the cell.
    pub column: String,

    /// User may see the cell.
    pub can_view: bool,

    /// User may edit the cell.
    pub can_edit: bool,
}
