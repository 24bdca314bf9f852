// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{debug, trace};

use crate::config::InsertIdRetrieval;
use crate::db::{bracket, NOT_DELETED_SQL, PRIMARY_KEY_COLUMN};
use crate::form::compile::serialize::{serialize_value, value_expression};
use crate::form::compile::{
    primary_key_filter, AttachedFile, CompiledStatement, ParameterAllocator, FILE_NAME_PARAMETER,
    FILE_PARAMETER, ROW_ID_PARAMETER,
};
use crate::form::{column_name_of, Field, Form, Value, PARENT_ID_PLACEHOLDER};
use crate::schema::{ColumnDescriptor, DataType};

/// Name of the variable holding the generated primary key on backends which expose it directly.
const GENERATED_ID_VARIABLE: &str = "@cinchyid";

/// Collects assignments for one insert or update statement.
struct SaveBuilder<'a> {
    form: &'a Form,
    row_id: Option<i64>,
    parameters: ParameterAllocator,
    assignments: Vec<(String, String)>,
    attached_files: Vec<AttachedFile>,
}

impl<'a> SaveBuilder<'a> {
    fn new(form: &'a Form, row_id: Option<i64>) -> Self {
        Self {
            form,
            row_id,
            parameters: ParameterAllocator::default(),
            assignments: Vec::new(),
            attached_files: Vec::new(),
        }
    }

    fn is_insert(&self) -> bool {
        self.row_id.is_none()
    }

    fn has_assignments(&self) -> bool {
        !self.assignments.is_empty()
    }

    fn push_field(&mut self, field: &Field, value: &Value) {
        if field.column.data_type == DataType::Binary {
            self.push_file(field, value);
        } else {
            self.push_column(&field.column, value);
        }
    }

    fn push_column(&mut self, column: &ColumnDescriptor, value: &Value) {
        let parameter = self.parameters.push(serialize_value(column, value));
        let expression = value_expression(column, &parameter, self.is_insert());
        self.assignments.push((bracket(&column.name), expression));
    }

    /// File contents are written inline when inserting, existing rows get them through the
    /// attached file statement after the save.
    fn push_file(&mut self, field: &Field, value: &Value) {
        if value.is_empty() {
            return;
        }

        let file_name_column = field
            .column
            .file_name_column
            .as_deref()
            .filter(|_| field.file_name.is_some());

        let inline = self.is_insert();
        if inline {
            let parameter = self.parameters.push(value.clone());
            self.assignments
                .push((bracket(&field.column.name), parameter));

            if let (Some(column), Some(file_name)) = (file_name_column, &field.file_name) {
                let parameter = self.parameters.push(Value::Text(file_name.clone()));
                self.assignments.push((bracket(column), parameter));
            }
        }

        let mut set = format!("{} = {}", bracket(&field.column.name), FILE_PARAMETER);
        if let Some(column) = file_name_column {
            set.push_str(&format!(", {} = {}", bracket(column), FILE_NAME_PARAMETER));
        }

        self.attached_files.push(AttachedFile {
            domain: self.form.table.domain.clone(),
            table: self.form.table.table.clone(),
            column: field.column.name.clone(),
            file_name: field.file_name.clone(),
            query: format!(
                "UPDATE {} SET {} WHERE {} = {} AND {}",
                self.form.table,
                set,
                bracket(PRIMARY_KEY_COLUMN),
                ROW_ID_PARAMETER,
                NOT_DELETED_SQL
            ),
            value: value.clone(),
            inline,
        });
    }

    fn finish(self, retrieval: InsertIdRetrieval) -> Option<CompiledStatement> {
        if self.assignments.is_empty() {
            if self.attached_files.is_empty() {
                return None;
            }

            return Some(CompiledStatement {
                text: None,
                parameters: Default::default(),
                attached_files: self.attached_files,
            });
        }

        let text = match self.row_id {
            None => insert_statement(&self.form.table.to_string(), &self.assignments, retrieval),
            Some(row_id) => {
                let set = self
                    .assignments
                    .iter()
                    .map(|(column, expression)| format!("{column} = {expression}"))
                    .collect::<Vec<String>>()
                    .join(", ");

                format!(
                    "UPDATE {} SET {} {}",
                    self.form.table,
                    set,
                    primary_key_filter(row_id)
                )
            }
        };

        debug_assert!(!self.parameters.is_empty());
        trace!("Compiled save for form {}: {}", self.form.id, text);

        Some(CompiledStatement {
            text: Some(text),
            parameters: self.parameters.into_parameters(),
            attached_files: self.attached_files,
        })
    }
}

fn insert_statement(
    table: &str,
    assignments: &[(String, String)],
    retrieval: InsertIdRetrieval,
) -> String {
    let columns = assignments
        .iter()
        .map(|(column, _)| column.as_str())
        .collect::<Vec<&str>>()
        .join(", ");
    let values = assignments
        .iter()
        .map(|(_, expression)| expression.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    match retrieval {
        InsertIdRetrieval::SelectGeneratedId => format!(
            "INSERT INTO {table} ({columns}) VALUES ({values}) SELECT {GENERATED_ID_VARIABLE} AS [id]"
        ),
        InsertIdRetrieval::OutputInto => format!(
            "CREATE TABLE #tmp([id] int) \
             INSERT INTO {table} ({columns}) OUTPUT INSERTED.{} INTO #tmp ([id]) VALUES ({values}) \
             SELECT x.[id] AS [id] FROM #tmp x",
            bracket(PRIMARY_KEY_COLUMN)
        ),
    }
}

/// Fields written by a save: edited, editable scalar fields. View-only fields are only written
/// for cloned forms.
fn is_saved(field: &Field, for_cloned_form: bool) -> bool {
    field.is_writable()
        && field.column.can_edit
        && field.column.has_changed
        && (!field.column.is_view_only || for_cloned_form)
}

/// Value of a visible linkage field. Empty single links take the parent id, multi-value links
/// get it appended.
fn linkage_value(field: &Field, parent_id: &str) -> Value {
    if field.column.is_multi_link() {
        let mut ids = field.value.items();
        if !ids.iter().any(|id| id == parent_id) {
            ids.push(parent_id.to_string());
        }
        Value::List(ids)
    } else if field.value.is_empty() {
        Value::Text(parent_id.to_string())
    } else {
        field.value.clone()
    }
}

impl Form {
    /// Compiles the statement saving all edited fields of this form.
    ///
    /// Inserts a new record when `row_id` is `None` and returns its generated id the way
    /// `retrieval` selects, updates the live record with that id otherwise. Parameters are
    /// named `@p0`, `@p1`, .. in section and field order.
    ///
    /// Returns a result without text if only files have to be written and `None` if nothing
    /// changed at all.
    pub fn compile_save(
        &self,
        row_id: Option<i64>,
        retrieval: InsertIdRetrieval,
        for_cloned_form: bool,
    ) -> Option<CompiledStatement> {
        let mut builder = SaveBuilder::new(self, row_id);

        for (_, field) in self.fields() {
            if is_saved(field, for_cloned_form) {
                builder.push_field(field, &field.value);
            }
        }

        builder.finish(retrieval)
    }

    /// Compiles the statement saving one row of this child form, linking it to its parent.
    ///
    /// A visible linkage field gets the parent id when it holds no value, or the
    /// [`PARENT_ID_PLACEHOLDER`] while the parent is not saved yet. Without such a field the
    /// linkage column is looked up in the table's columns and assigned the parent id (link
    /// columns) or the parent's value for the linked column (derived columns).
    pub fn compile_child_save(
        &self,
        parent: &Form,
        row_id: Option<i64>,
        retrieval: InsertIdRetrieval,
        for_cloned_form: bool,
    ) -> Option<CompiledStatement> {
        let mut builder = SaveBuilder::new(self, row_id);

        let link_column = self.child_form_link_id.as_deref().map(column_name_of);
        let parent_id = parent
            .row_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| PARENT_ID_PLACEHOLDER.to_string());

        let mut linked = false;
        for (_, field) in self.fields() {
            let is_linkage = link_column.as_deref() == Some(field.column.name.as_str())
                && field.is_visible()
                && field.is_writable();

            if is_linkage {
                linked = true;
                if builder.is_insert() || field.column.has_changed {
                    builder.push_field(field, &linkage_value(field, &parent_id));
                }
            } else if is_saved(field, for_cloned_form) {
                builder.push_field(field, &field.value);
            }
        }

        if let Some(link_column) = link_column {
            if !linked && (builder.is_insert() || builder.has_assignments()) {
                self.push_fallback_linkage(&mut builder, parent, &link_column, &parent_id);
            }
        }

        builder.finish(retrieval)
    }

    fn push_fallback_linkage(
        &self,
        builder: &mut SaveBuilder<'_>,
        parent: &Form,
        link_column: &str,
        parent_id: &str,
    ) {
        let column = match self
            .table_columns
            .iter()
            .find(|column| column.name == link_column)
        {
            Some(column) => column,
            None => {
                debug!(
                    "Child form {} has no column '{}' to link it to its parent",
                    self.id, link_column
                );
                return;
            }
        };

        let value = if column.data_type == DataType::Link {
            if column.is_multiple {
                Value::List(vec![parent_id.to_string()])
            } else {
                Value::Text(parent_id.to_string())
            }
        } else {
            match self.parent_link_value(parent) {
                Some(value) => value,
                None if self.links_parent_primary_key() => Value::Text(parent_id.to_string()),
                None => {
                    debug!(
                        "Parent of child form {} holds no value for column '{}' yet",
                        self.id, link_column
                    );
                    return;
                }
            }
        };

        builder.push_column(column, &value);
    }

    fn links_parent_primary_key(&self) -> bool {
        self.child_form_parent_id
            .as_deref()
            .map_or(false, |parent_id| column_name_of(parent_id) == PRIMARY_KEY_COLUMN)
    }
}
