// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::{row_id_of, Row, PRIMARY_KEY_COLUMN};
use crate::form::{DropdownDataset, Field, FormModelError, Section, Value};
use crate::schema::{ChildFormLink, ColumnDescriptor, FormId, TableRef};

/// Token standing in for the primary key of a parent record which has not been inserted yet.
///
/// Child statements compiled before the parent got saved carry this token and have it textually
/// replaced once the parent's id is known.
pub const PARENT_ID_PLACEHOLDER: &str = "{parentId}";

/// Position of a field within a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPath {
    /// Index of the section.
    pub section: usize,

    /// Index of the field within its section.
    pub field: usize,
}

impl FieldPath {
    /// Returns a new field path.
    pub fn new(section: usize, field: usize) -> Self {
        Self { section, field }
    }
}

/// Position of a child form field which mirrors a parent column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkedFieldPath {
    /// Parent field holding the child form.
    pub field: FieldPath,

    /// Field inside of the child form.
    pub child_field: FieldPath,
}

/// Non-owning reference from a child form to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Form id of the parent.
    pub form_id: FormId,

    /// Table of the parent.
    pub table: TableRef,
}

/// Form-level properties which can be set through [`Form::update_root_property`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormProperty {
    /// Primary key of the record.
    RowId(Option<i64>),

    /// Dirty flag, setting it to `false` marks the whole form as saved.
    HasChanged(bool),

    /// Rows of a flattened child form.
    ChildFormRowValues(Vec<Row>),
}

/// Section-level properties which can be set through [`Form::update_section_property`].
#[derive(Debug, Clone, PartialEq)]
pub enum SectionProperty {
    /// Section heading.
    Label(String),

    /// Row set of a child table in table mode.
    ChildRowValues(Option<Vec<Row>>),
}

/// Additional field properties which can be updated next to the value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldProperty {
    /// File name of a binary field.
    FileName(Option<String>),

    /// Label of the linked record(s).
    LabelValue(Option<String>),

    /// Options of a link or choice field.
    Dropdown(Option<DropdownDataset>),
}

/// Settings for [`Form::clone_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    row_id: Option<i64>,
    mark_as_clean: bool,
}

impl CloneOptions {
    /// Clone into a new, unsaved record with every field marked dirty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this row id for the clone instead of treating it as a new record.
    pub fn row_id(mut self, row_id: i64) -> Self {
        self.row_id = Some(row_id);
        self
    }

    /// Start the clone from a clean baseline instead of forcing a full re-save.
    pub fn mark_as_clean(mut self, mark_as_clean: bool) -> Self {
        self.mark_as_clean = mark_as_clean;
        self
    }
}

/// In-memory aggregate representing one editable record and, through its child-form fields, its
/// nested child records.
///
/// The form owns its sections which own their fields, child forms are owned by the field they
/// expand from. Children know their parent only through a [`ParentRef`] and any operation needing
/// the parent (compiling a child save, reading linkage values) receives it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Identifier of the form definition.
    pub id: FormId,

    /// Human readable name.
    pub name: String,

    /// Table the form reads from and writes to.
    pub table: TableRef,

    /// Numeric id of the target table.
    pub table_id: i64,

    /// Sections in display order.
    pub sections: Vec<Section>,

    /// Form is nested into a parent form.
    pub is_child: bool,

    /// Child records are rendered as embedded rows instead of a separate dialog.
    pub flatten: bool,

    /// Column expression on the parent side of the linkage.
    pub child_form_parent_id: Option<String>,

    /// Column expression on the child side of the linkage.
    pub child_form_link_id: Option<String>,

    /// Filter expression applied when reading child rows.
    pub child_form_filter: Option<String>,

    /// Sort expression applied when reading child rows.
    pub child_form_sort: Option<String>,

    /// Parent of a child form.
    pub parent: Option<ParentRef>,

    /// Persisted rows of a flattened child form.
    pub child_form_row_values: Vec<Row>,

    /// Full column metadata of the target table, including columns without a field.
    pub table_columns: Vec<ColumnDescriptor>,

    row_id: Option<i64>,
    has_changed: bool,
    fields_by_column_name: HashMap<String, FieldPath>,
    child_fields_linked_to_column_name: HashMap<String, Vec<LinkedFieldPath>>,
}

impl Form {
    /// Returns a new, empty root form for an uncreated record.
    pub fn new(id: FormId, name: &str, table: TableRef, table_id: i64) -> Self {
        Self {
            id,
            name: name.to_owned(),
            table,
            table_id,
            sections: Vec::new(),
            is_child: false,
            flatten: false,
            child_form_parent_id: None,
            child_form_link_id: None,
            child_form_filter: None,
            child_form_sort: None,
            parent: None,
            child_form_row_values: Vec::new(),
            table_columns: Vec::new(),
            row_id: None,
            has_changed: false,
            fields_by_column_name: HashMap::new(),
            child_fields_linked_to_column_name: HashMap::new(),
        }
    }

    /// Returns a new, empty child form linked to its parent.
    pub fn new_child(
        id: FormId,
        name: &str,
        table: TableRef,
        table_id: i64,
        link: &ChildFormLink,
        parent: ParentRef,
    ) -> Self {
        let mut form = Self::new(id, name, table, table_id);
        form.is_child = true;
        form.flatten = link.flatten;
        form.child_form_parent_id = Some(link.parent_id.clone());
        form.child_form_link_id = link.link_id.clone();
        form.child_form_filter = link.filter.clone();
        form.child_form_sort = link.sort.clone();
        form.parent = Some(parent);
        form
    }

    /// Primary key of the record, `None` while the record was not created yet.
    pub fn row_id(&self) -> Option<i64> {
        self.row_id
    }

    /// Returns true if the form represents a record which was not created yet.
    pub fn is_new(&self) -> bool {
        self.row_id.is_none()
    }

    /// Returns true if any field was edited since the last load or save.
    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    /// Sets the dirty flag.
    ///
    /// Setting it to `false` marks the form as saved: the dirty flag of every field beneath it,
    /// including the fields of child forms, gets cleared as well.
    pub fn set_has_changed(&mut self, has_changed: bool) {
        self.has_changed = has_changed;

        if !has_changed {
            for section in self.sections.iter_mut() {
                for field in section.fields.iter_mut() {
                    field.column.has_changed = false;

                    if let Some(child_form) = field.child_form.as_mut() {
                        child_form.set_has_changed(false);
                    }
                }
            }
        }
    }

    /// Returns a section.
    pub fn section(&self, section: usize) -> Result<&Section, FormModelError> {
        self.sections
            .get(section)
            .ok_or(FormModelError::SectionNotFound(section))
    }

    /// Returns a field.
    pub fn field(&self, section: usize, field: usize) -> Result<&Field, FormModelError> {
        self.section(section)?
            .fields
            .get(field)
            .ok_or(FormModelError::FieldNotFound(section, field))
    }

    fn field_mut(&mut self, section: usize, field: usize) -> Result<&mut Field, FormModelError> {
        self.sections
            .get_mut(section)
            .ok_or(FormModelError::SectionNotFound(section))?
            .fields
            .get_mut(field)
            .ok_or(FormModelError::FieldNotFound(section, field))
    }

    /// Iterates over all fields together with their position.
    pub fn fields(&self) -> impl Iterator<Item = (FieldPath, &Field)> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(section_index, section)| {
                section
                    .fields
                    .iter()
                    .enumerate()
                    .map(move |(field_index, field)| {
                        (FieldPath::new(section_index, field_index), field)
                    })
            })
    }

    /// Returns the field bound to a column.
    pub fn field_by_column_name(&self, column_name: &str) -> Option<&Field> {
        self.fields_by_column_name
            .get(column_name)
            .and_then(|path| self.field(path.section, path.field).ok())
    }

    /// Index from column name to the position of the field bound to it.
    pub fn fields_by_column_name(&self) -> &HashMap<String, FieldPath> {
        &self.fields_by_column_name
    }

    /// Returns all child form fields mirroring the given parent column.
    pub fn child_fields_linked_to(&self, column_name: &str) -> &[LinkedFieldPath] {
        self.child_fields_linked_to_column_name
            .get(column_name)
            .map(|paths| paths.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the child form a field expands into.
    pub fn child_form(&self, section: usize, field: usize) -> Result<&Form, FormModelError> {
        self.field(section, field)?
            .child_form
            .as_deref()
            .ok_or(FormModelError::NotAChildForm(section, field))
    }

    /// Runs a mutation on a child form.
    ///
    /// A child which is dirty after the mutation marks this form dirty as well. The flag only
    /// travels upwards, a parent never marks its children dirty.
    pub fn update_child_form<F, R>(
        &mut self,
        section: usize,
        field: usize,
        mutation: F,
    ) -> Result<R, FormModelError>
    where
        F: FnOnce(&mut Form) -> R,
    {
        let child_form = self
            .field_mut(section, field)?
            .child_form
            .as_deref_mut()
            .ok_or(FormModelError::NotAChildForm(section, field))?;

        let result = mutation(child_form);

        if child_form.has_changed {
            self.has_changed = true;
        }

        Ok(result)
    }

    /// Assigns a new value to a field.
    ///
    /// Values are compared element-wise for lists and strictly otherwise. Only a differing value
    /// marks the field and the form dirty, applying the same value twice has no further effect.
    /// Additional properties get applied after the value, with the same comparison.
    ///
    /// Flattened child fields mirroring this field's column receive the new value as well.
    ///
    /// Returns true if the value changed.
    pub fn update_field_value(
        &mut self,
        section: usize,
        field: usize,
        value: Value,
        extras: Vec<FieldProperty>,
    ) -> Result<bool, FormModelError> {
        let target = self.field_mut(section, field)?;

        if target.is_child_form() {
            return Err(FormModelError::IsAChildForm(section, field));
        }

        let changed = target.value != value;
        let column_name = target.column.name.clone();

        if changed {
            trace!(
                "Field '{}' changed from {} to {}",
                target.column.name,
                target.value,
                value
            );

            target.column.has_changed = true;
            target.value = value.clone();
            self.has_changed = true;
        }

        for property in extras {
            self.update_field_additional_property(section, field, property)?;
        }

        if changed {
            self.mirror_into_child_fields(&column_name, &value);
        }

        Ok(changed)
    }

    /// Updates an additional property of a field, marking the field and form dirty if it
    /// changed. Returns true if the property changed.
    pub fn update_field_additional_property(
        &mut self,
        section: usize,
        field: usize,
        property: FieldProperty,
    ) -> Result<bool, FormModelError> {
        let target = self.field_mut(section, field)?;

        let changed = match property {
            FieldProperty::FileName(file_name) => {
                replace_if_different(&mut target.file_name, file_name)
            }
            FieldProperty::LabelValue(label) => {
                replace_if_different(&mut target.label_value, label)
            }
            FieldProperty::Dropdown(dropdown) => {
                // Option datasets are presentation state, they never make a record dirty
                replace_if_different(&mut target.dropdown, dropdown);
                return Ok(false);
            }
        };

        if changed {
            target.column.has_changed = true;
            self.has_changed = true;
        }

        Ok(changed)
    }

    /// Updates a form-level property. Returns true if the property changed.
    pub fn update_root_property(&mut self, property: FormProperty) -> bool {
        match property {
            FormProperty::RowId(row_id) => {
                let changed = replace_if_different(&mut self.row_id, row_id);
                if changed {
                    self.has_changed = true;
                }
                changed
            }
            FormProperty::HasChanged(has_changed) => {
                let changed = self.has_changed != has_changed;
                self.set_has_changed(has_changed);
                changed
            }
            FormProperty::ChildFormRowValues(rows) => {
                let changed = replace_if_different(&mut self.child_form_row_values, rows);
                if changed {
                    self.has_changed = true;
                }
                changed
            }
        }
    }

    /// Updates a section-level property. Returns true if the property changed.
    pub fn update_section_property(
        &mut self,
        section: usize,
        property: SectionProperty,
    ) -> Result<bool, FormModelError> {
        let target = self
            .sections
            .get_mut(section)
            .ok_or(FormModelError::SectionNotFound(section))?;

        let changed = match property {
            SectionProperty::Label(label) => replace_if_different(&mut target.label, label),
            SectionProperty::ChildRowValues(rows) => {
                replace_if_different(&mut target.child_row_values, rows)
            }
        };

        if changed {
            self.has_changed = true;
        }

        Ok(changed)
    }

    /// Deep-copies the form, its sections, fields and child forms.
    ///
    /// The clone represents a new record (or the record given in the options) and every field is
    /// either marked dirty, forcing a full re-save, or clean.
    pub fn clone_with(&self, options: CloneOptions) -> Form {
        let mut form = self.clone();
        form.reset_for_clone(!options.mark_as_clean);
        form.row_id = options.row_id;
        form
    }

    fn reset_for_clone(&mut self, dirty: bool) {
        self.row_id = None;
        self.has_changed = dirty;

        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                match field.child_form.as_mut() {
                    Some(child_form) => child_form.reset_for_clone(dirty),
                    None => field.column.has_changed = dirty,
                }
            }
        }
    }

    /// Rebuilds the column name lookup indices of this form and its child forms.
    pub fn rebuild_indices(&mut self) {
        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                if let Some(child_form) = field.child_form.as_mut() {
                    child_form.rebuild_indices();
                }
            }
        }

        let mut fields_by_column_name = HashMap::new();
        for (path, field) in self.fields() {
            if !field.is_child_form() && !field.column.name.is_empty() {
                fields_by_column_name
                    .entry(field.column.name.clone())
                    .or_insert(path);
            }
        }

        let mut linked: HashMap<String, Vec<LinkedFieldPath>> = HashMap::new();
        for (path, field) in self.fields() {
            let child_form = match field.child_form.as_deref() {
                Some(child_form) => child_form,
                None => continue,
            };

            let link_column = child_form
                .child_form_link_id
                .as_deref()
                .map(column_name_of);
            let parent_column = child_form
                .child_form_parent_id
                .as_deref()
                .map(column_name_of);

            for (child_path, child_field) in child_form.fields() {
                let source = match &child_field.column.linked_field_column {
                    Some(source) => Some(source.clone()),
                    None if link_column.as_deref() == Some(child_field.column.name.as_str()) => {
                        parent_column.clone()
                    }
                    None => None,
                };

                if let Some(source) = source {
                    if fields_by_column_name.contains_key(&source) {
                        linked.entry(source).or_default().push(LinkedFieldPath {
                            field: path,
                            child_field: child_path,
                        });
                    }
                }
            }
        }

        self.fields_by_column_name = fields_by_column_name;
        self.child_fields_linked_to_column_name = linked;
    }

    /// Copies the current value of every mirrored parent column into its flattened child
    /// fields, for example after the parent record got loaded.
    pub fn sync_mirrored_fields(&mut self) {
        let sources: Vec<(String, Value)> = self
            .child_fields_linked_to_column_name
            .keys()
            .filter_map(|column_name| {
                self.field_by_column_name(column_name)
                    .map(|field| (column_name.clone(), field.value.clone()))
            })
            .collect();

        for (column_name, value) in sources {
            self.mirror_into_child_fields(&column_name, &value);
        }
    }

    fn mirror_into_child_fields(&mut self, column_name: &str, value: &Value) {
        let paths = self.child_fields_linked_to(column_name).to_vec();

        for path in paths {
            let child_form = match self
                .sections
                .get_mut(path.field.section)
                .and_then(|section| section.fields.get_mut(path.field.field))
                .and_then(|field| field.child_form.as_deref_mut())
            {
                Some(child_form) if child_form.flatten => child_form,
                _ => continue,
            };

            if let Ok(child_field) = child_form.field_mut(path.child_field.section, path.child_field.field) {
                child_field.value = value.clone();
            }
        }
    }

    /// Populates the form with a persisted record as read back by
    /// [`compile_select`](Form::compile_select).
    ///
    /// Fields whose column is missing in the row keep their value. Link fields take the id(s)
    /// from the column and the label from the `<column> label` alias. The form is clean
    /// afterwards.
    pub fn load_record_data(&mut self, row: &Row) {
        if let Some(row_id) = row_id_of(row) {
            self.row_id = Some(row_id);
        }

        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                if field.is_child_form() {
                    continue;
                }

                if let Some(cell) = row.get(&field.column.name) {
                    field.value = normalize_cell(&field.column, cell);
                }

                load_companions(field, row);
                field.column.has_changed = false;
            }
        }

        self.has_changed = false;
    }

    /// Populates a child form with one of its rows, replacing every field value.
    ///
    /// Fields whose column is missing in the row are reset to null.
    pub fn populate_child_record_data(&mut self, row: &Row) {
        self.row_id = row_id_of(row);

        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                if field.is_child_form() {
                    continue;
                }

                field.value = row
                    .get(&field.column.name)
                    .map(|cell| normalize_cell(&field.column, cell))
                    .unwrap_or(Value::Null);
                field.label_value = None;
                field.file_name = None;

                load_companions(field, row);
                field.column.has_changed = false;
            }
        }

        self.has_changed = false;
    }

    /// Resets a child form to a blank, unsaved row.
    pub fn clear_for_new_row(&mut self) {
        self.row_id = None;

        for section in self.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                if field.is_child_form() {
                    continue;
                }

                field.value = Value::Null;
                field.label_value = None;
                field.file_name = None;
                field.column.has_changed = false;
            }
        }

        self.has_changed = false;
    }

    /// Current values of all scalar fields keyed by column name, in the shape of a result row.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();

        if let Some(row_id) = self.row_id {
            row.insert(PRIMARY_KEY_COLUMN.to_string(), Value::from(row_id));
        }

        for (_, field) in self.fields() {
            if field.is_child_form() || field.column.name.is_empty() {
                continue;
            }

            row.insert(field.column.name.clone(), field.value.clone());

            if let Some(label) = &field.label_value {
                row.insert(label_alias(&field.column.name), Value::Text(label.clone()));
            }
        }

        row
    }
}

/// Alias under which the label of a link column is selected.
pub(crate) fn label_alias(column_name: &str) -> String {
    format!("{column_name} label")
}

/// Matches the leading bracketed identifier of an expression like `[Project].[Cinchy ID]`.
static LEADING_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[((?:[^\]]|\]\])+)\]").expect("valid identifier pattern"));

/// Extracts the column name out of a linkage expression like `[Project].[Cinchy ID]`. Bare
/// expressions like `Project.Name` yield the part before the first dot.
pub(crate) fn column_name_of(expression: &str) -> String {
    match LEADING_IDENTIFIER.captures(expression) {
        Some(captures) => captures[1].replace("]]", "]").trim().to_string(),
        None => expression
            .split('.')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn normalize_cell(column: &ColumnDescriptor, cell: &Value) -> Value {
    if column.is_multi_link() {
        match cell {
            Value::Null => Value::Null,
            _ => Value::List(cell.items()),
        }
    } else {
        cell.clone()
    }
}

fn load_companions(field: &mut Field, row: &Row) {
    if let Some(label) = row.get(&label_alias(&field.column.name)) {
        field.label_value = label.as_text();
    }

    if let Some(file_name_column) = &field.column.file_name_column {
        if let Some(file_name) = row.get(file_name_column) {
            field.file_name = file_name.as_text();
        }
    }
}

fn replace_if_different<T: PartialEq>(target: &mut T, value: T) -> bool {
    if *target != value {
        *target = value;
        true
    } else {
        false
    }
}
