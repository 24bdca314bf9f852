// SPDX-License-Identifier: AGPL-3.0-or-later

//! Builds forms from separately fetched metadata.
//!
//! Form, section, field, column and entitlement descriptors are requested from the
//! [`MetadataProvider`], child forms are assembled recursively (one level deep) and persisted
//! values, child rows and link option datasets are read through the [`Executor`].
mod errors;

use async_recursion::async_recursion;
use log::{debug, info, warn};

use crate::context::Context;
use crate::db::{row_id_of, Executor, Row};
use crate::form::{
    compile_link_options, DropdownDataset, DropdownOption, Field, Form, ParentRef, Section,
};
use crate::notify::Notifier;
use crate::schema::{
    CellEntitlement, ChildFormLink, ColumnDescriptor, DataType, FieldMetadata, FormId,
    MetadataProvider, TableColumn,
};

pub use errors::AssemblyError;

/// Child forms nested deeper than this are not assembled.
const MAX_CHILD_DEPTH: usize = 1;

/// Identifies the form and record to assemble.
///
/// Both ids are passed in explicitly once, the assembler never reads them from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyRequest {
    /// Form definition to build.
    pub form_id: FormId,

    /// Record to load, `None` for a new record.
    pub row_id: Option<i64>,
}

impl AssemblyRequest {
    /// Request for a new, uncreated record.
    pub fn new_record(form_id: FormId) -> Self {
        Self {
            form_id,
            row_id: None,
        }
    }

    /// Request for a persisted record.
    pub fn record(form_id: FormId, row_id: i64) -> Self {
        Self {
            form_id,
            row_id: Some(row_id),
        }
    }
}

/// Builds [`Form`] trees from metadata and populates them with persisted values.
#[derive(Debug)]
pub struct FormAssembler<M, E, N> {
    context: Context<M, E, N>,
}

impl<M, E, N> Clone for FormAssembler<M, E, N> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<M, E, N> FormAssembler<M, E, N>
where
    M: MetadataProvider,
    E: Executor,
    N: Notifier,
{
    /// Returns a new assembler using the given collaborators.
    pub fn new(context: Context<M, E, N>) -> Self {
        Self { context }
    }

    /// Builds the form and, for persisted records, loads its values and child rows.
    ///
    /// Fails without returning a partial form if any descriptor can't be fetched, any read
    /// fails or the requested record does not exist.
    pub async fn assemble(&self, request: AssemblyRequest) -> Result<Form, AssemblyError> {
        debug!(
            "Assembling form {} for record {:?}",
            request.form_id, request.row_id
        );

        let mut form = self.build_form(request.form_id, None, 0).await?;

        if self.context.config.load_link_options {
            self.load_link_options(&mut form).await?;
        }

        form.rebuild_indices();

        if let Some(row_id) = request.row_id {
            self.load_record(&mut form, row_id).await?;
            self.load_child_rows(&mut form).await?;
            form.sync_mirrored_fields();
        }

        info!(
            "Assembled form '{}' ({} sections)",
            form.name,
            form.sections.len()
        );

        Ok(form)
    }

    #[async_recursion]
    async fn build_form(
        &self,
        form_id: FormId,
        parent: Option<(ChildFormLink, ParentRef)>,
        depth: usize,
    ) -> Result<Form, AssemblyError> {
        let metadata = &self.context.metadata;

        let form_metadata = metadata.fetch_form_metadata(form_id).await?;
        let mut sections = metadata.fetch_section_metadata(form_id).await?;
        let mut fields = metadata.fetch_field_metadata(form_id).await?;
        let columns = metadata.fetch_table_columns(form_metadata.table_id).await?;
        let entitlements = metadata
            .fetch_table_entitlements(form_metadata.table_id)
            .await?;

        let table = form_metadata.table.clone();

        let mut form = match &parent {
            Some((link, parent)) => Form::new_child(
                form_id,
                &form_metadata.name,
                table.clone(),
                form_metadata.table_id,
                link,
                parent.clone(),
            ),
            None => Form::new(
                form_id,
                &form_metadata.name,
                table.clone(),
                form_metadata.table_id,
            ),
        };

        form.table_columns = columns
            .iter()
            .map(|column| {
                ColumnDescriptor::from_metadata(
                    &table,
                    column,
                    &FieldMetadata::default(),
                    entitlements.column(column.id),
                )
            })
            .collect();

        sections.sort_by_key(|section| (section.position, section.id));
        fields.sort_by_key(|field| (field.position, field.id));

        if let Some(field) = fields
            .iter()
            .find(|field| !sections.iter().any(|section| section.id == field.section_id))
        {
            return Err(AssemblyError::UnknownSection {
                form_id,
                field_id: field.id,
                section_id: field.section_id,
            });
        }

        for section_metadata in &sections {
            let mut section = Section::new(section_metadata.id, &section_metadata.label);

            for field_metadata in fields
                .iter()
                .filter(|field| field.section_id == section_metadata.id)
            {
                if let Some(link) = &field_metadata.child_form {
                    if depth >= MAX_CHILD_DEPTH {
                        warn!(
                            "Skipping child form {} nested into child form {}",
                            link.form_id, form_id
                        );
                        continue;
                    }

                    let parent_ref = ParentRef {
                        form_id,
                        table: table.clone(),
                    };
                    let child = self
                        .build_form(link.form_id, Some((link.clone(), parent_ref)), depth + 1)
                        .await?;

                    let name = field_metadata
                        .column_name
                        .clone()
                        .unwrap_or_else(|| field_metadata.label.clone());
                    let mut field = Field::new(
                        field_metadata.id,
                        &field_metadata.label,
                        ColumnDescriptor::shape(&table, &name),
                        form_id,
                    );
                    field.caption = field_metadata.caption.clone();
                    field.child_form = Some(Box::new(child));
                    section.fields.push(field);
                    continue;
                }

                let column = find_column(&columns, field_metadata).ok_or(
                    AssemblyError::UnknownColumn {
                        form_id,
                        field_id: field_metadata.id,
                    },
                )?;

                let descriptor = ColumnDescriptor::from_metadata(
                    &table,
                    column,
                    field_metadata,
                    entitlements.column(column.id),
                );

                let mut field =
                    Field::new(field_metadata.id, &field_metadata.label, descriptor, form_id);
                field.caption = field_metadata.caption.clone();

                if column.data_type == DataType::Choice {
                    field.dropdown = column
                        .choice_options
                        .as_deref()
                        .map(DropdownDataset::from_choice_options);
                }

                section.fields.push(field);
            }

            form.sections.push(section);
        }

        form.rebuild_indices();

        Ok(form)
    }

    /// Loads the `{id, label}` datasets of all link fields, including those of child forms.
    #[async_recursion]
    async fn load_link_options(&self, form: &mut Form) -> Result<(), AssemblyError> {
        for section in form.sections.iter_mut() {
            for field in section.fields.iter_mut() {
                match field.child_form.as_deref_mut() {
                    Some(child_form) => self.load_link_options(child_form).await?,
                    None => {
                        if let Some(statement) = compile_link_options(&field.column) {
                            let rows = self.context.executor.execute_statement(&statement).await?;
                            field.dropdown = Some(dataset_from_rows(&rows));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Loads the values of a persisted record and applies the cell permissions of that row.
    async fn load_record(&self, form: &mut Form, row_id: i64) -> Result<(), AssemblyError> {
        let compiled = match form.compile_select(Some(row_id), None) {
            Some(compiled) => compiled,
            None => return Ok(()),
        };

        let rows = match compiled.statement() {
            Some(statement) => self.context.executor.execute_statement(&statement).await?,
            None => return Ok(()),
        };

        let row = rows.first().ok_or(AssemblyError::RecordNotFound {
            form_id: form.id,
            row_id,
        })?;

        form.load_record_data(row);

        let cells = self.fetch_cell_entitlements(form, row_id).await?;
        apply_cell_entitlements(form, &cells);

        Ok(())
    }

    /// Reads the rows of every child form linked to the loaded record.
    ///
    /// Flattened children keep their rows on the child form and get the cell permissions of the
    /// most recent row, table mode children keep them on their section.
    async fn load_child_rows(&self, form: &mut Form) -> Result<(), AssemblyError> {
        let paths: Vec<_> = form
            .fields()
            .filter(|(_, field)| field.is_child_form())
            .map(|(path, _)| path)
            .collect();

        for path in paths {
            let child = match form.child_form(path.section, path.field) {
                Ok(child) => child,
                Err(_) => continue,
            };

            let statement = match child
                .compile_select(None, Some(form))
                .and_then(|compiled| compiled.statement())
            {
                Some(statement) => statement,
                None => {
                    debug!("No linkage to read rows of child form {}", child.id);
                    continue;
                }
            };

            let rows = self.context.executor.execute_statement(&statement).await?;

            if child.flatten {
                let cells = match most_recent_row_id(&rows) {
                    Some(row_id) => self.fetch_cell_entitlements(child, row_id).await?,
                    None => Vec::new(),
                };

                form.update_child_form(path.section, path.field, |child| {
                    child.child_form_row_values = rows;
                    apply_cell_entitlements(child, &cells);
                })?;
            } else if let Some(section) = form.sections.get_mut(path.section) {
                section.child_row_values = Some(rows);
            }
        }

        Ok(())
    }

    async fn fetch_cell_entitlements(
        &self,
        form: &Form,
        row_id: i64,
    ) -> Result<Vec<CellEntitlement>, AssemblyError> {
        let columns: Vec<String> = form
            .fields()
            .filter(|(_, field)| !field.is_child_form() && !field.column.name.is_empty())
            .map(|(_, field)| field.column.name.clone())
            .collect();

        let cells = self
            .context
            .metadata
            .fetch_cell_entitlements(&form.table, row_id, &columns)
            .await?;

        Ok(cells)
    }
}

fn find_column<'a>(columns: &'a [TableColumn], field: &FieldMetadata) -> Option<&'a TableColumn> {
    match (field.column_id, &field.column_name) {
        (Some(id), _) => columns.iter().find(|column| column.id == id),
        (None, Some(name)) => columns.iter().find(|column| &column.name == name),
        (None, None) => None,
    }
}

fn dataset_from_rows(rows: &[Row]) -> DropdownDataset {
    DropdownDataset::new(
        rows.iter()
            .filter_map(|row| {
                let id = row.get("id").and_then(|value| value.as_text())?;
                let label = row
                    .get("label")
                    .and_then(|value| value.as_text())
                    .unwrap_or_default();
                Some(DropdownOption { id, label })
            })
            .collect(),
    )
}

/// Permissions can differ per row. Rows arrive in the child form's sort order, the most recent
/// one is the last row returned.
fn most_recent_row_id(rows: &[Row]) -> Option<i64> {
    rows.iter().rev().find_map(row_id_of)
}

fn apply_cell_entitlements(form: &mut Form, cells: &[CellEntitlement]) {
    for section in form.sections.iter_mut() {
        for field in section.fields.iter_mut() {
            if let Some(cell) = cells.iter().find(|cell| cell.column == field.column.name) {
                field.column.can_view = cell.can_view;
                field.column.can_edit = cell.can_edit;
            }
        }
    }
}
