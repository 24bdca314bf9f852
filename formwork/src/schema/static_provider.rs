// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;

use async_trait::async_trait;
use log::trace;
use serde::Deserialize;

use crate::schema::{
    CellEntitlement, FieldMetadata, FormId, FormMetadata, MetadataError, MetadataProvider,
    SectionMetadata, TableColumn, TableEntitlements, TableRef,
};

/// Column definitions and permissions of one table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDefinition {
    /// Numeric id of the table.
    pub table_id: i64,

    /// All columns of the table.
    pub columns: Vec<TableColumn>,

    /// Column-level permissions, full access when not set.
    #[serde(default)]
    pub entitlements: Option<TableEntitlements>,
}

/// Cell-level permissions of one persisted row.
#[derive(Debug, Clone, Deserialize)]
pub struct RowEntitlements {
    /// Table of the row.
    pub table: TableRef,

    /// Primary key of the row.
    pub row_id: i64,

    /// Permissions of the cells in this row.
    pub cells: Vec<CellEntitlement>,
}

/// Complete set of descriptors, for example read from a JSON fixture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataBundle {
    /// Form definitions.
    pub forms: Vec<FormMetadata>,

    /// Sections of all forms.
    pub sections: Vec<SectionMetadata>,

    /// Fields of all forms.
    pub fields: Vec<FieldMetadata>,

    /// Column definitions per table.
    pub tables: Vec<TableDefinition>,

    /// Cell-level permissions per row.
    pub rows: Vec<RowEntitlements>,
}

/// In-memory metadata provider serving a fixed set of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    forms: HashMap<FormId, FormMetadata>,
    sections: HashMap<FormId, Vec<SectionMetadata>>,
    fields: HashMap<FormId, Vec<FieldMetadata>>,
    tables: HashMap<i64, TableDefinition>,
    cells: HashMap<(TableRef, i64), Vec<CellEntitlement>>,
}

impl StaticMetadataProvider {
    /// Returns an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a provider serving all descriptors of the given bundle.
    pub fn from_bundle(bundle: MetadataBundle) -> Self {
        let mut provider = Self::new();

        for form in bundle.forms {
            provider.insert_form(form);
        }

        for section in bundle.sections {
            provider.insert_section(section);
        }

        for field in bundle.fields {
            provider.insert_field(field);
        }

        for table in bundle.tables {
            provider.insert_table(table);
        }

        for row in bundle.rows {
            provider.insert_cell_entitlements(&row.table, row.row_id, row.cells);
        }

        provider
    }

    /// Adds or replaces a form definition.
    pub fn insert_form(&mut self, form: FormMetadata) {
        self.forms.insert(form.id, form);
    }

    /// Adds a section to its form.
    pub fn insert_section(&mut self, section: SectionMetadata) {
        self.sections
            .entry(section.form_id)
            .or_default()
            .push(section);
    }

    /// Adds a field to its form.
    pub fn insert_field(&mut self, field: FieldMetadata) {
        self.fields.entry(field.form_id).or_default().push(field);
    }

    /// Adds or replaces the column definitions of a table.
    pub fn insert_table(&mut self, table: TableDefinition) {
        self.tables.insert(table.table_id, table);
    }

    /// Sets the cell-level permissions of one row.
    pub fn insert_cell_entitlements(
        &mut self,
        table: &TableRef,
        row_id: i64,
        cells: Vec<CellEntitlement>,
    ) {
        self.cells.insert((table.clone(), row_id), cells);
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn fetch_form_metadata(&self, form_id: FormId) -> Result<FormMetadata, MetadataError> {
        self.forms
            .get(&form_id)
            .cloned()
            .ok_or(MetadataError::UnknownForm(form_id))
    }

    async fn fetch_section_metadata(
        &self,
        form_id: FormId,
    ) -> Result<Vec<SectionMetadata>, MetadataError> {
        Ok(self.sections.get(&form_id).cloned().unwrap_or_default())
    }

    async fn fetch_field_metadata(
        &self,
        form_id: FormId,
    ) -> Result<Vec<FieldMetadata>, MetadataError> {
        Ok(self.fields.get(&form_id).cloned().unwrap_or_default())
    }

    async fn fetch_table_columns(&self, table_id: i64) -> Result<Vec<TableColumn>, MetadataError> {
        self.tables
            .get(&table_id)
            .map(|table| table.columns.clone())
            .ok_or(MetadataError::UnknownTable(table_id))
    }

    async fn fetch_table_entitlements(
        &self,
        table_id: i64,
    ) -> Result<TableEntitlements, MetadataError> {
        let table = self
            .tables
            .get(&table_id)
            .ok_or(MetadataError::UnknownTable(table_id))?;

        Ok(table.entitlements.clone().unwrap_or(TableEntitlements {
            table_id,
            columns: Vec::new(),
        }))
    }

    async fn fetch_cell_entitlements(
        &self,
        table: &TableRef,
        row_id: i64,
        columns: &[String],
    ) -> Result<Vec<CellEntitlement>, MetadataError> {
        trace!("Looking up cell entitlements of {table} row {row_id}");

        let cells = self
            .cells
            .get(&(table.clone(), row_id))
            .map(|cells| {
                cells
                    .iter()
                    .filter(|cell| columns.contains(&cell.column))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{DataType, MetadataError, MetadataProvider, TableRef};

    use super::{MetadataBundle, StaticMetadataProvider};

    #[tokio::test]
    async fn serves_bundle_from_json() {
        let bundle: MetadataBundle = serde_json::from_str(
            r#"{
                "forms": [
                    { "id": 1, "name": "Customers", "table": { "domain": "Sales", "table": "Customers" }, "table_id": 10 }
                ],
                "sections": [
                    { "id": 100, "form_id": 1, "label": "General", "position": 0 }
                ],
                "fields": [
                    { "id": 1000, "form_id": 1, "section_id": 100, "label": "Name", "column_id": 1 }
                ],
                "tables": [
                    { "table_id": 10, "columns": [ { "id": 1, "name": "Name", "data_type": "Text", "is_mandatory": true } ] }
                ],
                "rows": [
                    {
                        "table": { "domain": "Sales", "table": "Customers" },
                        "row_id": 3,
                        "cells": [ { "column": "Name", "can_view": true, "can_edit": false } ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let provider = StaticMetadataProvider::from_bundle(bundle);

        let form = provider.fetch_form_metadata(1).await.unwrap();
        assert_eq!(form.table, TableRef::new("Sales", "Customers"));

        let fields = provider.fetch_field_metadata(1).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].column_id, Some(1));

        let columns = provider.fetch_table_columns(10).await.unwrap();
        assert_eq!(columns[0].data_type, DataType::Text);
        assert!(columns[0].is_mandatory);

        let cells = provider
            .fetch_cell_entitlements(&form.table, 3, &["Name".to_string()])
            .await
            .unwrap();
        assert!(!cells[0].can_edit);

        assert_eq!(
            provider.fetch_form_metadata(2).await,
            Err(MetadataError::UnknownForm(2))
        );
    }
}
