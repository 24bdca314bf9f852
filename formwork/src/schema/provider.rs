// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;

use crate::schema::{
    CellEntitlement, FieldMetadata, FormId, FormMetadata, MetadataError, SectionMetadata,
    TableColumn, TableEntitlements, TableRef,
};

/// Source of the descriptors a form gets assembled from.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Returns the form definition.
    async fn fetch_form_metadata(&self, form_id: FormId) -> Result<FormMetadata, MetadataError>;

    /// Returns all sections of a form, in any order.
    async fn fetch_section_metadata(
        &self,
        form_id: FormId,
    ) -> Result<Vec<SectionMetadata>, MetadataError>;

    /// Returns all fields of a form, in any order.
    async fn fetch_field_metadata(
        &self,
        form_id: FormId,
    ) -> Result<Vec<FieldMetadata>, MetadataError>;

    /// Returns the full column metadata of a table.
    async fn fetch_table_columns(&self, table_id: i64) -> Result<Vec<TableColumn>, MetadataError>;

    /// Returns the column-level permissions of the current user on a table.
    async fn fetch_table_entitlements(
        &self,
        table_id: i64,
    ) -> Result<TableEntitlements, MetadataError>;

    /// Returns the permissions of the current user on the given cells of one persisted row.
    async fn fetch_cell_entitlements(
        &self,
        table: &TableRef,
        row_id: i64,
        columns: &[String],
    ) -> Result<Vec<CellEntitlement>, MetadataError>;
}
