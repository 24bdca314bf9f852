// SPDX-License-Identifier: AGPL-3.0-or-later

//! Column descriptors and the metadata they are built from.
mod column;
mod errors;
mod metadata;
mod provider;
mod static_provider;

pub use column::{ColumnDescriptor, DataType, TableRef};
pub use errors::MetadataError;
pub use metadata::{
    CellEntitlement, ChildFormLink, ColumnEntitlement, FieldMetadata, FormId, FormMetadata,
    SectionMetadata, TableColumn, TableEntitlements,
};
pub use provider::MetadataProvider;
pub use static_provider::{MetadataBundle, RowEntitlements, StaticMetadataProvider, TableDefinition};
