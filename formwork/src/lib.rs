// SPDX-License-Identifier: AGPL-3.0-or-later

//! # formwork
//!
//! Metadata-driven form model for tabular backends. A [`Form`] is assembled from separately
//! fetched form, section, field and column descriptors, tracks field- and form-level dirtiness
//! while the user edits it and compiles itself into parameterized `SELECT`, `INSERT`, `UPDATE`
//! and `DELETE` statements.
//!
//! Saving a parent record together with its pending child-record mutations is sequenced by the
//! [`SaveOrchestrator`], which replays queued child statements once the parent's primary key is
//! known.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod assembly;
mod config;
mod context;
mod db;
mod errors;
mod form;
mod notify;
mod save;
mod schema;

#[cfg(test)]
mod test_utils;

pub use crate::assembly::{AssemblyError, AssemblyRequest, FormAssembler};
pub use crate::config::{Configuration, InsertIdRetrieval};
pub use crate::context::Context;
pub use crate::db::errors::ExecutionError;
pub use crate::db::{Executor, Parameters, Row, Statement};
pub use crate::errors::FormError;
pub use crate::form::{
    AttachedFile, CloneOptions, CompiledStatement, DropdownDataset, DropdownOption, Field,
    FieldPath, FieldProperty, Form, FormModelError, FormProperty, LinkedFieldPath, ParentRef,
    Section, SectionProperty, ValidationResult, Value, PARENT_ID_PLACEHOLDER,
};
pub use crate::notify::{LogNotifier, Notifier};
pub use crate::save::{
    LoadOutcome, LoadTicket, PendingChildQuery, PendingChildQueue, SaveOrchestrator, SaveOutcome,
    SaveState,
};
pub use crate::schema::{
    CellEntitlement, ChildFormLink, ColumnDescriptor, ColumnEntitlement, DataType, FieldMetadata,
    FormId, FormMetadata, MetadataBundle, MetadataError, MetadataProvider, RowEntitlements,
    SectionMetadata, StaticMetadataProvider, TableColumn, TableDefinition, TableEntitlements,
    TableRef,
};
