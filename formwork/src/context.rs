// SPDX-License-Identifier: AGPL-3.0-or-later

use std::ops::Deref;
use std::sync::Arc;

use crate::config::Configuration;
use crate::db::Executor;
use crate::notify::Notifier;
use crate::schema::MetadataProvider;

/// Inner data shared by the assembly service and the save orchestrator.
#[derive(Debug)]
pub struct Data<M, E, N> {
    /// Engine configuration.
    pub config: Configuration,

    /// Source of form, section, field, column and entitlement descriptors.
    pub metadata: M,

    /// Executes statements against the backing store.
    pub executor: E,

    /// User feedback sink.
    pub notifier: N,
}

/// Collaborators shared across the form engine.
#[derive(Debug)]
pub struct Context<M, E, N>(pub Arc<Data<M, E, N>>);

impl<M, E, N> Context<M, E, N>
where
    M: MetadataProvider,
    E: Executor,
    N: Notifier,
{
    /// Returns a new instance of `Context`.
    pub fn new(config: Configuration, metadata: M, executor: E, notifier: N) -> Self {
        Self(Arc::new(Data {
            config,
            metadata,
            executor,
            notifier,
        }))
    }
}

impl<M, E, N> Clone for Context<M, E, N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<M, E, N> Deref for Context<M, E, N> {
    type Target = Data<M, E, N>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
