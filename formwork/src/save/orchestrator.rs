// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{debug, info, trace, warn};

use crate::assembly::{AssemblyError, AssemblyRequest, FormAssembler};
use crate::context::Context;
use crate::db::errors::ExecutionError;
use crate::db::{row_id_of, Executor, Row, Statement};
use crate::errors::FormError;
use crate::form::{AttachedFile, FieldPath, Form, FormProperty};
use crate::notify::Notifier;
use crate::save::{PendingChildQuery, PendingChildQueue};
use crate::schema::MetadataProvider;

/// Progress of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// No save in progress.
    Idle,

    /// The parent statement is being executed.
    AwaitingParentSave,

    /// Pending child saves are being executed, the value is the index of the current entry.
    DrainingQueue(usize),
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Neither the form nor any child row changed.
    NothingToSave,

    /// The record and all pending child rows were written.
    Saved {
        /// Primary key of the saved record.
        row_id: i64,

        /// Number of child saves executed.
        child_rows: usize,
    },
}

/// Result of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The assembled form replaced the current one.
    Loaded,

    /// Another load was in progress, the request was dropped without being queued.
    Dropped,

    /// A newer load started while this one was in flight, its result was discarded.
    Stale,
}

/// Handle of a started load, identifying its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    request: AssemblyRequest,
}

impl LoadTicket {
    /// Form and record this load is reading.
    pub fn request(&self) -> AssemblyRequest {
        self.request
    }
}

/// Owns the top-level form of an editing session and sequences its loads and saves.
///
/// A save executes the parent statement first. Once it resolved and the parent's primary key is
/// known, pending child saves are executed one after another in the order they were enqueued,
/// with the parent id substituted for the placeholder of rows created before the parent
/// existed. A failing child save halts the drain, the remaining entries stay queued until the
/// next save.
#[derive(Debug)]
pub struct SaveOrchestrator<M, E, N> {
    context: Context<M, E, N>,
    assembler: FormAssembler<M, E, N>,
    form: Option<Form>,
    queue: PendingChildQueue,
    state: SaveState,
    loading: bool,
    load_generation: u64,
}

impl<M, E, N> SaveOrchestrator<M, E, N>
where
    M: MetadataProvider,
    E: Executor,
    N: Notifier,
{
    /// Returns an orchestrator without a loaded form.
    pub fn new(context: Context<M, E, N>) -> Self {
        Self {
            assembler: FormAssembler::new(context.clone()),
            context,
            form: None,
            queue: PendingChildQueue::new(),
            state: SaveState::Idle,
            loading: false,
            load_generation: 0,
        }
    }

    /// Currently loaded form.
    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    /// Currently loaded form, for applying edits.
    pub fn form_mut(&mut self) -> Option<&mut Form> {
        self.form.as_mut()
    }

    /// Child saves waiting for the next save.
    pub fn queue(&self) -> &PendingChildQueue {
        &self.queue
    }

    /// Progress of the current save.
    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Returns true while a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Starts a load.
    ///
    /// Returns `None` if another load is in flight, unless `force` is set: a forced load starts
    /// a new generation and makes the result of the one in flight stale.
    pub fn begin_load(&mut self, request: AssemblyRequest, force: bool) -> Option<LoadTicket> {
        if self.loading && !force {
            debug!("Dropping load of form {}, another load is in flight", request.form_id);
            return None;
        }

        self.loading = true;
        self.load_generation += 1;

        Some(LoadTicket {
            generation: self.load_generation,
            request,
        })
    }

    /// Completes a load started with [`begin_load`](Self::begin_load).
    ///
    /// The assembled form replaces the current one only if no newer load was started in the
    /// meantime. The pending child queue belongs to the replaced form and gets cleared.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Form, AssemblyError>,
    ) -> Result<LoadOutcome, FormError> {
        if ticket.generation < self.load_generation {
            debug!(
                "Discarding stale load of form {} (generation {} < {})",
                ticket.request.form_id, ticket.generation, self.load_generation
            );
            return Ok(LoadOutcome::Stale);
        }

        self.loading = false;

        match result {
            Ok(form) => {
                self.form = Some(form);
                self.queue.clear();
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                warn!("Loading form {} failed: {}", ticket.request.form_id, err);
                self.context.notifier.notify_error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Assembles the requested form and makes it the current one.
    pub async fn load(&mut self, request: AssemblyRequest) -> Result<LoadOutcome, FormError> {
        self.load_with(request, false).await
    }

    /// Reloads the current form and record. Dropped if a load is already in flight.
    pub async fn reload(&mut self) -> Result<LoadOutcome, FormError> {
        let request = self.current_request()?;
        self.load_with(request, false).await
    }

    async fn load_with(
        &mut self,
        request: AssemblyRequest,
        force: bool,
    ) -> Result<LoadOutcome, FormError> {
        let ticket = match self.begin_load(request, force) {
            Some(ticket) => ticket,
            None => return Ok(LoadOutcome::Dropped),
        };

        let result = self.assembler.assemble(request).await;
        self.finish_load(ticket, result)
    }

    fn current_request(&self) -> Result<AssemblyRequest, FormError> {
        let form = self.form.as_ref().ok_or(FormError::NotLoaded)?;

        Ok(AssemblyRequest {
            form_id: form.id,
            row_id: form.row_id(),
        })
    }

    /// Validates and compiles the current row of a child form and queues it for the next save.
    ///
    /// Returns false if the row has no changes.
    pub fn enqueue_child_save(&mut self, section: usize, field: usize) -> Result<bool, FormError> {
        let form = self.form.as_mut().ok_or(FormError::NotLoaded)?;

        let validation =
            form.update_child_form(section, field, |child| child.check_child_form_validation())?;
        if let Some(message) = validation.message {
            self.context.notifier.notify_error(&message);
            return Err(FormError::Validation(message));
        }

        let child = form.child_form(section, field)?;
        let retrieval = self.context.config.insert_id_retrieval();

        let compiled = match child.compile_child_save(form, child.row_id(), retrieval, false) {
            Some(compiled) => compiled,
            None => return Ok(false),
        };

        let query = PendingChildQuery {
            child_form_id: child.id,
            row_id: child.row_id(),
            path: FieldPath::new(section, field),
            compiled,
        };

        debug!("Queueing {query}");
        self.queue.enqueue(query);

        Ok(true)
    }

    /// Saves the current form and drains the pending child saves.
    ///
    /// Fails with [`FormError::Busy`] while a load or another save is in flight and with
    /// [`FormError::Validation`] before anything gets executed if the form is invalid. Every
    /// failure is reported to the notifier.
    pub async fn save(&mut self) -> Result<SaveOutcome, FormError> {
        if self.state != SaveState::Idle || self.loading {
            return Err(FormError::Busy);
        }

        let result = self.save_and_drain().await;
        self.state = SaveState::Idle;

        if let Err(err) = &result {
            self.context.notifier.notify_error(&err.to_string());
            return result;
        }

        if let Ok(SaveOutcome::Saved { row_id, child_rows }) = result {
            info!("Saved record {row_id} with {child_rows} child rows");
            self.context.notifier.notify_success("Record saved");

            if self.context.config.reload_after_save {
                let request = self.current_request()?;
                if let Err(err) = self.load_with(request, true).await {
                    warn!("Reloading record {row_id} after save failed: {err}");
                }
            }
        }

        result
    }

    async fn save_and_drain(&mut self) -> Result<SaveOutcome, FormError> {
        let context = &self.context;
        let form = self.form.as_mut().ok_or(FormError::NotLoaded)?;

        let validation = form.check_form_validation();
        if let Some(message) = validation.message {
            return Err(FormError::Validation(message));
        }

        self.state = SaveState::AwaitingParentSave;

        let retrieval = context.config.insert_id_retrieval();
        let compiled = form.compile_save(form.row_id(), retrieval, false);

        let row_id = match (compiled, form.row_id()) {
            (None, None) if self.queue.is_empty() => return Ok(SaveOutcome::NothingToSave),
            (None, None) => {
                return Err(FormError::Validation(
                    "The record needs at least one value before its rows can be saved".into(),
                ))
            }
            (None, Some(_)) if self.queue.is_empty() => return Ok(SaveOutcome::NothingToSave),
            (None, Some(row_id)) => row_id,
            (Some(compiled), current) => {
                let generated = match compiled.statement() {
                    Some(statement) => {
                        let rows = execute(context, &statement).await?;
                        current.map_or_else(|| generated_id(&rows), Ok)?
                    }
                    None => current.ok_or_else(|| {
                        ExecutionError::UnexpectedResponse("no record to attach files to".into())
                    })?,
                };

                form.update_root_property(FormProperty::RowId(Some(generated)));
                write_files(context, &compiled.attached_files, generated).await?;
                generated
            }
        };

        let mut child_rows = 0;
        while let Some(entry) = self.queue.front() {
            self.state = SaveState::DrainingQueue(child_rows);

            let mut compiled = entry.compiled.clone();
            compiled.substitute_parent_id(row_id);
            trace!("Draining {entry}");

            let child_row_id = match compiled.statement() {
                Some(statement) => {
                    let rows = execute(context, &statement).await?;
                    match entry.row_id {
                        Some(child_row_id) => child_row_id,
                        None => generated_id(&rows)?,
                    }
                }
                None => entry.row_id.ok_or_else(|| {
                    ExecutionError::UnexpectedResponse("no child row to attach files to".into())
                })?,
            };

            write_files(context, &compiled.attached_files, child_row_id).await?;

            self.queue.pop_front();
            child_rows += 1;
        }

        form.set_has_changed(false);

        Ok(SaveOutcome::Saved { row_id, child_rows })
    }

    /// Deletes a persisted row of a child form.
    ///
    /// On success pending saves of that row are dropped from the queue and the row is removed
    /// from the rows shown by the child form.
    pub async fn delete_child_row(
        &mut self,
        section: usize,
        field: usize,
        row_id: i64,
    ) -> Result<usize, FormError> {
        if self.state != SaveState::Idle {
            return Err(FormError::Busy);
        }

        let form = self.form.as_mut().ok_or(FormError::NotLoaded)?;
        let child = form.child_form(section, field)?;
        let child_form_id = child.id;

        let compiled = child.compile_delete(row_id);
        if let Some(statement) = compiled.statement() {
            if let Err(err) = execute(&self.context, &statement).await {
                self.context.notifier.notify_error(&err.to_string());
                return Err(err);
            }
        }

        let removed = self.queue.remove_matching(child_form_id, row_id);
        debug!("Deleted row {row_id} of child form {child_form_id}, dropped {removed} pending saves");

        let is_other_row = |row: &Row| row_id_of(row) != Some(row_id);
        if let Some(rows) = form
            .sections
            .get_mut(section)
            .and_then(|section| section.child_row_values.as_mut())
        {
            rows.retain(is_other_row);
        }
        form.update_child_form(section, field, |child| {
            child.child_form_row_values.retain(is_other_row);
        })?;

        Ok(removed)
    }
}

async fn execute<M, E, N>(
    context: &Context<M, E, N>,
    statement: &Statement,
) -> Result<Vec<Row>, FormError>
where
    E: Executor,
{
    trace!("Executing {statement}");

    context
        .executor
        .execute_statement(statement)
        .await
        .map_err(|err| {
            warn!("Statement failed: {err}");
            FormError::from(err)
        })
}

async fn write_files<M, E, N>(
    context: &Context<M, E, N>,
    files: &[AttachedFile],
    row_id: i64,
) -> Result<(), FormError>
where
    E: Executor,
{
    for file in files.iter().filter(|file| !file.inline) {
        debug!("Writing file of column '{}' for row {}", file.column, row_id);
        execute(context, &file.statement(row_id)).await?;
    }

    Ok(())
}

fn generated_id(rows: &[Row]) -> Result<i64, FormError> {
    rows.first().and_then(row_id_of).ok_or_else(|| {
        ExecutionError::UnexpectedResponse("insert did not return the generated id".into()).into()
    })
}
