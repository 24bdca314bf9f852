// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::VecDeque;
use std::fmt::{self, Display};

use crate::form::{CompiledStatement, FieldPath};
use crate::schema::FormId;

/// Compiled save of one child row, waiting for its parent to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChildQuery {
    /// Child form the row belongs to.
    pub child_form_id: FormId,

    /// Primary key of the row, `None` for rows which get inserted.
    pub row_id: Option<i64>,

    /// Position of the child form field within the parent form.
    pub path: FieldPath,

    /// Statement, parameters and files to write.
    pub compiled: CompiledStatement,
}

impl PendingChildQuery {
    /// Returns true if this entry saves the given row of the given child form.
    pub fn matches(&self, child_form_id: FormId, row_id: Option<i64>) -> bool {
        self.child_form_id == child_form_id && row_id.is_some() && self.row_id == row_id
    }
}

impl Display for PendingChildQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_id {
            Some(row_id) => write!(f, "<PendingChildQuery {} row {}>", self.child_form_id, row_id),
            None => write!(f, "<PendingChildQuery {} new row>", self.child_form_id),
        }
    }
}

/// Ordered child saves awaiting the parent save, drained in FIFO order.
///
/// Holds at most one entry per persisted child row: enqueueing a row again replaces the earlier
/// entry in place. New rows have no identity yet and are always appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingChildQueue {
    entries: VecDeque<PendingChildQuery>,
}

impl PendingChildQueue {
    /// Returns an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry or replaces the pending entry of the same row.
    pub fn enqueue(&mut self, query: PendingChildQuery) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(query.child_form_id, query.row_id))
        {
            Some(entry) => *entry = query,
            None => self.entries.push_back(query),
        }
    }

    /// Returns the entry to execute next.
    pub fn front(&self) -> Option<&PendingChildQuery> {
        self.entries.front()
    }

    /// Removes the entry executed last.
    pub fn pop_front(&mut self) -> Option<PendingChildQuery> {
        self.entries.pop_front()
    }

    /// Removes all entries saving the given row and returns how many were removed.
    pub fn remove_matching(&mut self, child_form_id: FormId, row_id: i64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !entry.matches(child_form_id, Some(row_id)));
        before - self.entries.len()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no child save is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the pending entries in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingChildQuery> {
        self.entries.iter()
    }

    /// Drops all pending entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
