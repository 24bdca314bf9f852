// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sequencing of loads and saves of one top-level form.
mod orchestrator;
mod queue;

pub use orchestrator::{LoadOutcome, LoadTicket, SaveOrchestrator, SaveOutcome, SaveState};
pub use queue::{PendingChildQuery, PendingChildQueue};
