// SPDX-License-Identifier: AGPL-3.0-or-later

mod executor;
mod forms;
mod metadata;
mod notifier;

pub use executor::RecordingExecutor;
pub use forms::{customer_form, order_form};
pub use metadata::order_metadata;
pub use notifier::RecordingNotifier;
