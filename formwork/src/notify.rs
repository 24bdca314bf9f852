// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{error, info};

/// Fire-and-forget user feedback sink.
///
/// The form engine never branches on the outcome of a notification.
pub trait Notifier: Send + Sync {
    /// Report an error message to the user.
    fn notify_error(&self, message: &str);

    /// Report a success message to the user.
    fn notify_success(&self, message: &str);
}

/// Notifier writing all feedback into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!("{message}");
    }

    fn notify_success(&self, message: &str) {
        info!("{message}");
    }
}
