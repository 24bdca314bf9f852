// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Mutex;

use crate::notify::Notifier;

/// Notifier keeping all messages for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
    successes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn notify_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }
}
