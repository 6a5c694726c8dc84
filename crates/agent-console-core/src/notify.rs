//! Notification severity and a tracing-backed default sink.

use crate::traits::Notifier;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// Notifier that forwards messages to `tracing`.
///
/// Useful for headless runs and demos where no message UI exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, text: String) {
        match severity {
            Severity::Error => tracing::error!("{text}"),
            Severity::Success | Severity::Info => tracing::info!("{text}"),
        }
    }
}
