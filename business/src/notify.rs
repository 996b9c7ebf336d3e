//! User-facing notices.
//!
//! Controllers never print. They hand a [`Notice`] to the injected
//! [`Notifier`], which the front end turns into whatever it shows the user.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A short titled message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, description)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Delivers notices to the user, enabling mock implementations for testing.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info | Severity::Success => info!("{notice}"),
            Severity::Warning => warn!("{notice}"),
            Severity::Error => error!("{notice}"),
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Titles of all notices, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }

    /// Drains the recorded notices.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn recording_notifier_keeps_order_and_drains() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::success("Saved", "one"));
        notifier.notify(Notice::error("Error", "two"));

        assert_eq!(notifier.titles(), vec!["Saved", "Error"]);
        let taken = notifier.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[1].severity, Severity::Error);
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn log_notifier_accepts_every_severity() {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        for notice in [
            Notice::info("Info", "i"),
            Notice::success("QR Code Scanned", "ok"),
            Notice::warning("No Camera Found", "w"),
            Notice::error("Export Failed", "e"),
        ] {
            notifier.notify(notice);
        }
    }

    #[test]
    fn notice_display() {
        let notice = Notice::warning("No Camera Found", "Plug one in");
        assert_eq!(notice.to_string(), "No Camera Found: Plug one in");
    }
}
