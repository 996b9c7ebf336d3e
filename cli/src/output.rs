//! Terminal output utilities for styled CLI output.
//!
//! [`Output`] also implements [`Notifier`], so notices raised by the
//! controllers show up the same way as the CLI's own messages.

use std::fmt::Display;

use console::{Term, style};
use qrdesk_business::{Notice, Notifier, Severity};

/// Terminal output helper for consistent styled output.
pub struct Output {
    term: Term,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper writing to stdout.
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Print a success message with a green checkmark.
    pub fn success(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("✓").green().bold(), message)),
        );
    }

    /// Print an error message with a red X.
    pub fn error(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("✗").red().bold(), message)),
        );
    }

    /// Print a warning message with a yellow warning sign.
    pub fn warning(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("⚠").yellow().bold(), message)),
        );
    }

    /// Print an info message with a blue info icon.
    pub fn info(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("ℹ").blue().bold(), message)),
        );
    }

    /// Print a plain message without any prefix.
    pub fn print(&self, message: impl Display) {
        drop(self.term.write_line(&message.to_string()));
    }

    /// Print a header with emphasis.
    pub fn header(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&style(message).bold().cyan().to_string()),
        );
    }

    /// Print a labeled value with indentation.
    pub fn labeled_indent(&self, label: impl Display, value: impl Display, indent: usize) {
        let spaces = " ".repeat(indent);
        drop(
            self.term
                .write_line(&format!("{spaces}{}: {}", style(label).dim(), value)),
        );
    }

    /// Print a dim/muted message.
    pub fn dim(&self, message: impl Display) {
        drop(self.term.write_line(&style(message).dim().to_string()));
    }

    /// Print a count summary.
    pub fn count(&self, label: impl Display, count: usize) {
        drop(self.term.write_line(&format!(
            "{}: {}",
            style(label).dim(),
            style(count).cyan().bold()
        )));
    }
}

impl Notifier for Output {
    fn notify(&self, notice: Notice) {
        let line = format!("{}: {}", style(&notice.title).bold(), notice.description);
        match notice.severity {
            Severity::Success => self.success(line),
            Severity::Info => self.info(line),
            Severity::Warning => self.warning(line),
            Severity::Error => self.error(line),
        }
    }
}
