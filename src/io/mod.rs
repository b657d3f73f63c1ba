//! Input and output collaborators.
//!
//! The wizard never talks to a terminal directly. Every prompt goes through a
//! [`Prompter`] and every error or status message through a [`Reporter`], so
//! the same collection loop can be driven by a console, a GUI, or a script.

pub mod console;
pub mod scripted;

pub use console::{ConsolePrompter, ConsoleReporter};
pub use scripted::{RecordingReporter, Report, ScriptedPrompter};

use crate::schema::{TypeDescriptor, Value};
use std::time::Duration;

/// Everything an input collaborator needs to render one prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub parameter: &'a str,
    pub declared_type: &'a TypeDescriptor,
    pub default: Option<&'a Value>,
    pub function: &'a str,
    pub doc: Option<&'a str>,
    /// `false` for the wizard's own questions (restore, save, filename).
    pub is_parameter: bool,
}

pub trait Prompter {
    /// Blocks until the user supplies a raw token. A blank answer means
    /// "no answer given".
    ///
    /// An error means the input source itself is gone (closed stdin, exhausted
    /// script) and ends the session.
    fn prompt(&mut self, request: &PromptRequest<'_>) -> anyhow::Result<String>;
}

pub trait Reporter {
    /// Shows a message. `timeout` is how long a transient message stays
    /// visible; `None` keeps it until dismissed.
    fn report(&mut self, title: &str, message: &str, timeout: Option<Duration>);
}

impl<T: Prompter + ?Sized> Prompter for Box<T> {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        (**self).prompt(request)
    }
}

impl<T: Reporter + ?Sized> Reporter for Box<T> {
    fn report(&mut self, title: &str, message: &str, timeout: Option<Duration>) {
        (**self).report(title, message, timeout)
    }
}
