use super::{PromptRequest, Prompter, Reporter};

use anyhow::{Context, anyhow};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Replays a fixed sequence of answers, one per prompt.
///
/// Used for non-interactive runs (`--answers`) and to drive the wizard in
/// tests. Every prompt is recorded by parameter name.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Loads answers from a file, one token per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read answers from '{}'", path.display()))?;
        Ok(Self::new(content.lines()))
    }

    /// Parameter names prompted so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        self.asked.push(request.parameter.to_string());
        let answer = self
            .answers
            .pop_front()
            .ok_or_else(|| anyhow!("No scripted answer left for '{}'", request.parameter))?;
        tracing::debug!("Scripted answer for '{}': {}", request.parameter, answer);
        Ok(answer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub message: String,
    pub timeout: Option<Duration>,
}

/// Keeps every report for later inspection.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: Vec<Report>,
}

impl RecordingReporter {
    pub fn titles(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.title.as_str()).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, title: &str, message: &str, timeout: Option<Duration>) {
        self.reports.push(Report {
            title: title.to_string(),
            message: message.to_string(),
            timeout,
        });
    }
}
