use super::{PromptRequest, Prompter, Reporter};

use anyhow::{Context, bail};
use std::io::{self, BufRead, Write};
use std::time::Duration;

const SEPARATOR: &str = "-+-+-+-+-+-+-+-+-+-+-+-+-+-";

/// Line-oriented prompter over any reader/writer pair, stdin/stdout by default.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn render(&mut self, request: &PromptRequest<'_>) -> io::Result<()> {
        let doc = request
            .doc
            .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| "No documentation found.".to_string())
            .replace(">>>", "\n>>>");
        writeln!(self.output, "{}: {}", request.parameter, doc)?;

        let default = match request.default {
            Some(value) => format!(" Default argument = {} (press enter to keep)", value),
            None => String::new(),
        };
        if request.is_parameter {
            write!(
                self.output,
                "Please input a value for the parameter {} of type {}.{}... ",
                request.parameter, request.declared_type, default
            )?;
        } else {
            write!(self.output, "[{}]{}... ", request.declared_type, default)?;
        }
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        self.render(request)
            .context("Failed to write prompt")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            bail!("Input closed while waiting for '{}'", request.parameter);
        }
        writeln!(self.output, "{}", SEPARATOR).context("Failed to write prompt")?;

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Prints `title: message` to stderr. The timeout has no meaning on a console.
#[derive(Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, title: &str, message: &str, timeout: Option<Duration>) {
        tracing::debug!("Reporting '{}' (timeout {:?})", title, timeout);
        eprintln!("{}: {}", title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{TypeDescriptor, Value};
    use std::io::Cursor;

    #[test]
    fn test_prompt_reads_one_line() {
        let mut output = Vec::new();
        let mut prompter = ConsolePrompter::new(Cursor::new("5\nrest\n"), &mut output);
        let default = Value::Int(1);
        let request = PromptRequest {
            parameter: "n",
            declared_type: &TypeDescriptor::Int,
            default: Some(&default),
            function: "f",
            doc: Some("How many.\n   >>> 4"),
            is_parameter: true,
        };

        assert_eq!(prompter.prompt(&request).unwrap(), "5");
        drop(prompter);

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.starts_with("n: How many. \n>>> 4\n"));
        assert!(shown.contains("parameter n of type int. Default argument = 1"));
        assert!(shown.contains(SEPARATOR));
    }

    #[test]
    fn test_prompt_fails_on_closed_input() {
        let mut prompter = ConsolePrompter::new(Cursor::new(""), Vec::new());
        let request = PromptRequest {
            parameter: "Save",
            declared_type: &TypeDescriptor::Bool,
            default: None,
            function: "f",
            doc: None,
            is_parameter: false,
        };
        assert!(prompter.prompt(&request).is_err());
    }
}
