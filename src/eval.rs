//! Safe Evaluator
//!
//! Turns a raw token into a [`Value`] using `evalexpr`, after a normalisation
//! pass that lets users write host-style literals:
//!
//! - `True` / `False` / `None` become `true` / `false` / `()`
//! - `'single quoted'` strings become `"double quoted"` ones
//! - `[a, b]` list literals become `seq((), a, b)`, so `[5]`, `[]` and `[[1, 2]]`
//!   keep their exact nesting
//!
//! String contents are never rewritten. A bare identifier naming one of the
//! target's registered functions evaluates to [`Value::Function`].
//!
//! Evaluation failures never propagate: [`SafeEvaluator::evaluate`] reports
//! them through the output collaborator and returns `None`, the "no value"
//! sentinel.

use crate::io::Reporter;
use crate::schema::Value;

use anyhow::{Result, anyhow, bail};
use evalexpr::{
    ContextWithMutableFunctions, DefaultNumericTypes, Function, HashMapContext,
    Value as EvalValue,
};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

static RE_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(True|False|None)\b").unwrap());

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Name of the sequence constructor that list literals are rewritten to.
const SEQ_FUNCTION: &str = "seq";

pub struct SafeEvaluator {
    context: HashMapContext<DefaultNumericTypes>,
    functions: HashSet<String>,
}

impl SafeEvaluator {
    pub fn new() -> Self {
        let mut context: HashMapContext<DefaultNumericTypes> = HashMapContext::new();
        // List literals call `seq` with a leading `()` marker; `[]` passes the
        // marker alone.
        context
            .set_function(
                SEQ_FUNCTION.to_string(),
                Function::new(|argument: &EvalValue| {
                    Ok(match argument {
                        EvalValue::Tuple(items) => {
                            EvalValue::Tuple(items.iter().skip(1).cloned().collect())
                        }
                        _ => EvalValue::Tuple(Vec::new()),
                    })
                }),
            )
            .expect("seq is a valid function name");

        Self {
            context,
            functions: HashSet::new(),
        }
    }

    /// Registers names that evaluate to function references.
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn set_functions<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = names.into_iter().map(Into::into).collect();
    }

    /// Evaluates `token`, returning the error instead of reporting it.
    pub fn parse(&self, token: &str) -> Result<Value> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            bail!("No value was given.");
        }

        if RE_IDENTIFIER.is_match(trimmed) && self.functions.contains(trimmed) {
            return Ok(Value::Function(trimmed.to_string()));
        }

        let expression = normalise(trimmed)?;
        debug!("Evaluating '{}' as '{}'", trimmed, expression);

        let result = evalexpr::eval_with_context(&expression, &self.context)
            .map_err(|e| anyhow!("{}", e))?;
        Ok(from_eval(result))
    }

    /// Evaluates `token`; on failure reports the error and returns `None`.
    pub fn evaluate<R: Reporter + ?Sized>(
        &self,
        token: &str,
        reporter: &mut R,
        timeout: Duration,
    ) -> Option<Value> {
        match self.parse(token) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Could not evaluate '{}': {}", token, e);
                reporter.report(
                    "Couldn't parse input.",
                    &format!(" Exception: {}", e),
                    Some(timeout),
                );
                None
            }
        }
    }
}

impl Default for SafeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn from_eval(value: EvalValue) -> Value {
    match value {
        EvalValue::String(s) => Value::Str(s),
        EvalValue::Float(f) => Value::Float(f),
        EvalValue::Int(i) => Value::Int(i),
        EvalValue::Boolean(b) => Value::Bool(b),
        EvalValue::Tuple(items) => Value::Seq(items.into_iter().map(from_eval).collect()),
        EvalValue::Empty => Value::None,
    }
}

/// Rewrites host-style literal syntax into an `evalexpr` expression.
fn normalise(token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len() + 8);
    let mut code = String::new();
    let mut chars = token.chars();
    // Set right after `[` until the first element (or `]`) shows up.
    let mut open_list = false;

    while let Some(ch) = chars.next() {
        if open_list && !ch.is_whitespace() {
            if ch != ']' {
                code.push_str(", ");
            }
            open_list = false;
        }
        match ch {
            '"' | '\'' => {
                out.push_str(&rewrite_keywords(&code));
                code.clear();
                read_string(&mut chars, ch, &mut out)?;
            }
            '[' => {
                code.push_str(&format!("{}(()", SEQ_FUNCTION));
                open_list = true;
            }
            ']' => code.push(')'),
            _ => code.push(ch),
        }
    }

    out.push_str(&rewrite_keywords(&code));
    Ok(out)
}

fn rewrite_keywords(code: &str) -> Cow<'_, str> {
    RE_KEYWORDS.replace_all(code, |caps: &regex::Captures| match &caps[1] {
        "True" => "true",
        "False" => "false",
        _ => "()",
    })
}

/// Copies a string literal opened by `quote` as a double-quoted literal.
fn read_string(chars: &mut std::str::Chars<'_>, quote: char, out: &mut String) -> Result<()> {
    out.push('"');
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| anyhow!("Unterminated string literal"))?;
                match escaped {
                    '\'' => out.push('\''),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '"' if quote == '\'' => out.push_str("\\\""),
            c if c == quote => {
                out.push('"');
                return Ok(());
            }
            c => out.push(c),
        }
    }
    bail!("Unterminated string literal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RecordingReporter;

    fn eval(token: &str) -> Value {
        SafeEvaluator::new().parse(token).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(eval("5"), Value::Int(5));
        assert_eq!(eval(" 25.5 "), Value::Float(25.5));
        assert_eq!(eval("True"), Value::Bool(true));
        assert_eq!(eval("false"), Value::Bool(false));
        assert_eq!(eval("None"), Value::None);
        assert_eq!(eval("\"hi\""), Value::str("hi"));
        assert_eq!(eval("'auto'"), Value::str("auto"));
    }

    #[test]
    fn test_expressions() {
        assert_eq!(eval("2 * 3 + 1"), Value::Int(7));
        assert_eq!(eval("math::sqrt(4.0)"), Value::Float(2.0));
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            eval("(255, 0, 10)"),
            Value::Seq(vec![Value::Int(255), Value::Int(0), Value::Int(10)])
        );
        assert_eq!(eval("[5]"), Value::Seq(vec![Value::Int(5)]));
        assert_eq!(eval("[]"), Value::Seq(vec![]));
        assert_eq!(eval("[ ]"), Value::Seq(vec![]));
        assert_eq!(
            eval("[[1, 2]]"),
            Value::Seq(vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])])
        );
        assert_eq!(
            eval("[(1, 2)]"),
            Value::Seq(vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])])
        );
        assert_eq!(eval("[[]]"), Value::Seq(vec![Value::Seq(vec![])]));
        assert_eq!(
            eval("['a', None]"),
            Value::Seq(vec![Value::str("a"), Value::None])
        );
        assert_eq!(
            eval("[[1, 2], [3]]"),
            Value::Seq(vec![
                Value::Seq(vec![Value::Int(1), Value::Int(2)]),
                Value::Seq(vec![Value::Int(3)]),
            ])
        );
    }

    #[test]
    fn test_string_contents_are_untouched() {
        assert_eq!(eval("\"F+[[X]-X]\""), Value::str("F+[[X]-X]"));
        assert_eq!(eval("'None of True'"), Value::str("None of True"));
        assert_eq!(eval("'say \"hi\"'"), Value::str("say \"hi\""));
    }

    #[test]
    fn test_function_references() {
        let evaluator = SafeEvaluator::new().with_functions(["rainbow"]);
        assert_eq!(
            evaluator.parse("rainbow").unwrap(),
            Value::Function("rainbow".into())
        );
        assert!(evaluator.parse("unknown_name").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let evaluator = SafeEvaluator::new();
        for value in [
            Value::Int(-3),
            Value::Float(0.25),
            Value::str("a \"quoted\" word"),
            Value::Bool(false),
            Value::None,
            Value::Seq(vec![Value::Int(1)]),
            Value::Seq(vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])]),
            Value::Seq(vec![Value::Seq(vec![])]),
            Value::Seq(vec![Value::str("x"), Value::Seq(vec![])]),
        ] {
            assert_eq!(evaluator.parse(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn test_failure_reports_and_returns_sentinel() {
        let mut reporter = RecordingReporter::default();
        let result = SafeEvaluator::new().evaluate("5 +", &mut reporter, Duration::from_secs(1));

        assert_eq!(result, None);
        assert_eq!(reporter.titles(), ["Couldn't parse input."]);
        assert!(reporter.reports[0].message.starts_with(" Exception: "));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(SafeEvaluator::new().parse("'abc").is_err());
    }
}
