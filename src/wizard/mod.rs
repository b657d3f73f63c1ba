//! Interactive Collection Loop
//!
//! Drives one run of the wizard for a target function:
//!
//! 1. offer to restore a saved configuration (only when saves are enabled and
//!    the function's save directory holds at least one save),
//! 2. prompt for every parameter that is neither overridden, internal, nor
//!    restored, re-prompting until the answer evaluates and type-checks,
//! 3. offer to save the tokens that produced the final configuration,
//! 4. invoke the target with the collected arguments merged with the
//!    caller's overrides.
//!
//! Every user-facing failure is reported through the [`Reporter`] and
//! recovered by re-prompting. Only a failing [`Prompter`] (the input source is
//! gone) surfaces as an `Err`.

pub mod arguments;

pub use arguments::Arguments;

use crate::eval::SafeEvaluator;
use crate::filename::validate_filename;
use crate::io::{PromptRequest, Prompter, Reporter};
use crate::schema::{FunctionSignature, ParameterSpec, TypeDescriptor, Value};
use crate::store::{ConfigurationStore, SavedConfiguration};

use anyhow::{Result, bail};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_ERROR_TIMEOUT: Duration = Duration::from_millis(2500);

/// Outcome of the collection phase of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    /// Values for every parameter not satisfied by an override.
    pub arguments: Arguments,
    /// Raw tokens of entered or restored values, in prompt order. This is
    /// what a save persists.
    pub tokens: Vec<(String, String)>,
    pub restored_from: Option<String>,
    pub saved_to: Option<PathBuf>,
}

/// A value obtained from a saved configuration. Parameters that were left at
/// their default when saving have no token.
#[derive(Debug)]
struct Restored {
    value: Value,
    token: Option<String>,
}

enum Answer {
    /// The user gave no answer and the prompt had a default.
    Default(Value),
    Entered(Value, String),
}

impl Answer {
    fn value(&self) -> &Value {
        match self {
            Answer::Default(value) | Answer::Entered(value, _) => value,
        }
    }
}

pub struct Wizard<P, R> {
    prompter: P,
    reporter: R,
    evaluator: SafeEvaluator,
    saves_root: PathBuf,
    enable_saves: bool,
    error_timeout: Duration,
}

impl<P: Prompter, R: Reporter> Wizard<P, R> {
    pub fn new(prompter: P, reporter: R) -> Self {
        Self {
            prompter,
            reporter,
            evaluator: SafeEvaluator::new(),
            saves_root: PathBuf::from("."),
            enable_saves: true,
            error_timeout: DEFAULT_ERROR_TIMEOUT,
        }
    }

    pub fn saves(mut self, enabled: bool) -> Self {
        self.enable_saves = enabled;
        self
    }

    pub fn saves_root<T: AsRef<Path>>(mut self, root: T) -> Self {
        self.saves_root = root.as_ref().to_path_buf();
        self
    }

    pub fn error_timeout(mut self, timeout: Duration) -> Self {
        self.error_timeout = timeout;
        self
    }

    /// Names that evaluate to function references.
    pub fn functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evaluator.set_functions(names);
        self
    }

    pub fn set_saves(&mut self, enabled: bool) {
        self.enable_saves = enabled;
    }

    pub fn set_functions<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evaluator.set_functions(names);
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Collects arguments and invokes `target` with them.
    ///
    /// Returns `Ok(None)` when the target fails: its error (or panic) is
    /// reported as a "Runtime Exception" and does not propagate.
    pub fn run<T, F>(
        &mut self,
        signature: &FunctionSignature,
        overrides: &Arguments,
        target: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce(&Arguments) -> Result<T>,
    {
        let collection = self.collect(signature, overrides)?;
        let mut arguments = collection.arguments;
        arguments.merge(overrides);

        info!(
            "Invoking '{}' with {} arguments",
            signature.name(),
            arguments.len()
        );
        debug!("Arguments: {}", arguments.to_json());
        let message = match panic::catch_unwind(AssertUnwindSafe(|| target(&arguments))) {
            Ok(Ok(result)) => return Ok(Some(result)),
            Ok(Err(e)) => format!("{:?}", e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        error!("'{}' failed: {}", signature.name(), message);
        self.reporter.report("Runtime Exception", &message, None);
        Ok(None)
    }

    /// Runs the interactive part of the wizard without invoking anything.
    pub fn collect(
        &mut self,
        signature: &FunctionSignature,
        overrides: &Arguments,
    ) -> Result<Collection> {
        info!("Collecting arguments for '{}'", signature.name());
        let store = ConfigurationStore::new(&self.saves_root, signature.name());

        let (mut restored, restored_from) = if self.enable_saves {
            self.restore(signature, overrides, &store)?
        } else {
            (HashMap::new(), None)
        };

        let mut collection = Collection {
            restored_from,
            ..Collection::default()
        };

        for param in signature.params() {
            if overrides.contains(&param.name) {
                debug!("'{}' is overridden", param.name);
                continue;
            }

            if param.is_internal() {
                if let Some(default) = &param.default {
                    collection.arguments.insert(&param.name, default.clone());
                }
                continue;
            }

            if let Some(Restored { value, token }) = restored.remove(&param.name) {
                debug!("'{}' restored as {}", param.name, value);
                collection.arguments.insert(&param.name, value);
                if let Some(token) = token {
                    collection.tokens.push((param.name.clone(), token));
                }
                continue;
            }

            match self.ask_parameter(signature.name(), param)? {
                Answer::Default(value) => {
                    collection.arguments.insert(&param.name, value);
                }
                Answer::Entered(value, token) => {
                    collection.arguments.insert(&param.name, value);
                    collection.tokens.push((param.name.clone(), token));
                }
            }
        }

        if self.enable_saves {
            collection.saved_to = self.save(
                signature,
                &store,
                &collection.tokens,
                collection.restored_from.as_deref(),
            )?;
        }

        Ok(collection)
    }

    fn restore(
        &mut self,
        signature: &FunctionSignature,
        overrides: &Arguments,
        store: &ConfigurationStore,
    ) -> Result<(HashMap<String, Restored>, Option<String>)> {
        if !store.exists() {
            return Ok((HashMap::new(), None));
        }

        let files = match store.list() {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list saved configurations: {:#}", e);
                return Ok((HashMap::new(), None));
            }
        };
        let Some(most_recent) = files.first() else {
            return Ok((HashMap::new(), None));
        };

        if !self.ask_bool(
            signature.name(),
            "Restore",
            "Should the configuration be restored from a saved file?",
            false,
        )? {
            return Ok((HashMap::new(), None));
        }

        let str_type = TypeDescriptor::Str;
        let default = Value::str(most_recent);
        let doc = format!(
            "Enter the name of the saved configuration.\n>>> Available Files: {}",
            files.join("; ")
        );
        let request = PromptRequest {
            parameter: "Filename",
            declared_type: &str_type,
            default: Some(&default),
            function: signature.name(),
            doc: Some(&doc),
            is_parameter: false,
        };

        let name = loop {
            let answer = self.read_value(&request)?;
            if !validate_filename(answer.value(), &mut self.reporter, self.error_timeout) {
                continue;
            }
            if let Some(name) = answer.value().as_str() {
                if files.iter().any(|f| f == name) && store.path_for(name).is_file() {
                    break name.to_string();
                }
            }
            self.report_error("There exists no file with the given filename.");
        };

        let loaded = store
            .restore(&name)
            .and_then(|saved| self.load(signature, overrides, &saved));
        match loaded {
            Ok(restored) => {
                info!("Restored {} values from '{}'", restored.len(), name);
                Ok((restored, Some(name)))
            }
            Err(e) => {
                warn!("Failed to restore '{}': {:#}", name, e);
                self.report_error(&format!(
                    "Could not restore '{}': {:#}. Every parameter will be prompted.",
                    name, e
                ));
                Ok((HashMap::new(), None))
            }
        }
    }

    /// Evaluates and type-checks the saved tokens. Any failure rejects the
    /// whole configuration.
    fn load(
        &self,
        signature: &FunctionSignature,
        overrides: &Arguments,
        saved: &SavedConfiguration,
    ) -> Result<HashMap<String, Restored>> {
        for (key, _) in &saved.values {
            if signature.param(key).is_none() {
                debug!("Ignoring saved value for unknown parameter '{}'", key);
            }
        }

        let mut restored = HashMap::new();
        for param in signature.params() {
            if overrides.contains(&param.name) || param.is_internal() {
                continue;
            }

            match saved.get(&param.name) {
                Some(token) => {
                    let (value, token) = match self.evaluator.parse(token) {
                        Ok(value) => (value, token.trim().to_string()),
                        // Hand-edited files may hold bare text for string parameters.
                        Err(_) if param.declared_type.accepts(&Value::str(token.trim())) => {
                            let value = Value::str(token.trim());
                            let token = value.to_string();
                            (value, token)
                        }
                        Err(e) => {
                            return Err(e.context(format!("Saved value of '{}'", param.name)));
                        }
                    };
                    if !param.declared_type.accepts(&value) {
                        bail!(
                            "Saved value {} of '{}' is not a valid {}",
                            value,
                            param.name,
                            param.declared_type
                        );
                    }
                    restored.insert(
                        param.name.clone(),
                        Restored {
                            value,
                            token: Some(token),
                        },
                    );
                }
                // Values left at their default are not written when saving.
                None => {
                    if let Some(default) = &param.default {
                        restored.insert(
                            param.name.clone(),
                            Restored {
                                value: default.clone(),
                                token: None,
                            },
                        );
                    }
                }
            }
        }
        Ok(restored)
    }

    fn save(
        &mut self,
        signature: &FunctionSignature,
        store: &ConfigurationStore,
        tokens: &[(String, String)],
        restored_from: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        if !self.ask_bool(
            signature.name(),
            "Save",
            "Should the configuration be saved in a file?",
            true,
        )? {
            return Ok(None);
        }

        let str_type = TypeDescriptor::Str;
        let default = Value::str(restored_from.unwrap_or(signature.name()));
        let request = PromptRequest {
            parameter: "Filename",
            declared_type: &str_type,
            default: Some(&default),
            function: signature.name(),
            doc: Some("Please provide a name for the saved configuration."),
            is_parameter: false,
        };
        let saved = SavedConfiguration {
            values: tokens.to_vec(),
        };

        loop {
            let answer = self.read_value(&request)?;
            if !validate_filename(answer.value(), &mut self.reporter, self.error_timeout) {
                continue;
            }
            let Some(name) = answer.value().as_str() else {
                continue;
            };
            match store.save(name, &saved) {
                Ok(path) => return Ok(Some(path)),
                Err(e) => {
                    warn!("Failed to save '{}': {:#}", name, e);
                    self.report_error(&format!("{:#}", e));
                }
            }
        }
    }

    fn ask_parameter(&mut self, function: &str, param: &ParameterSpec) -> Result<Answer> {
        let request = PromptRequest {
            parameter: &param.name,
            declared_type: &param.declared_type,
            default: param.default.as_ref(),
            function,
            doc: param.doc.as_deref(),
            is_parameter: true,
        };
        self.ask(&request)
    }

    /// Yes/no question of the wizard itself. Non-boolean answers re-prompt.
    fn ask_bool(&mut self, function: &str, name: &str, doc: &str, default: bool) -> Result<bool> {
        let bool_type = TypeDescriptor::Bool;
        let default = Value::Bool(default);
        let request = PromptRequest {
            parameter: name,
            declared_type: &bool_type,
            default: Some(&default),
            function,
            doc: Some(doc),
            is_parameter: false,
        };
        Ok(self.ask(&request)?.value().as_bool().unwrap_or(false))
    }

    /// Prompts until the answer satisfies the request's declared type.
    fn ask(&mut self, request: &PromptRequest<'_>) -> Result<Answer> {
        loop {
            let answer = self.read_value(request)?;
            if matches!(answer, Answer::Default(_))
                || request.declared_type.accepts(answer.value())
            {
                return Ok(answer);
            }
            self.report_error(&format!(
                "Type validation failed: {} is not a valid {}. Rolling back...",
                answer.value(),
                request.declared_type
            ));
        }
    }

    /// Prompts until the answer is blank with a default, or evaluates.
    fn read_value(&mut self, request: &PromptRequest<'_>) -> Result<Answer> {
        loop {
            let raw = self.prompter.prompt(request)?;
            let token = raw.trim();

            if token.is_empty() {
                if let Some(default) = request.default {
                    debug!("'{}' left at its default {}", request.parameter, default);
                    return Ok(Answer::Default(default.clone()));
                }
                self.report_error("No value was given.");
                continue;
            }

            if let Some(value) = self
                .evaluator
                .evaluate(token, &mut self.reporter, self.error_timeout)
            {
                return Ok(Answer::Entered(value, token.to_string()));
            }
        }
    }

    fn report_error(&mut self, message: &str) {
        self.reporter
            .report("Error", message, Some(self.error_timeout));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
