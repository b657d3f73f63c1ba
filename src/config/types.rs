//! Configuration Type Definitions
//!
//! Application configuration, deserialised from an optional TOML file:
//!
//! ```toml
//! [wizard]
//! enable_saves = true
//! error_message_timeout = 2.5
//! saves_root = "."
//!
//! [targets.lindenmayer.overrides]
//! _max_symbols = 500000
//! ```
//!
//! Every section and field is optional.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wizard: WizardConfig,

    /// Per-target settings, keyed by target name.
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WizardConfig {
    /// Whether the restore and save questions are asked.
    #[serde(default = "default_enable_saves")]
    pub enable_saves: bool,

    /// Seconds a transient error message stays visible.
    #[serde(default = "default_error_message_timeout")]
    pub error_message_timeout: f64,

    /// Directory holding the `<function>-saves` directories.
    #[serde(default = "default_saves_root")]
    pub saves_root: PathBuf,
}

impl WizardConfig {
    pub fn error_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.error_message_timeout.max(0.0))
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            enable_saves: default_enable_saves(),
            error_message_timeout: default_error_message_timeout(),
            saves_root: default_saves_root(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TargetConfig {
    /// Values passed to the target without prompting.
    pub overrides: Option<HashMap<String, serde_json::Value>>,
}

fn default_enable_saves() -> bool {
    true
}

fn default_error_message_timeout() -> f64 {
    2.5
}

fn default_saves_root() -> PathBuf {
    PathBuf::from(".")
}
