//! Configuration Module

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_string, load_config_or_default};
pub use types::{AppConfig, TargetConfig, WizardConfig};
pub use validation::{parse_override, target_overrides, validate_config};
