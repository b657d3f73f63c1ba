use super::types::AppConfig;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    load_config_from_string(&content)
        .with_context(|| format!("Failed to parse '{}'", path.display()))
}

/// Load configuration from a string
pub fn load_config_from_string(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No configuration at '{}', using defaults", path.display());
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_string("").unwrap();
        assert!(config.wizard.enable_saves);
        assert_eq!(config.wizard.error_timeout(), Duration::from_millis(2500));
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = load_config_from_string(
            r#"
            [wizard]
            enable_saves = false
            error_message_timeout = 1
            saves_root = "saves"

            [targets.lindenmayer.overrides]
            _max_symbols = 500000
            fg_color = [10, 20, 30]
            "#,
        )
        .unwrap();

        assert!(!config.wizard.enable_saves);
        assert_eq!(config.wizard.error_message_timeout, 1.0);
        assert_eq!(config.wizard.saves_root, Path::new("saves"));

        let overrides = config.targets["lindenmayer"].overrides.as_ref().unwrap();
        assert_eq!(overrides["_max_symbols"], serde_json::json!(500000));
        assert_eq!(overrides["fg_color"], serde_json::json!([10, 20, 30]));
    }

    #[test]
    fn test_missing_file_is_default_but_bad_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paramwiz.toml");
        assert!(load_config_or_default(&path).unwrap().wizard.enable_saves);
        assert!(load_config(&path).is_err());

        fs::write(&path, "[wizard]\nenable_saves = \"yes\"\n").unwrap();
        assert!(load_config_or_default(&path).is_err());
    }
}
