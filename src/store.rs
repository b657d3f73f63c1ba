//! Configuration Store
//!
//! Saved configurations of a function live in `<root>/<function>-saves/`, one
//! file per configuration named `<name>.<function>`. Each file is a small TOML
//! document holding the raw tokens that were entered, keyed by parameter name
//! and kept in prompt order:
//!
//! ```toml
//! function = "lindenmayer"
//!
//! [values]
//! axiom = '"X"'
//! depth = "4"
//! ```
//!
//! Tokens are stored verbatim and re-evaluated on restore.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Raw tokens of one saved run, in prompt order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedConfiguration {
    pub values: Vec<(String, String)>,
}

impl SavedConfiguration {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, token)| token.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    function: String,
    #[serde(default)]
    values: toml::Table,
}

pub struct ConfigurationStore {
    function: String,
    dir: PathBuf,
}

impl ConfigurationStore {
    pub fn new<P: AsRef<Path>>(root: P, function: &str) -> Self {
        Self {
            function: function.to_string(),
            dir: root.as_ref().join(format!("{}-saves", function)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, self.function))
    }

    /// Names of the saved configurations, most recently modified first.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let suffix = format!(".{}", self.function);
        let mut saves: Vec<(SystemTime, String)> = Vec::new();

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list '{}'", self.dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(name) = file_name.strip_suffix(&suffix) else {
                continue;
            };
            let modified = entry.metadata()?.modified()?;
            saves.push((modified, name.to_string()));
        }

        saves.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(saves.into_iter().map(|(_, name)| name).collect())
    }

    pub fn restore(&self, name: &str) -> Result<SavedConfiguration> {
        let path = self.path_for(name);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let file: SaveFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;

        if file.function != self.function {
            bail!(
                "'{}' was saved for '{}', not '{}'",
                path.display(),
                file.function,
                self.function
            );
        }

        let mut values = Vec::with_capacity(file.values.len());
        for (key, value) in file.values {
            let Some(token) = value.as_str() else {
                bail!("Value of '{}' in '{}' is not a string", key, path.display());
            };
            values.push((key, token.to_string()));
        }

        debug!("Restored {} values from '{}'", values.len(), path.display());
        Ok(SavedConfiguration { values })
    }

    /// Writes `config` under `name`, replacing any previous save of that name.
    /// The save directory is created on first use.
    pub fn save(&self, name: &str, config: &SavedConfiguration) -> Result<PathBuf> {
        if !self.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create '{}'", self.dir.display()))?;
        }

        let file = SaveFile {
            function: self.function.clone(),
            values: config
                .values
                .iter()
                .map(|(key, token)| (key.clone(), toml::Value::String(token.clone())))
                .collect(),
        };
        let content = toml::to_string(&file).context("Failed to serialise configuration")?;

        let path = self.path_for(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        info!("Saved configuration '{}' to '{}'", name, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn config(pairs: &[(&str, &str)]) -> SavedConfiguration {
        SavedConfiguration {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigurationStore::new(root.path(), "f");
        assert!(!store.exists());

        let saved = config(&[("n", "5"), ("label", "\"multi\nline\""), ("alpha", "[1, 2]")]);
        let path = store.save("first", &saved).unwrap();

        assert!(store.exists());
        assert_eq!(path, root.path().join("f-saves").join("first.f"));
        assert_eq!(store.restore("first").unwrap(), saved);
    }

    #[test]
    fn test_save_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigurationStore::new(root.path(), "f");

        store.save("cfg", &config(&[("n", "1"), ("m", "2")])).unwrap();
        store.save("cfg", &config(&[("n", "3")])).unwrap();

        assert_eq!(store.restore("cfg").unwrap(), config(&[("n", "3")]));
    }

    #[test]
    fn test_list_orders_by_modification_time() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigurationStore::new(root.path(), "f");
        assert!(store.list().unwrap().is_empty());

        store.save("old", &config(&[])).unwrap();
        store.save("new", &config(&[])).unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(store.path_for("old"))
            .unwrap()
            .set_modified(now - Duration::from_secs(60))
            .unwrap();
        File::options()
            .write(true)
            .open(store.path_for("new"))
            .unwrap()
            .set_modified(now)
            .unwrap();

        assert_eq!(store.list().unwrap(), ["new", "old"]);
    }

    #[test]
    fn test_restore_failures() {
        let root = tempfile::tempdir().unwrap();
        let store = ConfigurationStore::new(root.path(), "f");
        assert!(store.restore("missing").is_err());

        store.save("x", &config(&[("n", "1")])).unwrap();
        fs::write(store.path_for("x"), "function = \"g\"\n").unwrap();
        assert!(store.restore("x").is_err());

        fs::write(store.path_for("x"), "function = \"f\"\n[values]\nn = 1\n").unwrap();
        assert!(store.restore("x").is_err());

        fs::write(store.path_for("x"), "not toml at all [").unwrap();
        assert!(store.restore("x").is_err());
    }
}
