//! Targets
//!
//! A target is a function the wizard can collect arguments for. Each one
//! declares its [`FunctionSignature`] once, up front, and is looked up by name
//! in a [`TargetRegistry`].

pub mod lindenmayer;
pub mod rerun;

pub use lindenmayer::Lindenmayer;
pub use rerun::Rerun;

use crate::schema::FunctionSignature;
use crate::wizard::Arguments;

use anyhow::Result;
use std::collections::HashMap;

pub trait Target {
    fn signature(&self) -> &FunctionSignature;

    /// Names the user may enter as function references.
    fn functions(&self) -> &[&'static str] {
        &[]
    }

    fn invoke(&self, arguments: &Arguments) -> Result<serde_json::Value>;
}

pub struct TargetRegistry {
    targets: HashMap<String, Box<dyn Target>>,
}

impl TargetRegistry {
    /// Create a new, empty TargetRegistry.
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Registers `target` under its signature's name, replacing any previous
    /// target of that name.
    pub fn register(&mut self, target: Box<dyn Target>) {
        let name = target.signature().name().to_string();
        tracing::debug!("Registering target '{}'", name);
        self.targets.insert(name, target);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Target> {
        self.targets.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the built-in targets.
pub fn default_registry() -> Result<TargetRegistry> {
    let mut registry = TargetRegistry::new();
    registry.register(Box::new(Lindenmayer::new()?));
    registry.register(Box::new(Rerun::new()?));

    tracing::info!("Default targets registered!");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.names(), ["lindenmayer", "rerun"]);
        assert!(registry.get("lindenmayer").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = TargetRegistry::new();
        registry.register(Box::new(Rerun::new().unwrap()));
        registry.register(Box::new(Rerun::new().unwrap()));
        assert_eq!(registry.names(), ["rerun"]);
    }
}
