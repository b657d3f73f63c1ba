use crate::schema::Value;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Validated parameter values keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: HashMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Adds every entry of `other`, replacing entries with the same name.
    pub fn merge(&mut self, other: &Arguments) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Extracts a typed argument.
    ///
    /// The value goes through `serde_json`, so anything deserialisable from
    /// the value's JSON form works: numbers, strings, `Option<T>`, `Vec<T>`
    /// and tuples such as `(u8, u8, u8)`. Function references extract as
    /// their name.
    pub fn extract<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow!("Missing argument '{}'", name))?;
        serde_json::from_value(value.to_json())
            .with_context(|| format!("Argument '{}' has an unexpected shape: {}", name, value))
    }

    /// Like [`Arguments::extract`], falling back to `default` when the
    /// argument is missing or does not fit `T`.
    pub fn extract_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.extract(name).unwrap_or(default)
    }

    /// JSON object view, used for logging.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Arguments {
        [
            ("depth".to_string(), Value::Int(4)),
            ("angle".to_string(), Value::Int(25)),
            (
                "color".to_string(),
                Value::Seq(vec![Value::Int(255), Value::Int(0), Value::Int(10)]),
            ),
            ("output".to_string(), Value::None),
            ("fg".to_string(), Value::Function("rainbow".into())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_extract_typed() {
        let args = args();
        assert_eq!(args.extract::<u32>("depth").unwrap(), 4);
        assert_eq!(args.extract::<f64>("angle").unwrap(), 25.0);
        assert_eq!(
            args.extract::<(u8, u8, u8)>("color").unwrap(),
            (255, 0, 10)
        );
        assert_eq!(args.extract::<Option<String>>("output").unwrap(), None);
        assert_eq!(args.extract::<String>("fg").unwrap(), "rainbow");
    }

    #[test]
    fn test_extract_errors_and_fallbacks() {
        let args = args();
        assert!(args.extract::<i64>("missing").is_err());
        assert!(args.extract::<String>("depth").is_err());
        assert_eq!(args.extract_or("missing", 7_i64), 7);
    }

    #[test]
    fn test_merge_replaces() {
        let mut base = args();
        let mut other = Arguments::new();
        other.insert("depth", Value::Int(9));
        other.insert("extra", Value::Bool(true));
        base.merge(&other);

        assert_eq!(base.get("depth"), Some(&Value::Int(9)));
        assert!(base.contains("extra"));
        assert_eq!(base.len(), 6);
    }

    #[test]
    fn test_to_json() {
        let json = args().to_json();
        assert_eq!(json["depth"], serde_json::json!(4));
        assert_eq!(json["color"], serde_json::json!([255, 0, 10]));
        assert_eq!(json["output"], serde_json::Value::Null);
        assert_eq!(json["fg"], serde_json::json!("rainbow"));
    }
}
