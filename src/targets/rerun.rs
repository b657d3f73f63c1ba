use super::Target;
use crate::schema::{FunctionSignature, Value};
use crate::wizard::Arguments;

use anyhow::Result;

/// Asks whether the previous target should run again.
pub struct Rerun {
    signature: FunctionSignature,
}

impl Rerun {
    pub fn new() -> Result<Self> {
        let signature = FunctionSignature::builder("rerun")
            .doc(":param rerun: Should the previous function be run again?")
            .param_with_default("rerun", "bool", Value::Bool(true))
            .build()?;
        Ok(Self { signature })
    }
}

impl Target for Rerun {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn invoke(&self, arguments: &Arguments) -> Result<serde_json::Value> {
        let rerun: bool = arguments.extract("rerun")?;
        Ok(serde_json::Value::Bool(rerun))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_answer() {
        let target = Rerun::new().unwrap();
        let mut args = Arguments::new();
        args.insert("rerun", Value::Bool(false));
        assert_eq!(target.invoke(&args).unwrap(), serde_json::json!(false));
        assert_eq!(
            target.signature().param("rerun").unwrap().default,
            Some(Value::Bool(true))
        );
    }
}
