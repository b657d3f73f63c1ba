use super::types::{AppConfig, TargetConfig};
use crate::eval::SafeEvaluator;
use crate::schema::Value;
use crate::targets::{Target, TargetRegistry};
use crate::wizard::Arguments;

use anyhow::{Context, Result, anyhow, bail};

pub fn validate_config(config: &AppConfig, registry: &TargetRegistry) -> Result<()> {
    let timeout = config.wizard.error_message_timeout;
    if !timeout.is_finite() || timeout < 0.0 {
        bail!(
            "wizard.error_message_timeout must be a non-negative number of seconds, got {}",
            timeout
        );
    }

    for (name, target_config) in &config.targets {
        let target = registry.get(name).ok_or_else(|| {
            anyhow!(
                "Unknown target '{}' in configuration (available: {})",
                name,
                registry.names().join(", ")
            )
        })?;
        target_overrides(target, target_config)
            .with_context(|| format!("Invalid overrides for target '{}'", name))?;
    }

    Ok(())
}

/// Converts a target's configured overrides into arguments.
///
/// Strings naming one of the target's functions become function references
/// where the parameter expects one.
pub fn target_overrides(target: &dyn Target, config: &TargetConfig) -> Result<Arguments> {
    let mut arguments = Arguments::new();
    let Some(overrides) = &config.overrides else {
        return Ok(arguments);
    };

    for (name, json) in overrides {
        let mut value = Value::try_from(json).with_context(|| format!("Override '{}'", name))?;
        if let Value::Str(s) = &value {
            let declared = target.signature().param(name).map(|p| &p.declared_type);
            let reference = Value::Function(s.clone());
            if target.functions().contains(&s.as_str())
                && declared.is_some_and(|t| !t.accepts(&value) && t.accepts(&reference))
            {
                value = reference;
            }
        }
        let value = check_override(target, name, value)?;
        arguments.insert(name.as_str(), value);
    }
    Ok(arguments)
}

/// Parses a command line override of the form `NAME=TOKEN`, evaluating the
/// token the same way an answer to a prompt is evaluated.
pub fn parse_override(target: &dyn Target, assignment: &str) -> Result<(String, Value)> {
    let (name, token) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Override '{}' is not of the form NAME=VALUE", assignment))?;
    let name = name.trim();

    let evaluator = SafeEvaluator::new().with_functions(target.functions().iter().copied());
    let value = evaluator
        .parse(token)
        .with_context(|| format!("Override '{}'", name))?;
    Ok((name.to_string(), check_override(target, name, value)?))
}

fn check_override(target: &dyn Target, name: &str, value: Value) -> Result<Value> {
    let signature = target.signature();
    let param = signature
        .param(name)
        .ok_or_else(|| anyhow!("'{}' has no parameter named '{}'", signature.name(), name))?;
    if !param.declared_type.accepts(&value) {
        bail!(
            "Override {} of '{}' is not a valid {}",
            value,
            name,
            param.declared_type
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_string;
    use crate::targets::default_registry;

    fn validate(toml: &str) -> Result<()> {
        let config = load_config_from_string(toml).unwrap();
        validate_config(&config, &default_registry().unwrap())
    }

    #[test]
    fn test_valid_configs() {
        assert!(validate("").is_ok());
        assert!(
            validate("[targets.lindenmayer.overrides]\n_max_symbols = 1000\nangle = 25\n").is_ok()
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(validate("[wizard]\nerror_message_timeout = -1.0\n").is_err());
        assert!(validate("[targets.nope]\n").is_err());
        assert!(validate("[targets.lindenmayer.overrides]\nnope = 1\n").is_err());
        assert!(validate("[targets.lindenmayer.overrides]\ndepth = 0\n").is_err());
        assert!(validate("[targets.lindenmayer.overrides.axiom]\nnested = 1\n").is_err());
    }

    #[test]
    fn test_function_names_become_references() {
        let registry = default_registry().unwrap();
        let target = registry.get("lindenmayer").unwrap();
        let config = load_config_from_string(
            "[targets.lindenmayer.overrides]\nfg_color = \"heading\"\naxiom = \"heading\"\n",
        )
        .unwrap();

        let overrides = target_overrides(target, &config.targets["lindenmayer"]).unwrap();
        assert_eq!(
            overrides.get("fg_color"),
            Some(&Value::Function("heading".into()))
        );
        assert_eq!(overrides.get("axiom"), Some(&Value::str("heading")));
    }

    #[test]
    fn test_parse_override() {
        let registry = default_registry().unwrap();
        let target = registry.get("lindenmayer").unwrap();

        assert_eq!(
            parse_override(target, "depth=3").unwrap(),
            ("depth".to_string(), Value::Int(3))
        );
        assert_eq!(
            parse_override(target, "fg_color=rainbow").unwrap().1,
            Value::Function("rainbow".into())
        );
        assert_eq!(
            parse_override(target, "rules='F -> F=F'").unwrap().1,
            Value::str("F -> F=F")
        );
        assert!(parse_override(target, "depth").is_err());
        assert!(parse_override(target, "depth=0").is_err());
        assert!(parse_override(target, "unknown=1").is_err());
    }
}
