use super::descriptor::TypeDescriptor;
use super::value::Value;

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static RE_VALUE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ValueRange\(\s*([^,]+?)\s*,\s*([^,]+?)\s*\)$").unwrap()
});

impl FromStr for TypeDescriptor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_type_string(s)
    }
}

/// Parse a type string like "List[str]" or "Tuple[str, int, Optional[float]]"
pub fn parse_type_string(type_str: &str) -> Result<TypeDescriptor> {
    let trimmed = type_str.trim();

    let Some(bracket_pos) = trimmed.find('[') else {
        return parse_simple_type(trimmed);
    };

    let base_type = trimmed[..bracket_pos].trim();
    if !trimmed.ends_with(']') {
        bail!("Unclosed bracket in type: {}", type_str);
    }
    let args = split_type_args(&trimmed[bracket_pos + 1..trimmed.len() - 1])?;

    match base_type {
        "List" | "list" | "Sequence" | "Iterable" => {
            let [inner] = args.as_slice() else {
                bail!("{} takes exactly one type argument: {}", base_type, type_str);
            };
            Ok(TypeDescriptor::sequence(parse_type_string(inner)?))
        }
        "Tuple" | "tuple" => {
            // Tuple[T, ...] is a homogeneous sequence
            if let [inner, ellipsis] = args.as_slice() {
                if ellipsis.trim() == "..." {
                    return Ok(TypeDescriptor::sequence(parse_type_string(inner)?));
                }
            }
            Ok(TypeDescriptor::Tuple(
                args.iter()
                    .map(|arg| parse_type_string(arg))
                    .collect::<Result<_>>()?,
            ))
        }
        "Union" => {
            if args.is_empty() {
                bail!("Union requires at least one member: {}", type_str);
            }
            Ok(TypeDescriptor::Union(
                args.iter()
                    .map(|arg| parse_type_string(arg))
                    .collect::<Result<_>>()?,
            ))
        }
        "Optional" => {
            let [inner] = args.as_slice() else {
                bail!("Optional takes exactly one type argument: {}", type_str);
            };
            Ok(TypeDescriptor::optional(parse_type_string(inner)?))
        }
        "Literal" => Ok(TypeDescriptor::Literal(
            args.iter()
                .map(|arg| parse_literal(arg))
                .collect::<Result<_>>()?,
        )),
        "Annotated" => {
            let [inner, range] = args.as_slice() else {
                bail!("Annotated takes a type and a ValueRange: {}", type_str);
            };
            let caps = RE_VALUE_RANGE
                .captures(range.trim())
                .ok_or_else(|| anyhow!("Unsupported annotation '{}'", range.trim()))?;
            Ok(TypeDescriptor::ranged(
                parse_type_string(inner)?,
                parse_bound(&caps[1])?,
                parse_bound(&caps[2])?,
            ))
        }
        _ => bail!("Unknown generic type '{}'", base_type),
    }
}

fn parse_simple_type(name: &str) -> Result<TypeDescriptor> {
    Ok(match name {
        "int" => TypeDescriptor::Int,
        "float" => TypeDescriptor::Float,
        "bool" => TypeDescriptor::Bool,
        "str" | "string" => TypeDescriptor::Str,
        "None" | "NoneType" => TypeDescriptor::NoneType,
        "Any" => TypeDescriptor::Any,
        "Callable" | "function" => TypeDescriptor::Function,
        "List" | "list" | "Tuple" | "tuple" | "Sequence" | "Iterable" => {
            TypeDescriptor::sequence(TypeDescriptor::Any)
        }
        "" => bail!("Empty type string"),
        other => bail!("Unknown type '{}'", other),
    })
}

/// Splits comma-separated type arguments, ignoring commas nested in brackets,
/// parentheses or quotes.
fn split_type_args(args_str: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current_arg = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for ch in args_str.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current_arg.push(ch);
            }
            (Some(_), _) => current_arg.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current_arg.push(ch);
            }
            (None, '[' | '(') => {
                depth += 1;
                current_arg.push(ch);
            }
            (None, ']' | ')') => {
                depth -= 1;
                if depth < 0 {
                    bail!("Unbalanced brackets in '{}'", args_str);
                }
                current_arg.push(ch);
            }
            (None, ',') if depth == 0 => {
                args.push(std::mem::take(&mut current_arg).trim().to_string());
            }
            _ => current_arg.push(ch),
        }
    }

    if depth != 0 || quote.is_some() {
        bail!("Unbalanced brackets or quotes in '{}'", args_str);
    }
    let last = current_arg.trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }
    if args.iter().any(String::is_empty) {
        bail!("Empty type argument in '{}'", args_str);
    }
    Ok(args)
}

fn parse_literal(token: &str) -> Result<Value> {
    let token = token.trim();
    for q in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(q) && token.ends_with(q) {
            return Ok(Value::str(&token[1..token.len() - 1]));
        }
    }
    match token {
        "True" | "true" => return Ok(Value::Bool(true)),
        "False" | "false" => return Ok(Value::Bool(false)),
        "None" => return Ok(Value::None),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    token
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| anyhow!("Unsupported literal '{}'", token))
}

fn parse_bound(token: &str) -> Result<Option<f64>> {
    match token.trim().trim_matches(|c| c == '\'' || c == '"') {
        "∞" | "inf" | "-∞" | "-inf" => Ok(None),
        other => other
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("Invalid range bound '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_types() {
        assert_eq!("int".parse::<TypeDescriptor>().unwrap(), TypeDescriptor::Int);
        assert_eq!(" str ".parse::<TypeDescriptor>().unwrap(), TypeDescriptor::Str);
        assert!("Turtle".parse::<TypeDescriptor>().is_err());
    }

    #[test]
    fn test_nested_generics() {
        let t: TypeDescriptor = "Optional[Union[Literal['auto'], float]]".parse().unwrap();
        assert_eq!(
            t,
            TypeDescriptor::optional(TypeDescriptor::Union(vec![
                TypeDescriptor::Literal(vec![Value::str("auto")]),
                TypeDescriptor::Float,
            ]))
        );

        let t: TypeDescriptor = "Tuple[int, ...]".parse().unwrap();
        assert_eq!(t, TypeDescriptor::sequence(TypeDescriptor::Int));

        let t: TypeDescriptor = "List[Tuple[str, str]]".parse().unwrap();
        assert_eq!(
            t,
            TypeDescriptor::sequence(TypeDescriptor::Tuple(vec![
                TypeDescriptor::Str,
                TypeDescriptor::Str
            ]))
        );
    }

    #[test]
    fn test_annotated_range() {
        let t: TypeDescriptor = "Annotated[int, ValueRange(1, '∞')]".parse().unwrap();
        assert_eq!(t, TypeDescriptor::ranged(TypeDescriptor::Int, Some(1.0), None));
    }

    #[test]
    fn test_display_parses_back() {
        for s in [
            "Union[Tuple[int, int, int], Callable]",
            "Annotated[int, ValueRange(-∞, 10)]",
            "Optional[List[float]]",
            "Literal[\"a,b\", 3]",
        ] {
            let t: TypeDescriptor = s.parse().unwrap();
            assert_eq!(t.to_string(), s);
        }
    }

    #[test]
    fn test_malformed() {
        assert!("List[int".parse::<TypeDescriptor>().is_err());
        assert!("Optional[int, str]".parse::<TypeDescriptor>().is_err());
        assert!("Tuple[int,, str]".parse::<TypeDescriptor>().is_err());
    }
}
