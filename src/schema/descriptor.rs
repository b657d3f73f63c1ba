//! Type Descriptors
//!
//! Declared parameter types and the validation predicate that checks an
//! evaluated [`Value`] against them. Descriptors print in the familiar
//! `Optional[Tuple[int, int]]` notation and parse back from it (see
//! [`super::parser`]).

use super::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Any,
    Int,
    /// Accepts integers as well as floats.
    Float,
    Bool,
    Str,
    NoneType,
    /// A reference to one of the target's registered functions.
    Function,
    /// Homogeneous sequence of any length.
    Sequence(Box<TypeDescriptor>),
    /// Positional sequence. Trailing `Optional` elements may be omitted.
    Tuple(Vec<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),
    Literal(Vec<Value>),
    /// Numeric type constrained to an inclusive range; `None` bounds are open.
    Ranged {
        inner: Box<TypeDescriptor>,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl TypeDescriptor {
    pub fn sequence(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Box::new(inner))
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn ranged(inner: TypeDescriptor, min: Option<f64>, max: Option<f64>) -> Self {
        TypeDescriptor::Ranged {
            inner: Box::new(inner),
            min,
            max,
        }
    }

    fn is_optional(&self) -> bool {
        match self {
            TypeDescriptor::Optional(_) | TypeDescriptor::NoneType | TypeDescriptor::Any => true,
            TypeDescriptor::Union(members) => members.iter().any(TypeDescriptor::is_optional),
            _ => false,
        }
    }

    /// Returns whether `value` satisfies this declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeDescriptor::Any, _) => true,
            (TypeDescriptor::Int, Value::Int(_)) => true,
            (TypeDescriptor::Float, Value::Float(_) | Value::Int(_)) => true,
            (TypeDescriptor::Bool, Value::Bool(_)) => true,
            (TypeDescriptor::Str, Value::Str(_)) => true,
            (TypeDescriptor::NoneType, Value::None) => true,
            (TypeDescriptor::Function, Value::Function(_)) => true,
            (TypeDescriptor::Sequence(inner), Value::Seq(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (TypeDescriptor::Tuple(types), Value::Seq(items)) => {
                let required = types.iter().filter(|t| !t.is_optional()).count();
                required <= items.len()
                    && items.len() <= types.len()
                    && items.iter().zip(types).all(|(item, t)| t.accepts(item))
            }
            (TypeDescriptor::Union(members), _) => members.iter().any(|t| t.accepts(value)),
            (TypeDescriptor::Optional(inner), _) => {
                matches!(value, Value::None) || inner.accepts(value)
            }
            (TypeDescriptor::Literal(allowed), _) => allowed.iter().any(|v| v == value),
            (TypeDescriptor::Ranged { inner, min, max }, _) => {
                inner.accepts(value)
                    && value.as_f64().is_some_and(|x| {
                        min.is_none_or(|lo| x >= lo) && max.is_none_or(|hi| x <= hi)
                    })
            }
            _ => false,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: Option<f64>, open: &str) -> fmt::Result {
    match bound {
        Some(b) if b.fract() == 0.0 => write!(f, "{}", b as i64),
        Some(b) => write!(f, "{}", b),
        None => f.write_str(open),
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Any => f.write_str("Any"),
            TypeDescriptor::Int => f.write_str("int"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::Str => f.write_str("str"),
            TypeDescriptor::NoneType => f.write_str("None"),
            TypeDescriptor::Function => f.write_str("Callable"),
            TypeDescriptor::Sequence(inner) => write!(f, "List[{}]", inner),
            TypeDescriptor::Tuple(types) => {
                f.write_str("Tuple[")?;
                write_list(f, types)?;
                f.write_str("]")
            }
            TypeDescriptor::Union(members) => {
                f.write_str("Union[")?;
                write_list(f, members)?;
                f.write_str("]")
            }
            TypeDescriptor::Optional(inner) => write!(f, "Optional[{}]", inner),
            TypeDescriptor::Literal(values) => {
                f.write_str("Literal[")?;
                write_list(f, values)?;
                f.write_str("]")
            }
            TypeDescriptor::Ranged { inner, min, max } => {
                write!(f, "Annotated[{}, ValueRange(", inner)?;
                write_bound(f, *min, "-∞")?;
                f.write_str(", ")?;
                write_bound(f, *max, "∞")?;
                f.write_str(")]")
            }
        }
    }
}
