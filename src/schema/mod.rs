//! Parameter schema: values, declared types and function signatures.

pub mod descriptor;
pub mod parser;
pub mod signature;
pub mod value;

pub use descriptor::TypeDescriptor;
pub use parser::parse_type_string;
pub use signature::{FunctionSignature, ParameterSpec, SignatureBuilder, extract_param_doc};
pub use value::Value;
