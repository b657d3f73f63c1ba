//! Function Signatures
//!
//! Targets declare their parameters once, at registration time, through
//! [`FunctionSignature::builder`]. A parameter without explicit documentation
//! picks up the fragment that follows its `:param <name>:` marker in the
//! signature's doc text.
//!
//! ```rust
//! use paramwiz::schema::{FunctionSignature, Value};
//!
//! let signature = FunctionSignature::builder("f")
//!     .doc(":param n: How many.\n:param label: What to call it.")
//!     .param("n", "int")
//!     .param_with_default("label", "str", Value::str("x"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(signature.params()[0].doc.as_deref(), Some("How many."));
//! ```

use super::descriptor::TypeDescriptor;
use super::value::Value;

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub declared_type: TypeDescriptor,
    pub default: Option<Value>,
    pub doc: Option<String>,
}

impl ParameterSpec {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Internal parameters start with an underscore. They are never prompted
    /// for or persisted and take either their override or their default.
    pub fn is_internal(&self) -> bool {
        self.name.starts_with('_')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    name: String,
    doc: Option<String>,
    params: Vec<ParameterSpec>,
}

impl FunctionSignature {
    pub fn builder(name: &str) -> SignatureBuilder {
        SignatureBuilder {
            name: name.to_string(),
            doc: None,
            params: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Parameters in declaration order, which is also prompt order.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

pub struct SignatureBuilder {
    name: String,
    doc: Option<String>,
    params: Vec<(String, String, Option<Value>, Option<String>)>,
    error: Option<anyhow::Error>,
}

impl SignatureBuilder {
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    pub fn param(mut self, name: &str, type_str: &str) -> Self {
        self.params
            .push((name.to_string(), type_str.to_string(), None, None));
        self
    }

    pub fn param_with_default(mut self, name: &str, type_str: &str, default: Value) -> Self {
        self.params
            .push((name.to_string(), type_str.to_string(), Some(default), None));
        self
    }

    /// Overrides the doc fragment of the most recently added parameter.
    pub fn param_doc(mut self, doc: &str) -> Self {
        match self.params.last_mut() {
            Some(last) => last.3 = Some(doc.to_string()),
            None => {
                self.error
                    .get_or_insert_with(|| anyhow!("param_doc called before any param"));
            }
        }
        self
    }

    pub fn build(self) -> Result<FunctionSignature> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.name.is_empty() {
            bail!("Function name cannot be empty");
        }

        let mut seen = HashSet::new();
        let mut params = Vec::with_capacity(self.params.len());

        for (name, type_str, default, doc) in self.params {
            if !seen.insert(name.clone()) {
                bail!("Duplicate parameter '{}' in '{}'", name, self.name);
            }

            let declared_type: TypeDescriptor = type_str
                .parse()
                .map_err(|e| anyhow!("Parameter '{}' of '{}': {}", name, self.name, e))?;

            if let Some(default) = &default {
                if !declared_type.accepts(default) {
                    bail!(
                        "Default {} of parameter '{}' does not satisfy {}",
                        default,
                        name,
                        declared_type
                    );
                }
            }

            let doc = doc.or_else(|| {
                self.doc
                    .as_deref()
                    .and_then(|text| extract_param_doc(text, &name))
            });

            let spec = ParameterSpec {
                name,
                declared_type,
                default,
                doc,
            };
            if spec.is_internal() && !spec.has_default() {
                bail!("Internal parameter '{}' must declare a default", spec.name);
            }
            params.push(spec);
        }

        Ok(FunctionSignature {
            name: self.name,
            doc: self.doc,
            params,
        })
    }
}

/// Extracts the documentation fragment for `param` from reST-style doc text.
///
/// The fragment runs from the `:param <name>:` marker to the next
/// `:param`, `:return` or `:raises` marker, or the end of the text. Runs of
/// whitespace are collapsed so wrapped lines read as one paragraph.
pub fn extract_param_doc(doc: &str, param: &str) -> Option<String> {
    let pattern = format!(
        r"(?s):param\s+{}:(.*?)(?::param|:return|:raises|\z)",
        regex::escape(param)
    );
    let re = Regex::new(&pattern).ok()?;
    let fragment = re.captures(doc)?.get(1)?.as_str();

    let normalised = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalised.is_empty()).then_some(normalised)
}
