//! Variables and templating
//!
//! Variables are declared either as a map (`{KEY: value}`) or as a list of
//! `KEY=value` strings. Declaration order matters: a variable can only
//! reference variables resolved before it.
//!
//! Template syntax: `$name`, `${name}`, and `$$` for a literal `$`.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Flat variable map; insertion order is preserved
pub type VarMap = Map<String, Value>;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("variable '{0}' is not defined")]
    Undefined(String),

    #[error("invalid placeholder at offset {0}")]
    InvalidPlaceholder(usize),
}

/// Ordered variable declarations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarDecls(Vec<(String, Value)>);

impl VarDecls {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expands declarations on top of `seed`, in declaration order
    ///
    /// Each string value is templated against the map as accumulated so
    /// far. Template failures are logged and leave the literal value.
    pub fn expand(&self, seed: VarMap) -> VarMap {
        let mut result = seed;
        for (name, value) in &self.0 {
            let value = expand_value(name, value, &result);
            result.insert(name.clone(), value);
        }
        result
    }
}

impl<'de> Deserialize<'de> for VarDecls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeclsVisitor;

        impl<'de> Visitor<'de> for DeclsVisitor {
            type Value = VarDecls;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of variables or a list of KEY=VALUE strings")
            }

            fn visit_unit<E: de::Error>(self) -> Result<VarDecls, E> {
                Ok(VarDecls::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<VarDecls, E> {
                Ok(VarDecls::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VarDecls, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(VarDecls(entries))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<VarDecls, A::Error> {
                let mut entries = Vec::new();
                while let Some(stmt) = access.next_element::<String>()? {
                    let (key, value) = stmt.split_once('=').ok_or_else(|| {
                        de::Error::custom(format!("could not parse '{}', missing '='", stmt))
                    })?;
                    entries.push((key.to_string(), Value::String(value.to_string())));
                }
                Ok(VarDecls(entries))
            }
        }

        deserializer.deserialize_any(DeclsVisitor)
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:(?P<escaped>\$)|(?P<named>[_a-zA-Z][_a-zA-Z0-9]*)|\{(?P<braced>[_a-zA-Z][_a-zA-Z0-9]*)\}|(?P<invalid>))")
            .expect("placeholder pattern is valid")
    })
}

/// Substitutes `$name` and `${name}` placeholders from `vars`
pub fn substitute(template: &str, vars: &VarMap) -> Result<String, TemplateError> {
    let mut error = None;

    let rendered = placeholder_re().replace_all(template, |caps: &Captures| {
        if caps.name("escaped").is_some() {
            return "$".to_string();
        }
        if let Some(name) = caps.name("named").or_else(|| caps.name("braced")) {
            return match vars.get(name.as_str()) {
                Some(value) => cast_compose_value(value).unwrap_or_default(),
                None => {
                    error.get_or_insert(TemplateError::Undefined(name.as_str().to_string()));
                    String::new()
                }
            };
        }
        let offset = caps.get(0).map(|m| m.start()).unwrap_or_default();
        error.get_or_insert(TemplateError::InvalidPlaceholder(offset));
        String::new()
    });

    match error {
        Some(err) => Err(err),
        None => Ok(rendered.into_owned()),
    }
}

/// Templates a single variable value, degrading to the literal on failure
pub fn expand_value(name: &str, value: &Value, vars: &VarMap) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };

    match substitute(raw, vars) {
        Ok(rendered) => {
            if &rendered != raw {
                debug!("Transformed template value: {} => {}", raw, rendered);
            }
            Value::String(rendered)
        }
        Err(err) => {
            warn!("Could not expand {}='{}': {}", name, raw, err);
            value.clone()
        }
    }
}

/// Casts a value to its compose-compatible string form
///
/// Returns `None` for null values, which are left out of the environment.
pub fn cast_compose_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| cast_compose_value(v).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, v)| format!("{}={}", k, cast_compose_value(v).unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}
