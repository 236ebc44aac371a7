//! Tag declarations
//!
//! A tag is declared either in short form (`traefik`) or long form
//! (`{traefik: {key: value}}`). Both forms produce the same [`Tag`]; the long
//! form carries local override data passed to the tag's transform script.
//!
//! Names starting with `-`, `~` or `!` are exclusion markers: they disable the
//! tag with the stripped name, wherever it was declared.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Local override data attached to a tag declaration
pub type TagVars = Map<String, Value>;

const EXCLUSION_PREFIXES: [char; 3] = ['-', '~', '!'];

#[derive(Debug, Error, PartialEq)]
pub enum TagError {
    #[error("Missing tag name in declaration: {0}")]
    MissingName(String),

    #[error("Tag '{0}' override data must be a map or null")]
    InvalidVars(String),

    #[error("Unsupported tag declaration: {0}")]
    Unsupported(String),
}

/// A tag with its local override data
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Tag {
    pub name: String,
    pub vars: TagVars,
}

impl Tag {
    /// Creates a tag without override data
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: TagVars::new(),
        }
    }

    /// Creates a tag with override data
    pub fn with_vars(name: impl Into<String>, vars: TagVars) -> Self {
        Self {
            name: name.into(),
            vars,
        }
    }

    /// Returns the name this marker disables, if this is an exclusion marker
    pub fn excluded_name(&self) -> Option<&str> {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(c) if EXCLUSION_PREFIXES.contains(&c) => Some(chars.as_str()),
            _ => None,
        }
    }

    fn vars_from(name: &str, value: Value) -> Result<TagVars, TagError> {
        match value {
            Value::Null => Ok(TagVars::new()),
            Value::Object(map) => Ok(map),
            _ => Err(TagError::InvalidVars(name.to_string())),
        }
    }
}

impl TryFrom<Value> for Tag {
    type Error = TagError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) if !name.trim().is_empty() => Ok(Tag::new(name)),
            Value::String(_) => Err(TagError::MissingName("\"\"".to_string())),
            Value::Object(map) if map.len() == 1 => {
                let Some((name, vars)) = map.into_iter().next() else {
                    return Err(TagError::MissingName("{}".to_string()));
                };
                if name.trim().is_empty() {
                    return Err(TagError::MissingName("{\"\": ..}".to_string()));
                }
                let vars = Tag::vars_from(&name, vars)?;
                Ok(Tag::with_vars(name, vars))
            }
            Value::Object(map) if map.is_empty() => Err(TagError::MissingName("{}".to_string())),
            Value::Object(mut map) => {
                // Explicit form: {name: .., vars: ..}
                let raw = Value::Object(map.clone()).to_string();
                let name = match map.remove("name") {
                    Some(Value::String(name)) if !name.trim().is_empty() => name,
                    _ => return Err(TagError::MissingName(raw)),
                };
                let vars = Tag::vars_from(&name, map.remove("vars").unwrap_or(Value::Null))?;
                if !map.is_empty() {
                    return Err(TagError::Unsupported(raw));
                }
                Ok(Tag::with_vars(name, vars))
            }
            other => Err(TagError::Unsupported(other.to_string())),
        }
    }
}

/// Merges tag declarations by name and applies exclusion markers
///
/// The first declaration of a name fixes its position; later declarations
/// shallow-merge their override data over it (later keys win). Exclusion
/// markers are dropped along with every tag they disable.
pub fn merge_tags<'a>(declarations: impl IntoIterator<Item = &'a Tag>) -> Vec<Tag> {
    let mut merged: Vec<Tag> = Vec::new();

    for decl in declarations {
        match merged.iter_mut().find(|t| t.name == decl.name) {
            Some(existing) => {
                for (key, value) in &decl.vars {
                    existing.vars.insert(key.clone(), value.clone());
                }
            }
            None => merged.push(decl.clone()),
        }
    }

    let excluded: Vec<String> = merged
        .iter()
        .filter_map(|t| t.excluded_name().map(str::to_string))
        .collect();

    merged
        .into_iter()
        .filter(|t| t.excluded_name().is_none() && !excluded.contains(&t.name))
        .collect()
}
