//! Configuration schema for `paasify.yml`
//!
//! The file is parsed into plain structs; everything the pipeline consumes is
//! validated here or in [`super::Project`] before any stack runs.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Tag, TagLists, VarDecls};

/// Default name of the generated compose file
pub const DEFAULT_COMPOSE_OUTPUT: &str = "docker-compose.run.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Top-level layout of `paasify.yml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFile {
    #[serde(deserialize_with = "null_as_default")]
    pub config: ProjectSettings,

    #[serde(deserialize_with = "null_as_default")]
    pub sources: SourceMap,

    #[serde(deserialize_with = "null_as_default")]
    pub stacks: Vec<StackEntry>,
}

/// The `config:` block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    pub namespace: Option<String>,

    pub vars: VarDecls,

    #[serde(deserialize_with = "null_as_default")]
    pub tags_prefix: Vec<Tag>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags_suffix: Vec<Tag>,

    /// Name of the generated compose file in each stack directory
    pub compose_output: Option<String>,

    /// Forces a registered engine version instead of detecting it
    pub engine: Option<String>,
}

impl ProjectSettings {
    pub fn tag_lists(&self) -> TagLists {
        TagLists {
            prefix: self.tags_prefix.clone(),
            tags: self.tags.clone(),
            suffix: self.tags_suffix.clone(),
        }
    }
}

/// A declared source of apps
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub alias: Option<String>,
}

/// Long form of a stack entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub name: Option<String>,
    pub path: Option<String>,
    pub app: Option<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags_prefix: Vec<Tag>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,

    #[serde(deserialize_with = "null_as_default")]
    pub tags_suffix: Vec<Tag>,

    pub vars: VarDecls,
}

impl StackConfig {
    pub fn tag_lists(&self) -> TagLists {
        TagLists {
            prefix: self.tags_prefix.clone(),
            tags: self.tags.clone(),
            suffix: self.tags_suffix.clone(),
        }
    }
}

/// A stack entry: `traefik`, `default:wordpress`, or a full map
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StackEntry {
    Short(String),
    Full(StackConfig),
}

impl StackEntry {
    /// Normalizes the entry to its long form
    ///
    /// A short entry containing `:` is an app reference, otherwise a path.
    pub fn into_config(self) -> StackConfig {
        match self {
            StackEntry::Full(config) => config,
            StackEntry::Short(value) if value.contains(':') => StackConfig {
                app: Some(value),
                ..Default::default()
            },
            StackEntry::Short(value) => StackConfig {
                path: Some(value),
                ..Default::default()
            },
        }
    }
}

/// Declared sources, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap(pub Vec<(String, SourceConfig)>);

impl SourceMap {
    pub fn iter(&self) -> impl Iterator<Item = &(String, SourceConfig)> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for SourceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SourceMapVisitor;

        impl<'de> Visitor<'de> for SourceMapVisitor {
            type Value = SourceMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of source names to {url, alias}")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<SourceMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, config)) =
                    access.next_entry::<String, Option<SourceConfig>>()?
                {
                    entries.push((name, config.unwrap_or_default()));
                }
                Ok(SourceMap(entries))
            }
        }

        deserializer.deserialize_map(SourceMapVisitor)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProjectFile {
    /// Parses configuration text; an empty document yields the defaults
    pub fn parse(content: &str, origin: &str) -> std::result::Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let parsed: Option<ProjectFile> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        Ok(parsed.unwrap_or_default())
    }

    /// Reads and parses a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config: {}", path.display()))?;

        Ok(Self::parse(&content, &path.display().to_string())?)
    }

    /// Stack entries in their long form
    pub fn stack_configs(&self) -> Vec<StackConfig> {
        self.stacks
            .iter()
            .cloned()
            .map(StackEntry::into_config)
            .collect()
    }
}
