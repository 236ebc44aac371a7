//! Stack identity
//!
//! A stack is declared by any of `app`, `name` or `path`. Missing values are
//! derived from the others:
//!
//! | Declared | name | path |
//! |----------|------|------|
//! | `app: default:wordpress` | `wordpress` | `wordpress` |
//! | `path: infra/traefik` | `infra_traefik` | `infra/traefik` |
//! | `name: minio` | `minio` | `minio` |

use std::path::{Path, PathBuf};

use crate::domain::{Tag, VarDecls};
use crate::error::PaasifyError;

/// Name of the source used when an app reference has no `source:` prefix
pub const DEFAULT_SOURCE: &str = "default";

/// Reference to an app inside a source: `source:path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub source: String,
    pub path: String,
}

impl App {
    /// Parses `source:path`, or a bare `path` from the default source
    pub fn parse(reference: &str) -> Self {
        match reference.split_once(':') {
            Some((source, path)) => Self {
                source: if source.is_empty() {
                    DEFAULT_SOURCE.to_string()
                } else {
                    source.to_string()
                },
                path: path.to_string(),
            },
            None => Self {
                source: DEFAULT_SOURCE.to_string(),
                path: reference.to_string(),
            },
        }
    }

    /// Canonical `source:path` form
    pub fn reference(&self) -> String {
        format!("{}:{}", self.source, self.path)
    }
}

/// The three ordered tag lists of a stack or project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagLists {
    pub prefix: Vec<Tag>,
    pub tags: Vec<Tag>,
    pub suffix: Vec<Tag>,
}

impl TagLists {
    /// Combines stack lists with project defaults, then concatenates them
    ///
    /// A non-empty stack list replaces the project list of the same kind.
    pub fn over<'a>(&'a self, defaults: &'a TagLists) -> Vec<&'a Tag> {
        fn pick<'a>(own: &'a [Tag], fallback: &'a [Tag]) -> &'a [Tag] {
            if own.is_empty() {
                fallback
            } else {
                own
            }
        }

        pick(&self.prefix, &defaults.prefix)
            .iter()
            .chain(pick(&self.tags, &defaults.tags))
            .chain(pick(&self.suffix, &defaults.suffix))
            .collect()
    }
}

/// A validated stack of a project
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    /// Stack name, unique in the project
    pub name: String,

    /// Directory relative to the project root
    pub path: String,

    /// Absolute stack directory
    pub dir: PathBuf,

    /// Referenced app, if any
    pub app: Option<App>,

    pub tags: TagLists,

    pub vars: VarDecls,
}

impl Stack {
    /// Builds a stack from its declared identity fields
    pub fn from_decl(
        project_root: &Path,
        name: Option<&str>,
        path: Option<&str>,
        app: Option<&str>,
        tags: TagLists,
        vars: VarDecls,
    ) -> Result<Self, PaasifyError> {
        fn non_empty(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.trim().is_empty())
        }
        let (name, path, app) = (non_empty(name), non_empty(path), non_empty(app));

        let origin = app.or(name).or(path).ok_or_else(|| {
            PaasifyError::StackMissingOrigin(format!(
                "name={:?} path={:?} app={:?}",
                name, path, app
            ))
        })?;

        let default_name = match origin.split_once(':') {
            Some((_, rest)) => rest,
            None => origin,
        };

        let path = path.unwrap_or(default_name).trim_matches('/').to_string();
        let name = sanitize_name(name.unwrap_or(default_name));
        if name.is_empty() || path.is_empty() {
            return Err(PaasifyError::StackMissingOrigin(origin.to_string()));
        }

        Ok(Self {
            dir: project_root.join(&path),
            name,
            path,
            app: app.map(App::parse),
            tags,
            vars,
        })
    }

    /// Compose project name scoping every engine call for this stack
    pub fn compose_project_name(&self, namespace: &str) -> String {
        format!("{}_{}", namespace, self.name)
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Path of the generated compose file
    pub fn output_file(&self, output_name: &str) -> PathBuf {
        self.dir.join(output_name)
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_name(raw: &str) -> String {
    raw.trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
