//! Domain models for Paasify
//!
//! Plain data built from validated configuration: tags, variables, stack
//! identity and engine versions. Nothing here spawns processes.

mod stack;
mod tag;
mod vars;
mod version;

pub use stack::{sanitize_name, App, Stack, TagLists, DEFAULT_SOURCE};
pub use tag::{merge_tags, Tag, TagError, TagVars};
pub use vars::{cast_compose_value, expand_value, substitute, TemplateError, VarDecls, VarMap};
pub use version::{EngineVersion, VersionError};
