//! # Storage Layer
//!
//! Everything read from disk before the pipeline runs.
//!
//! ## Project Structure
//!
//! ```text
//! paasify.yml                  # Project configuration
//! .paasify/
//! ├── collections/             # Installed sources
//! │   └── default/
//! │       ├── wordpress/       # An app
//! │       └── .paasify/plugins # Plugins packaged with the source
//! └── plugins/                 # Project plugins
//! traefik/                     # A stack directory
//! ├── docker-compose.yml
//! ├── vars.yml
//! └── docker-compose.run.yml   # Generated
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a Paasify project
//! - [`ProjectFile`] - Raw `paasify.yml` schema
//! - [`Source`] - A git-backed collection of apps

mod config;
mod lookup;
mod project;
mod source;

pub use config::{
    ConfigError, ProjectFile, ProjectSettings, SourceConfig, SourceMap, StackConfig, StackEntry,
    DEFAULT_COMPOSE_OUTPUT,
};
pub use lookup::lookup_candidates;
pub use project::{Project, PROJECT_FILENAMES};
pub use source::Source;
